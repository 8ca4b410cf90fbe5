use chrono::{Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::api::{Issue, IssueFilter, IssueQueryKey, IssueSource, SearchResults};
use crate::cache::{Cacheable, QueryCache};
use crate::issues::{IssueListQuery, IssueSearchQuery};
use crate::query::QuerySnapshot;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{relative_date, status_color, status_label, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::IssueDetailView;

/// What the issues screen should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum IssuesDisplay {
  Loading,
  Error(String),
  Issues {
    issues: Vec<Issue>,
    is_previous_data: bool,
    is_fetching: bool,
  },
  SearchLoading,
  SearchError(String),
  SearchResults {
    results: SearchResults,
    is_fetching: bool,
  },
}

impl IssuesDisplay {
  /// Issues listed on screen, in order.
  pub fn issues(&self) -> &[Issue] {
    match self {
      IssuesDisplay::Issues { issues, .. } => issues,
      IssuesDisplay::SearchResults { results, .. } => &results.items,
      _ => &[],
    }
  }
}

/// State behind the issues screen: the paginated list, the search and the
/// rule deciding which of the two is shown.
pub struct IssuesListModel {
  cache: QueryCache,
  list: IssueListQuery,
  search: IssueSearchQuery,
  list_updates: watch::Receiver<QuerySnapshot<Vec<Issue>>>,
  search_updates: watch::Receiver<QuerySnapshot<SearchResults>>,
  search_value: String,
  sticky_search: bool,
}

impl IssuesListModel {
  pub fn new(
    source: Arc<dyn IssueSource>,
    cache: QueryCache,
    filter: IssueFilter,
    stale_time: Duration,
    sticky_search: bool,
  ) -> Self {
    let list = IssueListQuery::new(source.clone(), cache.clone(), filter, stale_time);
    let search = IssueSearchQuery::new(source, cache.clone(), stale_time);
    Self {
      cache,
      list_updates: list.subscribe(),
      search_updates: search.subscribe(),
      list,
      search,
      search_value: String::new(),
      sticky_search,
    }
  }

  pub fn page_num(&self) -> u32 {
    self.list.page_num()
  }

  pub fn filter(&self) -> &IssueFilter {
    self.list.filter()
  }

  pub fn search_value(&self) -> &str {
    &self.search_value
  }

  /// Go to page `page_num`. Page 0 is ignored.
  pub fn set_page_num(&mut self, page_num: u32) {
    self.list.set_page(page_num);
  }

  pub fn next_page(&mut self) {
    if self.can_go_next() {
      self.set_page_num(self.page_num() + 1);
    }
  }

  pub fn previous_page(&mut self) {
    if self.can_go_previous() {
      self.set_page_num(self.page_num() - 1);
    }
  }

  pub fn can_go_previous(&self) -> bool {
    self.page_num() != 1
  }

  /// Forward paging needs a non-empty page that belongs to the current key.
  pub fn can_go_next(&self) -> bool {
    let snapshot = self.list.snapshot();
    !snapshot.is_previous_data && snapshot.data.is_some_and(|issues| !issues.is_empty())
  }

  /// Run a search for `term`. An empty term resets the search.
  pub fn set_search_value(&mut self, term: impl Into<String>) {
    self.search_value = term.into();
    self.search.set_term(self.search_value.clone());
  }

  /// Search box edits only matter once the box is emptied.
  pub fn on_search_input_changed(&mut self, value: &str) {
    if value.is_empty() {
      self.set_search_value("");
    }
  }

  /// Whether the search branch is shown instead of the list.
  pub fn shows_search_results(&self) -> bool {
    let never_triggered = self.search.snapshot().is_pre_activation();
    !never_triggered || (self.sticky_search && self.search.has_activated())
  }

  pub fn list_snapshot(&self) -> QuerySnapshot<Vec<Issue>> {
    self.list.snapshot()
  }

  /// List loading and errors take precedence over the search branch.
  pub fn display(&self) -> IssuesDisplay {
    let list = self.list.snapshot();
    if list.is_loading() {
      return IssuesDisplay::Loading;
    }
    if list.is_error() {
      return IssuesDisplay::Error(list.error_message().unwrap_or_default());
    }

    if !self.shows_search_results() {
      return IssuesDisplay::Issues {
        is_previous_data: list.is_previous_data,
        is_fetching: list.is_fetching(),
        issues: list.data.unwrap_or_default(),
      };
    }

    let search = self.search.snapshot();
    if search.is_loading() {
      return IssuesDisplay::SearchLoading;
    }
    if search.is_error() {
      return IssuesDisplay::SearchError(search.error_message().unwrap_or_default());
    }
    IssuesDisplay::SearchResults {
      is_fetching: search.is_fetching(),
      results: search.data.unwrap_or_default(),
    }
  }

  /// Whether the search branch is shown with no search to run: a sticky
  /// search whose box was emptied.
  pub fn search_is_cleared(&self) -> bool {
    self.shows_search_results() && !self.search.is_enabled()
  }

  /// Refetch whichever query is on screen. A cleared sticky search has
  /// nothing to refetch, so the list is refetched instead.
  pub fn refetch(&mut self) -> bool {
    if self.shows_search_results() && self.search.is_enabled() {
      self.search.refetch()
    } else {
      self.list.refetch()
    }
  }

  /// Mark every cached issue query stale, then refetch what is on screen.
  ///
  /// Other pages, searches and issues refetch the next time they are shown.
  pub fn reload_all(&mut self) -> bool {
    let invalidated = self.cache.invalidate_prefix(&[json!(Issue::entity_type())]);
    debug!(invalidated, "Invalidated cached issue queries");
    self.refetch()
  }

  /// Apply any finished fetches. Returns true if either query's state
  /// changed since the last tick, including changes made by key handlers.
  pub fn tick(&mut self) -> bool {
    self.list.poll();
    self.search.poll();
    let list = take_change(&mut self.list_updates);
    let search = take_change(&mut self.search_updates);
    list || search
  }

  /// Wait for both in-flight requests, if any.
  pub async fn settle(&mut self) -> bool {
    let list = self.list.settle().await;
    let search = self.search.settle().await;
    list || search
  }
}

fn take_change<T>(updates: &mut watch::Receiver<T>) -> bool {
  let changed = updates.has_changed().unwrap_or(false);
  if changed {
    updates.borrow_and_update();
  }
  changed
}

/// Issues screen: paginated list with a `/` search box
pub struct IssuesListView {
  source: Arc<dyn IssueSource>,
  cache: QueryCache,
  stale_time: Duration,
  model: IssuesListModel,
  list_state: ListState,
  search: SearchInput,
}

impl IssuesListView {
  pub fn new(
    source: Arc<dyn IssueSource>,
    cache: QueryCache,
    filter: IssueFilter,
    stale_time: Duration,
    sticky_search: bool,
  ) -> Self {
    let model = IssuesListModel::new(
      source.clone(),
      cache.clone(),
      filter,
      stale_time,
      sticky_search,
    );

    Self {
      source,
      cache,
      stale_time,
      model,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  /// Start with a search already submitted, as if typed into the box.
  pub fn with_search(mut self, term: &str) -> Self {
    if !term.is_empty() {
      self.model.set_search_value(term);
    }
    self
  }

  fn title(&self, display: &IssuesDisplay) -> String {
    match display {
      IssuesDisplay::Loading => " Issues (loading...) ".to_string(),
      IssuesDisplay::Error(_) => " Issues (error) ".to_string(),
      IssuesDisplay::Issues {
        issues,
        is_fetching,
        ..
      } => {
        let fetching = if *is_fetching { ", fetching..." } else { "" };
        format!(" Issues ({}{}) ", issues.len(), fetching)
      }
      IssuesDisplay::SearchLoading if self.model.search_is_cleared() => " Search ".to_string(),
      IssuesDisplay::SearchLoading => {
        format!(" Search \"{}\" (loading...) ", self.model.search_value())
      }
      IssuesDisplay::SearchError(_) => {
        format!(" Search \"{}\" (error) ", self.model.search_value())
      }
      IssuesDisplay::SearchResults {
        results,
        is_fetching,
      } => {
        let fetching = if *is_fetching { ", fetching..." } else { "" };
        format!(
          " Search \"{}\" ({} results{}) ",
          self.model.search_value(),
          results.count,
          fetching
        )
      }
    }
  }

  fn pagination_line(&self) -> Line<'static> {
    let enabled = Style::default().fg(Color::Cyan);
    let disabled = Style::default().fg(Color::DarkGray);

    let prev = if self.model.can_go_previous() {
      enabled
    } else {
      disabled
    };
    let next = if self.model.can_go_next() {
      enabled
    } else {
      disabled
    };

    let fetching = if self.model.list_snapshot().is_fetching() {
      " ..."
    } else {
      ""
    };

    Line::from(vec![
      Span::styled(" < prev ", prev),
      Span::styled(
        format!(" Page {}{} ", self.model.page_num(), fetching),
        Style::default().fg(Color::White),
      ),
      Span::styled(" next > ", next),
    ])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let display = self.model.display();

    let mut block = Block::default()
      .title(self.title(&display))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    if matches!(display, IssuesDisplay::Issues { .. }) {
      block = block.title_bottom(self.pagination_line().centered());
    }

    let message = match &display {
      IssuesDisplay::SearchLoading if self.model.search_is_cleared() => Some((
        "No search active. Press / to search.".to_string(),
        Style::default().fg(Color::DarkGray),
      )),
      IssuesDisplay::Loading | IssuesDisplay::SearchLoading => Some((
        "Loading...".to_string(),
        Style::default().fg(Color::DarkGray),
      )),
      IssuesDisplay::Error(e) | IssuesDisplay::SearchError(e) => Some((
        format!("Error: {}\n\nPress 'r' to retry.", e),
        Style::default().fg(Color::Red),
      )),
      _ if display.issues().is_empty() => Some((
        "No issues found.".to_string(),
        Style::default().fg(Color::DarkGray),
      )),
      _ => None,
    };

    if let Some((text, style)) = message {
      frame.render_widget(Paragraph::new(text).block(block).style(style), area);
      return;
    }

    let issues = display.issues();
    ensure_valid_selection(&mut self.list_state, issues.len());

    let now = Utc::now();
    let items: Vec<ListItem> = issues.iter().map(|issue| issue_item(issue, now)).collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn selected_issue(&self) -> Option<Issue> {
    let idx = self.list_state.selected()?;
    self.model.display().issues().get(idx).cloned()
  }
}

/// Two-line list entry: number, title, labels and status, then the byline
fn issue_item(issue: &Issue, now: chrono::DateTime<Utc>) -> ListItem<'static> {
  let mut title = vec![
    Span::styled(
      format!("#{:<5}", issue.number),
      Style::default().fg(Color::Cyan),
    ),
    Span::raw(" "),
    Span::raw(truncate(&issue.title, 60)),
  ];
  for label in &issue.labels {
    title.push(Span::raw(" "));
    title.push(Span::styled(
      format!("[{}]", label),
      Style::default().fg(Color::Magenta),
    ));
  }
  title.push(Span::raw("  "));
  title.push(Span::styled(
    status_label(&issue.status),
    Style::default().fg(status_color(&issue.status)),
  ));

  let comments = match issue.comments.len() {
    1 => "1 comment".to_string(),
    n => format!("{} comments", n),
  };
  let byline = Line::from(Span::styled(
    format!(
      "       opened {} by {}, {}",
      relative_date(&issue.created_date, now),
      issue.created_by,
      comments
    ),
    Style::default().fg(Color::DarkGray),
  ));

  ListItem::new(vec![Line::from(title), byline])
}

impl View for IssuesListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(SearchEvent::Submitted(term)) => {
        self.model.set_search_value(term);
        self.list_state.select(None);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Cleared) => {
        self.model.on_search_input_changed("");
        self.list_state.select(None);
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('n') | KeyCode::Right => {
        if self.model.can_go_next() {
          self.model.next_page();
          self.list_state.select(None);
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if self.model.can_go_previous() {
          self.model.previous_page();
          self.list_state.select(None);
        }
      }
      KeyCode::Char('r') => {
        self.model.refetch();
      }
      KeyCode::Char('R') => {
        self.model.reload_all();
      }
      KeyCode::Enter => {
        if let Some(issue) = self.selected_issue() {
          return ViewAction::Push(Box::new(IssueDetailView::new(
            self.source.clone(),
            self.cache.clone(),
            issue.number,
            self.stale_time,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    let key = if self.model.shows_search_results() && !self.model.search_value().is_empty() {
      IssueQueryKey::Search {
        term: self.model.search_value().to_string(),
      }
    } else {
      IssueQueryKey::List(self.model.filter().clone())
    };
    key.description()
  }

  fn tick(&mut self) -> bool {
    self.model.tick()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.search.is_active() {
      return vec![
        Shortcut::new("enter", "search"),
        Shortcut::new("esc", "cancel"),
      ];
    }
    vec![
      Shortcut::new("/", "search"),
      Shortcut::new("n/p", "page"),
      Shortcut::new("enter", "open"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("R", "reload all"),
      Shortcut::new("q", "quit"),
    ]
  }
}
