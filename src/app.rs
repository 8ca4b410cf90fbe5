use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;

use crate::api::{IssueFilter, IssueSource, IssuesClient};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::renderfns::display_host;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{IssueDetailView, IssuesListView};

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Shared by every view's queries
  cache: QueryCache,

  config: Config,

  /// Server shown in the header
  host: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(
    config: Config,
    filter: IssueFilter,
    search: Option<&str>,
    issue: Option<u64>,
  ) -> Result<Self> {
    let client = IssuesClient::new(&config.api)?;
    let host = display_host(client.base_url().as_str()).to_string();
    let source: Arc<dyn IssueSource> = Arc::new(client);
    let cache = QueryCache::new();

    let root = IssuesListView::new(
      source.clone(),
      cache.clone(),
      filter,
      config.stale_time(),
      config.search.sticky_results,
    )
    .with_search(search.unwrap_or_default());

    let mut view_stack: Vec<Box<dyn View>> = vec![Box::new(root)];
    if let Some(number) = issue {
      view_stack.push(Box::new(IssueDetailView::new(
        source,
        cache.clone(),
        number,
        config.stale_time(),
      )));
    }

    Ok(Self {
      view_stack,
      cache,
      config,
      host,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(self.config.tick_rate());
    tracing::info!(host = %self.host, "Started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    let mut dirty = true;
    while !self.should_quit {
      if dirty {
        let cached_entries = self.cache.len();
        terminal.draw(|frame| ui::draw(frame, &mut self.view_stack, &self.host, cached_entries))?;
      }

      match events.next().await {
        Some(event) => dirty = self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  /// Returns whether the screen needs a redraw.
  fn handle_event(&mut self, event: Event) -> bool {
    let input = match event {
      Event::Key(key) => {
        self.handle_key(key);
        true
      }
      Event::Resize => true,
      Event::Tick => false,
    };
    let changed = self.tick();
    input || changed
  }

  /// Let every view on the stack apply finished fetches, so a list keeps
  /// updating while a detail view is open.
  fn tick(&mut self) -> bool {
    self
      .view_stack
      .iter_mut()
      .fold(false, |changed, view| view.tick() || changed)
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let Some(view) = self.view_stack.last_mut() else {
      self.should_quit = true;
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }
}
