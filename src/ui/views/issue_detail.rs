use chrono::{Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde_json::Value;
use std::sync::Arc;

use crate::api::{Issue, IssueQueryKey, IssueSource};
use crate::cache::QueryCache;
use crate::issues::IssueDetailQuery;
use crate::query::QueryPhase;
use crate::ui::renderfns::{relative_date, status_color, status_label};
use crate::ui::view::{Shortcut, View, ViewAction};

/// View for a single issue, opened from the list
pub struct IssueDetailView {
  query: IssueDetailQuery,
}

impl IssueDetailView {
  pub fn new(
    source: Arc<dyn IssueSource>,
    cache: QueryCache,
    number: u64,
    stale_time: Duration,
  ) -> Self {
    Self {
      query: IssueDetailQuery::new(source, cache, number, stale_time),
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let snapshot = self.query.snapshot();
    let number = self.query.number();

    let title = match snapshot.phase {
      QueryPhase::Fetching if snapshot.is_loading() => format!(" #{} (loading...) ", number),
      QueryPhase::Fetching => format!(" #{} (refreshing...) ", number),
      QueryPhase::Error if snapshot.data.is_some() => format!(" #{} (refresh failed) ", number),
      _ => match snapshot.updated_at {
        Some(at) => format!(
          " #{} (updated {}) ",
          number,
          relative_date(&at.to_rfc3339(), Utc::now())
        ),
        None => format!(" #{} ", number),
      },
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Cached data stays visible when a refresh fails
    let issue = match (&snapshot.data, snapshot.error_message()) {
      (Some(issue), _) => issue,
      (None, Some(error)) => {
        let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
        return;
      }
      (None, None) => {
        let paragraph =
          Paragraph::new("Loading issue...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(5), // Title, status, people, labels
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Comments
      ])
      .split(inner);

    frame.render_widget(Paragraph::new(header_lines(issue)), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let comments: Vec<Line> = if issue.comments.is_empty() {
      vec![Line::styled(
        "No comments",
        Style::default().fg(Color::DarkGray),
      )]
    } else {
      issue.comments.iter().map(comment_line).collect()
    };
    let comments_para = Paragraph::new(comments).wrap(Wrap { trim: true });
    frame.render_widget(comments_para, chunks[2]);
  }
}

fn header_lines(issue: &Issue) -> Vec<Line<'_>> {
  let dim = Style::default().fg(Color::DarkGray);
  let labels = if issue.labels.is_empty() {
    "none".to_string()
  } else {
    issue.labels.join(", ")
  };

  vec![
    Line::from(Span::styled(
      issue.title.as_str(),
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(vec![
      Span::styled("Status: ", dim),
      Span::styled(
        status_label(&issue.status),
        Style::default().fg(status_color(&issue.status)),
      ),
    ]),
    Line::from(vec![
      Span::styled("Opened: ", dim),
      Span::raw(format!(
        "{} by {}",
        relative_date(&issue.created_date, Utc::now()),
        issue.created_by
      )),
      Span::raw("  "),
      Span::styled("Assignee: ", dim),
      Span::raw(issue.assignee.as_deref().unwrap_or("Unassigned")),
    ]),
    Line::from(vec![Span::styled("Labels: ", dim), Span::raw(labels)]),
    Line::from(Span::styled(
      format!("{} comments", issue.comments.len()),
      dim,
    )),
  ]
}

/// Comments are free-form; show the text field when there is one
fn comment_line(comment: &Value) -> Line<'static> {
  let text = ["text", "body", "content"]
    .iter()
    .find_map(|field| comment.get(field).and_then(Value::as_str))
    .map(str::to_string)
    .unwrap_or_else(|| comment.to_string());
  Line::from(format!("- {}", text))
}

impl View for IssueDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    IssueQueryKey::Detail {
      number: self.query.number(),
    }
    .description()
  }

  fn tick(&mut self) -> bool {
    self.query.poll()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("r", "refresh"), Shortcut::new("q", "back")]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_comment_line() {
    assert_eq!(
      comment_line(&json!({"text": "Looks good"})),
      Line::from("- Looks good")
    );
    assert_eq!(comment_line(&json!("plain")), Line::from("- \"plain\""));
  }
}
