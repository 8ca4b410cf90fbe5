//! `--print` mode: load one page, one search or one issue and print it as text.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

use crate::api::{Issue, IssueFilter, IssuesClient};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::issues::IssueDetailQuery;
use crate::ui::renderfns::{relative_date, status_label};
use crate::ui::views::{IssuesDisplay, IssuesListModel};

pub async fn run(config: &Config, filter: IssueFilter, search: Option<&str>) -> Result<()> {
  let client = IssuesClient::new(&config.api)?;
  let mut model = IssuesListModel::new(
    Arc::new(client),
    QueryCache::new(),
    filter,
    config.stale_time(),
    config.search.sticky_results,
  );
  if let Some(term) = search {
    model.set_search_value(term);
  }
  model.settle().await;

  let display = model.display();
  if let IssuesDisplay::Error(message) | IssuesDisplay::SearchError(message) = &display {
    return Err(eyre!("Failed to load issues: {}", message));
  }

  for line in render_lines(&display, model.page_num(), Utc::now()) {
    println!("{}", line);
  }
  Ok(())
}

pub async fn print_issue(config: &Config, number: u64) -> Result<()> {
  let client = IssuesClient::new(&config.api)?;
  let mut detail = IssueDetailQuery::new(
    Arc::new(client),
    QueryCache::new(),
    number,
    config.stale_time(),
  );
  detail.settle().await;

  let snapshot = detail.snapshot();
  if !snapshot.is_success() {
    let message = snapshot
      .error_message()
      .unwrap_or_else(|| "no response".to_string());
    return Err(eyre!("Failed to load issue #{}: {}", number, message));
  }
  let issue = snapshot
    .data
    .ok_or_else(|| eyre!("No data for issue #{}", number))?;

  println!("{}", issue_line(&issue, Utc::now()));
  println!("assignee: {}", issue.assignee.as_deref().unwrap_or("unassigned"));
  Ok(())
}

fn render_lines(display: &IssuesDisplay, page_num: u32, now: DateTime<Utc>) -> Vec<String> {
  let mut lines = match display {
    IssuesDisplay::Issues { issues, .. } => vec![format!("Page {} ({} issues)", page_num, issues.len())],
    IssuesDisplay::SearchResults { results, .. } => vec![format!("{} results", results.count)],
    _ => Vec::new(),
  };
  lines.extend(display.issues().iter().map(|issue| issue_line(issue, now)));
  lines
}

fn issue_line(issue: &Issue, now: DateTime<Utc>) -> String {
  let labels = if issue.labels.is_empty() {
    String::new()
  } else {
    format!(" [{}]", issue.labels.join(", "))
  };
  format!(
    "#{} {}{} ({}) opened {} by {}, {} comments",
    issue.number,
    issue.title,
    labels,
    status_label(&issue.status),
    relative_date(&issue.created_date, now),
    issue.created_by,
    issue.comments.len()
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::SearchResults;
  use chrono::TimeZone;

  fn issue() -> Issue {
    Issue {
      id: "abc".to_string(),
      number: 12,
      title: "Crash on save".to_string(),
      assignee: None,
      comments: vec![serde_json::json!({"text": "same here"})],
      created_by: "dana".to_string(),
      created_date: "2024-06-13T12:00:00Z".to_string(),
      labels: vec!["bug".to_string(), "editor".to_string()],
      status: "inProgress".to_string(),
    }
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
  }

  #[test]
  fn test_list_lines() {
    let display = IssuesDisplay::Issues {
      issues: vec![issue()],
      is_previous_data: false,
      is_fetching: false,
    };
    assert_eq!(
      render_lines(&display, 3, now()),
      vec![
        "Page 3 (1 issues)".to_string(),
        "#12 Crash on save [bug, editor] (In Progress) opened 2 days ago by dana, 1 comments"
          .to_string(),
      ]
    );
  }

  #[test]
  fn test_search_lines() {
    let display = IssuesDisplay::SearchResults {
      results: SearchResults {
        count: 0,
        items: Vec::new(),
      },
      is_fetching: false,
    };
    assert_eq!(render_lines(&display, 1, now()), vec!["0 results"]);
  }
}
