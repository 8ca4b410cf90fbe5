use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for an issue status
pub fn status_color(status: &str) -> Color {
  match status {
    "done" => Color::Green,
    "inProgress" => Color::Yellow,
    "cancelled" => Color::DarkGray,
    "backlog" => Color::Gray,
    _ => Color::White,
  }
}

/// Human-readable status label ("inProgress" -> "In Progress")
pub fn status_label(status: &str) -> String {
  let mut label = String::with_capacity(status.len() + 2);
  for (i, c) in status.chars().enumerate() {
    if i == 0 {
      label.extend(c.to_uppercase());
    } else if c.is_uppercase() {
      label.push(' ');
      label.push(c);
    } else {
      label.push(c);
    }
  }
  label
}

/// "3 days ago" style age of an RFC 3339 timestamp. Unparseable input is
/// returned unchanged.
pub fn relative_date(timestamp: &str, now: DateTime<Utc>) -> String {
  let Ok(then) = DateTime::parse_from_rfc3339(timestamp) else {
    return timestamp.to_string();
  };

  let elapsed = now.signed_duration_since(then.with_timezone(&Utc));
  let (value, unit) = if elapsed.num_days() >= 365 {
    (elapsed.num_days() / 365, "year")
  } else if elapsed.num_days() >= 30 {
    (elapsed.num_days() / 30, "month")
  } else if elapsed.num_days() >= 1 {
    (elapsed.num_days(), "day")
  } else if elapsed.num_hours() >= 1 {
    (elapsed.num_hours(), "hour")
  } else if elapsed.num_minutes() >= 1 {
    (elapsed.num_minutes(), "minute")
  } else {
    return "just now".to_string();
  };

  if value == 1 {
    format!("1 {} ago", unit)
  } else {
    format!("{} {}s ago", value, unit)
  }
}
