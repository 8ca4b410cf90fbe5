pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::ListState;

use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::View;

/// Draw the header, the top view of the stack and the footer
pub fn draw(frame: &mut Frame, views: &mut [Box<dyn View>], host: &str, cached_entries: usize) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let breadcrumb: Vec<String> = views.iter().map(|v| v.breadcrumb_label()).collect();

  if let Some(view) = views.last_mut() {
    draw_header(frame, chunks[0], host, &view.shortcuts());
    view.render(frame, chunks[1]);
  }

  draw_footer(frame, chunks[2], &breadcrumb, cached_entries);
}

/// Keep the list selection inside `len` items, selecting the first when
/// nothing is selected.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    Some(_) => {}
  }
}
