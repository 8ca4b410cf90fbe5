use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: view breadcrumb on the left, cache size on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], cached_entries: usize) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let [left, right] =
    Layout::horizontal([Constraint::Min(1), Constraint::Length(20)]).areas(area);

  frame.render_widget(
    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black)),
    left,
  );
  frame.render_widget(
    Paragraph::new(format!("cache: {} ", cached_entries))
      .alignment(Alignment::Right)
      .style(Style::default().fg(Color::DarkGray).bg(Color::Black)),
    right,
  );
}
