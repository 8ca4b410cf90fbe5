use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the search input that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Enter pressed with this value
  Submitted(String),
  /// The input became empty (edited down to nothing, or cancelled)
  Cleared,
}

/// Search box opened with `/`.
///
/// Mirrors a search form: the term is only applied on submit, except that
/// emptying the box clears the search immediately.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  buffer: String,
  /// Cursor position in chars
  cursor: usize,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    &self.buffer
  }

  /// Open the box, keeping the last value for editing.
  pub fn activate(&mut self) {
    self.active = true;
    self.cursor = self.buffer.chars().count();
  }

  fn byte_index(&self, char_index: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(char_index)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  /// Handle a key event. Call this regardless of active state - it handles
  /// activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    let was_empty = self.buffer.is_empty();

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.buffer.clear();
        self.cursor = 0;
        return if was_empty {
          KeyResult::Handled
        } else {
          KeyResult::Event(SearchEvent::Cleared)
        };
      }
      KeyCode::Enter => {
        self.active = false;
        return KeyResult::Event(SearchEvent::Submitted(self.buffer.clone()));
      }
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let at = self.byte_index(self.cursor);
          self.buffer.remove(at);
        }
      }
      KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
      KeyCode::Right => self.cursor = (self.cursor + 1).min(self.buffer.chars().count()),
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        let at = self.byte_index(self.cursor);
        self.buffer.drain(..at);
        self.cursor = 0;
      }
      KeyCode::Char(c) => {
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
      }
      _ => {}
    }

    if !was_empty && self.buffer.is_empty() {
      KeyResult::Event(SearchEvent::Cleared)
    } else {
      KeyResult::Handled
    }
  }

  /// Render the search box over the top-left of `area` if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search Issues ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}
