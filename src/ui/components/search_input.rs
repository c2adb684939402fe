use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::catalog::debounce::Debouncer;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::time::{Duration, Instant};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Apply this filter now
  Apply(String),
}

/// Title search with a debounced filter.
///
/// Every keystroke updates the visible text, but the filter is only applied
/// once typing has paused for the debounce delay. Enter applies at once,
/// Esc clears both.
#[derive(Debug, Clone)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
  debouncer: Debouncer<String>,
}

impl SearchInput {
  pub fn new(delay: Duration) -> Self {
    Self {
      input: TextInput::new(),
      active: false,
      debouncer: Debouncer::new(delay),
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Text as typed, which may run ahead of the applied filter
  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Open the overlay, keeping the current text for editing
  pub fn activate(&mut self) {
    self.active = true;
  }

  /// Drop the text and any pending filter
  pub fn clear(&mut self) {
    self.active = false;
    self.input.clear();
    self.debouncer.cancel();
  }

  /// Deliver the pending filter once its delay has passed
  pub fn poll(&mut self, now: Instant) -> Option<SearchEvent> {
    self.debouncer.poll(now).map(SearchEvent::Apply)
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    self.handle_key_at(key, Instant::now())
  }

  /// Call this regardless of active state - it handles activation too
  pub fn handle_key_at(&mut self, key: KeyEvent, now: Instant) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        self.debouncer.cancel();
        KeyResult::Event(SearchEvent::Apply(value))
      }
      InputResult::Cancelled => {
        self.clear();
        KeyResult::Event(SearchEvent::Apply(String::new()))
      }
      InputResult::Consumed => {
        self.debouncer.push(self.input.value().to_string(), now);
        KeyResult::Handled
      }
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let title = if self.debouncer.is_pending() {
      " Filter by title … "
    } else {
      " Filter by title "
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.query()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}
