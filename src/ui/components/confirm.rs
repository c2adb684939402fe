use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Events emitted by the confirm dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmEvent<T> {
  Confirmed(T),
  Cancelled,
}

/// Yes/no dialog guarding a destructive action on `T`
#[derive(Debug, Clone)]
pub struct ConfirmDialog<T> {
  pending: Option<(T, String)>,
}

impl<T> Default for ConfirmDialog<T> {
  fn default() -> Self {
    Self { pending: None }
  }
}

impl<T: Clone> ConfirmDialog<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn show(&mut self, subject: T, message: impl Into<String>) {
    self.pending = Some((subject, message.into()));
  }

  /// Swallows every key while open
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent<T>> {
    let Some((subject, _)) = &self.pending else {
      return KeyResult::NotHandled;
    };

    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
        let subject = subject.clone();
        self.pending = None;
        KeyResult::Event(ConfirmEvent::Confirmed(subject))
      }
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        self.pending = None;
        KeyResult::Event(ConfirmEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((_, message)) = &self.pending else {
      return;
    };

    let width = 56.min(area.width);
    let height = 7.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let text = vec![
      Line::from(message.as_str()),
      Line::from(""),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Red).bold()),
        Span::styled(" delete   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];

    let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Are you absolutely sure? "),
    );
    frame.render_widget(paragraph, overlay_area);
  }
}
