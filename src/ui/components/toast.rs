//! Transient success/error notifications.
//!
//! Anything holding a `Notifier` can raise a toast, including tasks spawned
//! by mutations. The app drains the channel into `Toasts` on every tick and
//! drops toasts once they expire.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(4);

const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
  pub kind: ToastKind,
  pub message: String,
}

impl Toast {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Error,
      message: message.into(),
    }
  }

  fn color(&self) -> Color {
    match self.kind {
      ToastKind::Success => Color::Green,
      ToastKind::Error => Color::Red,
    }
  }
}

/// Sending half for raising toasts from anywhere
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Toast>,
}

impl Notifier {
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Toast>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  pub fn notify(&self, toast: Toast) {
    // Receiver is gone only during shutdown
    let _ = self.tx.send(toast);
  }

  pub fn success(&self, message: impl Into<String>) {
    self.notify(Toast::success(message));
  }

  pub fn error(&self, message: impl Into<String>) {
    self.notify(Toast::error(message));
  }
}

/// Toasts currently on screen, oldest first
#[derive(Debug)]
pub struct Toasts {
  ttl: Duration,
  items: VecDeque<(Toast, Instant)>,
}

impl Default for Toasts {
  fn default() -> Self {
    Self::new(TOAST_TTL)
  }
}

impl Toasts {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      items: VecDeque::new(),
    }
  }

  pub fn push_at(&mut self, toast: Toast, now: Instant) {
    self.items.push_back((toast, now + self.ttl));
    while self.items.len() > MAX_VISIBLE {
      self.items.pop_front();
    }
  }

  /// Drop expired toasts. Returns whether anything was removed.
  pub fn expire(&mut self, now: Instant) -> bool {
    let before = self.items.len();
    self.items.retain(|(_, expires_at)| *expires_at > now);
    self.items.len() != before
  }

  pub fn visible(&self) -> impl Iterator<Item = &Toast> {
    self.items.iter().map(|(toast, _)| toast)
  }

  /// Stack toasts in the bottom-right corner of `area`
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = 48.min(area.width);
    let mut bottom = area.y + area.height;

    for toast in self.visible().collect::<Vec<_>>().into_iter().rev() {
      let inner_width = width.saturating_sub(2).max(1) as usize;
      let lines = toast.message.chars().count().div_ceil(inner_width).max(1) as u16;
      let height = lines + 2;
      if bottom < area.y + height {
        break;
      }
      bottom -= height;

      let toast_area = Rect::new(area.x + area.width - width, bottom, width, height);
      frame.render_widget(Clear, toast_area);
      let paragraph = Paragraph::new(toast.message.as_str())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(toast.color()))
        .block(
          Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(toast.color())),
        );
      frame.render_widget(paragraph, toast_area);
    }
  }
}
