use crate::api::store::ProductStore;
use crate::catalog::pagination::PageSize;
use crate::ui::components::Notifier;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::time::{Duration, Instant};

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

pub type Shortcut = ShortcutInfo;

/// What every view gets handed: the store, a way to raise toasts, and the
/// settings views read.
#[derive(Clone)]
pub struct ViewContext {
  pub store: ProductStore,
  pub notifier: Notifier,
  pub search_debounce: Duration,
  pub default_page_size: PageSize,
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, edit, etc.) and return
/// actions for the App to execute: App → View → Components.
///
/// Views that load data asynchronously use Query<T> internally and poll it
/// in tick().
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// The location query string this view mirrors, if any
  fn location(&self) -> Option<String> {
    None
  }

  /// Short status for the footer, e.g. the current page
  fn status(&self) -> Option<String> {
    None
  }

  /// True while a text field or overlay owns the keyboard, so that the
  /// app does not claim `:` or `q`
  fn captures_input(&self) -> bool {
    false
  }

  /// Handle a command-mode command addressed to this view; `args` is the
  /// rest of the command line. Returns false if the view has no use for it.
  fn on_command(&mut self, _name: &str, _args: &str) -> bool {
    false
  }

  /// Called on each tick for every view on the stack. Only the action
  /// returned by the topmost view is acted on.
  fn tick(&mut self, _now: Instant) -> ViewAction {
    ViewAction::None
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
