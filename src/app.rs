use crate::api::store::ProductStore;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Notifier, Toast, Toasts};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction, ViewContext};
use crate::ui::views::{ProductFormView, ProductListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);

/// How often expired cache entries are swept
const GC_INTERVAL: Duration = Duration::from_secs(60);

/// Main application state
pub struct App {
  /// Navigation stack - root is always the product list at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command line, owned by the app rather than any view
  command_input: CommandInput,

  toasts: Toasts,
  toast_rx: mpsc::UnboundedReceiver<Toast>,

  ctx: ViewContext,
  title: String,
  last_gc: Instant,
  should_quit: bool,
}

impl App {
  /// `location` is the initial query string, e.g. `?page=2&size=20`
  pub fn new(config: Config, location: &str) -> Result<Self> {
    let store = ProductStore::new(&config)?;
    let (notifier, toast_rx) = Notifier::channel();
    let ctx = ViewContext {
      store,
      notifier,
      search_debounce: config.search.debounce(),
      default_page_size: config.pagination.default_page_size,
    };

    let root = ProductListView::new(ctx.clone(), location);

    Ok(Self {
      view_stack: vec![Box::new(root)],
      command_input: CommandInput::new(),
      toasts: Toasts::default(),
      toast_rx,
      ctx,
      title: config.display_title(),
      last_gc: Instant::now(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    info!(title = %self.title, "p9s started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(Instant::now()),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self, now: Instant) {
    // Background views keep polling so their data is current when popped back to
    let top = self.view_stack.len().saturating_sub(1);
    let mut top_action = ViewAction::None;
    for (i, view) in self.view_stack.iter_mut().enumerate() {
      let action = view.tick(now);
      if i == top {
        top_action = action;
      }
    }
    self.apply(top_action);

    while let Ok(toast) = self.toast_rx.try_recv() {
      self.toasts.push_at(toast, now);
    }
    self.toasts.expire(now);

    if now.duration_since(self.last_gc) >= GC_INTERVAL {
      self.last_gc = now;
      match self.ctx.store.collect_garbage() {
        Ok(0) => {}
        Ok(removed) => debug!(removed, "collected expired cache entries"),
        Err(e) => warn!(error = %e, "cache garbage collection failed"),
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_captures = self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false);

    if self.command_input.is_active() || !view_captures {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(cmd, args)) => {
          self.execute_command(cmd.name, &args);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          if !input.is_empty() {
            self
              .toasts
              .push_at(Toast::error(format!("Unknown command: {}", input)), Instant::now());
          }
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, name: &str, args: &str) {
    debug!(command = name, args, "running command");
    match name {
      "products" => self.view_stack.truncate(1),
      "add" => {
        self.view_stack.truncate(1);
        self
          .view_stack
          .push(Box::new(ProductFormView::add(self.ctx.clone())));
      }
      "reset" | "refresh" | "goto" => {
        self.view_stack.truncate(1);
        if let Some(root) = self.view_stack.first_mut() {
          root.on_command(name, args);
        }
      }
      "quit" => self.should_quit = true,
      _ => {}
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();
    // The location belongs to the root list even while a detail is open
    let location = self.view_stack.first().and_then(|v| v.location());

    if let Some(view) = self.view_stack.last_mut() {
      let shortcuts = view.shortcuts();
      draw_header(frame, chunks[0], &self.title, location.as_deref(), &shortcuts);
      view.render(frame, chunks[1]);
      let status = view.status();
      draw_footer(frame, chunks[2], &breadcrumb, status.as_deref());
    }

    self.command_input.render_overlay(frame, chunks[1]);
    self.toasts.render(frame, chunks[1]);
  }
}
