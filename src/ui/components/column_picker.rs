use super::KeyResult;
use crate::catalog::grid::{Column, DataGrid};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Overlay for toggling which grid columns are shown
#[derive(Debug, Clone, Default)]
pub struct ColumnPicker {
  active: bool,
  selected: usize,
}

impl ColumnPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self) {
    self.active = true;
    self.selected = 0;
  }

  fn columns() -> impl Iterator<Item = Column> {
    Column::ALL.into_iter().filter(|c| c.can_hide())
  }

  fn count() -> usize {
    Self::columns().count()
  }

  /// Space or Enter toggles the highlighted column on `grid`
  pub fn handle_key(&mut self, key: KeyEvent, grid: &mut DataGrid) -> KeyResult<()> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('v') => {
        self.active = false;
      }
      KeyCode::Char(' ') | KeyCode::Enter => {
        if let Some(column) = Self::columns().nth(self.selected) {
          grid.toggle_column(column);
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % Self::count();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = (self.selected + Self::count() - 1) % Self::count();
      }
      _ => {}
    }
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect, grid: &DataGrid) {
    if !self.active {
      return;
    }

    let width = 24.min(area.width);
    let height = (Self::count() as u16 + 2).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let items: Vec<ListItem> = Self::columns()
      .map(|column| {
        let mark = if grid.is_visible(column) { "[x]" } else { "[ ]" };
        ListItem::new(Line::from(vec![
          Span::styled(mark, Style::default().fg(Color::Yellow)),
          Span::raw(" "),
          Span::styled(column.label(), Style::default().fg(Color::Cyan)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(
        Block::default()
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Yellow))
          .title(" Columns "),
      )
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}
