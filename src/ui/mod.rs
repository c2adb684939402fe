pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::widgets::TableState;

/// Keep a table selection inside `len` rows, selecting the first row when
/// there is none
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
