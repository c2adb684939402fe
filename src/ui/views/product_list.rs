use super::{delete_prompt, delete_with_toast, ProductDetailView, ProductFormView};
use crate::api::types::{Product, ProductList};
use crate::cache::{CacheObserver, CacheResult, CacheSource};
use crate::catalog::grid::{Column, DataGrid, SortDirection};
use crate::catalog::pagination::{PaginationState, PaginationSync, PaginationUpdate};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{
  ColumnPicker, ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, rating_color, stock_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use std::time::Instant;
use tracing::{debug, warn};

/// The product grid: every product fetched once, then filtered, sorted and
/// paginated locally. Pagination lives in the location query string.
pub struct ProductListView {
  ctx: ViewContext,
  query: Query<CacheResult<ProductList>>,
  /// Pins the cached list while it is on screen
  _observer: CacheObserver,
  seen_generation: u64,
  pagination: PaginationSync,
  grid: DataGrid,
  table_state: TableState,
  focused_column: Column,
  search: SearchInput,
  column_picker: ColumnPicker,
  confirm: ConfirmDialog<u64>,
  delete: Mutation<u64, ()>,
  refresh: Mutation<(), ()>,
}

impl ProductListView {
  pub fn new(ctx: ViewContext, location: &str) -> Self {
    let observer = ctx.store.observe_products();
    let store = ctx.store.clone();
    let mut query = Query::new(move || {
      let store = store.clone();
      async move { store.all_products().await.map_err(|e| e.to_string()) }
    });
    query.fetch();

    let store = ctx.store.clone();
    let notifier = ctx.notifier.clone();
    let delete = Mutation::new(move |id: u64| {
      let store = store.clone();
      let notifier = notifier.clone();
      async move { delete_with_toast(&store, &notifier, id).await }
    });

    let store = ctx.store.clone();
    let notifier = ctx.notifier.clone();
    let refresh = Mutation::new(move |()| {
      let store = store.clone();
      let notifier = notifier.clone();
      async move {
        store.refresh_products().await.map(|_| ()).map_err(|e| {
          warn!(error = %e, "refresh failed");
          notifier.error("Failed to refresh products. Showing cached data.");
          e.to_string()
        })
      }
    });

    Self {
      _observer: observer,
      seen_generation: ctx.store.generation(),
      pagination: PaginationSync::new(location, ctx.default_page_size),
      search: SearchInput::new(ctx.search_debounce),
      query,
      grid: DataGrid::new(),
      table_state: TableState::default().with_selected(Some(0)),
      focused_column: Column::Title,
      column_picker: ColumnPicker::new(),
      confirm: ConfirmDialog::new(),
      delete,
      refresh,
      ctx,
    }
  }

  fn products(&self) -> &[Product] {
    self
      .query
      .data()
      .map(|result| result.data.products.as_slice())
      .unwrap_or(&[])
  }

  fn filtered_count(&self) -> usize {
    self.grid.rows(self.products()).len()
  }

  fn selected_product(&self) -> Option<Product> {
    let page = self.grid.page(self.products(), self.pagination.state());
    let index = self.table_state.selected()?;
    page.rows.get(index).map(|p| (*p).clone())
  }

  /// Jump to a page, clamped to the last one
  fn set_page(&mut self, index: usize) {
    let last = self
      .pagination
      .state()
      .page_count(self.filtered_count())
      .saturating_sub(1);
    let target = index.min(last);
    self
      .pagination
      .on_change(PaginationUpdate::map(move |s| PaginationState::new(target, s.page_size)));
    self.table_state.select(Some(0));
  }

  fn resize(&mut self, grow: bool) {
    self.pagination.on_change(PaginationUpdate::map(move |s| {
      let size = if grow { s.page_size.next() } else { s.page_size.prev() };
      s.with_page_size(size)
    }));
  }

  fn apply_filter(&mut self, value: String) {
    if self.grid.title_filter() == value {
      return;
    }
    debug!(filter = %value, "title filter applied");
    if value.is_empty() {
      self.grid.reset_filters();
    } else {
      self.grid.set_title_filter(&value);
    }
    self
      .pagination
      .on_change(PaginationUpdate::map(|s| PaginationState::new(0, s.page_size)));
    self.table_state.select(Some(0));
  }

  fn reset_filters(&mut self) {
    self.search.clear();
    self.apply_filter(String::new());
  }

  /// Replace the location, e.g. from `:goto ?page=3&size=20`
  fn goto(&mut self, location: &str) {
    let state = self.pagination.navigate(location);
    debug!(location, page = state.page_index, size = %state.page_size, "navigated");
    self.table_state.select(Some(0));
    self.sync_location();
  }

  fn move_column_focus(&mut self, forward: bool) {
    let visible = self.grid.visible_columns();
    let len = visible.len();
    let pos = visible
      .iter()
      .position(|c| *c == self.focused_column)
      .unwrap_or(0);
    let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
    self.focused_column = visible[next];
  }

  /// Pick up cache patches made by mutations anywhere in the app
  fn reload_from_cache(&mut self, refreshed: bool) {
    let generation = self.ctx.store.generation();
    if generation == self.seen_generation && !refreshed {
      return;
    }
    self.seen_generation = generation;

    match self.ctx.store.cached_products() {
      Ok(Some(list)) => {
        let (source, cached_at) = match self.query.data() {
          Some(current) if !refreshed => (current.source, current.cached_at),
          _ => (CacheSource::Network, None),
        };
        self.query.set_data(CacheResult {
          data: list,
          source,
          cached_at,
        });
      }
      // Gone from the cache (e.g. invalidated); load it again
      Ok(None) if !self.query.is_loading() => self.query.fetch(),
      Ok(None) => {}
      Err(e) => warn!(error = %e, "failed to read cached products"),
    }
  }

  /// Write the page back to the location when it points past the last page
  fn sync_location(&mut self) {
    if self.query.data().is_none() {
      return;
    }
    let state = self.pagination.state();
    let clamped = state.clamped(self.filtered_count());
    if clamped != state {
      debug!(from = state.page_index, to = clamped.page_index, "page clamped");
      self.pagination.on_change(clamped);
    }
  }

  fn title(&self, filtered_rows: usize) -> String {
    match self.query.state() {
      QueryState::Idle | QueryState::Loading => " Products (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Products (error: {}) ", e),
      QueryState::Success(result) => {
        let filter = if self.grid.is_filtered() {
          format!(" [title ~ \"{}\"]", self.grid.title_filter())
        } else {
          String::new()
        };
        let source = result
          .source
          .label()
          .map(|label| format!(" [{}]", label))
          .unwrap_or_default();
        format!(
          " Products{} ({} of {}){} ",
          filter, filtered_rows, result.data.total, source
        )
      }
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let products: &[Product] = self
      .query
      .data()
      .map(|result| result.data.products.as_slice())
      .unwrap_or(&[]);
    let page = self.grid.page(products, self.pagination.state());
    ensure_valid_selection(&mut self.table_state, page.rows.len());

    let block = Block::default()
      .title(self.title(page.filtered_rows))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if page.rows.is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load products. Press 'r' to retry.".to_string()
      } else if self.grid.is_filtered() {
        format!(
          "No products match \"{}\". Press 'x' to reset.",
          self.grid.title_filter()
        )
      } else {
        "No products.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let columns = self.grid.visible_columns();
    let sort = self.grid.sort();

    let header = Row::new(columns.iter().map(|column| {
      let mut label = column.label().to_string();
      if let Some(sort) = sort.filter(|s| s.column == *column) {
        label.push_str(match sort.direction {
          SortDirection::Asc => " ▲",
          SortDirection::Desc => " ▼",
        });
      }
      let mut style = Style::default().fg(Color::Yellow).bold();
      if *column == self.focused_column {
        style = style.underlined();
      }
      Cell::from(label).style(style)
    }));

    let rows = page
      .rows
      .iter()
      .map(|product| Row::new(columns.iter().map(|column| cell(product, *column))));

    let table = Table::new(rows, columns.iter().map(|c| width(*c)))
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

fn cell(product: &Product, column: Column) -> Cell<'static> {
  match column {
    Column::Id => Cell::from(product.id.to_string()).style(Style::default().fg(Color::Cyan)),
    Column::Title => Cell::from(truncate(&product.title, 48)),
    Column::Brand if product.brand.is_empty() => {
      Cell::from("-").style(Style::default().fg(Color::DarkGray))
    }
    Column::Brand => Cell::from(truncate(&product.brand, 20)),
    Column::Category => Cell::from(product.category.clone()),
    Column::Price => Cell::from(format_price(product.price)),
    Column::Rating => Cell::from(format!("{:.2}", product.rating))
      .style(Style::default().fg(rating_color(product.rating))),
    Column::Stock => {
      Cell::from(product.stock.to_string()).style(Style::default().fg(stock_color(product.stock)))
    }
  }
}

fn width(column: Column) -> Constraint {
  match column {
    Column::Id => Constraint::Length(5),
    Column::Title => Constraint::Min(20),
    Column::Brand => Constraint::Length(20),
    Column::Category => Constraint::Length(18),
    Column::Price => Constraint::Length(10),
    Column::Rating => Constraint::Length(8),
    Column::Stock => Constraint::Length(7),
  }
}

impl View for ProductListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed(id)) => {
        self.delete.mutate(id);
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    if self.column_picker.handle_key(key, &mut self.grid) != KeyResult::NotHandled {
      if !self.grid.is_visible(self.focused_column) {
        self.focused_column = Column::Title;
      }
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Apply(value)) => {
        self.apply_filter(value);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
        self.set_page(self.pagination.state().page_index + 1)
      }
      KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
        self.set_page(self.pagination.state().page_index.saturating_sub(1))
      }
      KeyCode::Char('g') | KeyCode::Home => self.set_page(0),
      KeyCode::Char('G') | KeyCode::End => self.set_page(usize::MAX),
      KeyCode::Char('+') => self.resize(true),
      KeyCode::Char('-') => self.resize(false),
      KeyCode::Char('>') => self.move_column_focus(true),
      KeyCode::Char('<') => self.move_column_focus(false),
      KeyCode::Char('s') => self.grid.toggle_sort(self.focused_column),
      KeyCode::Char('v') => self.column_picker.show(),
      KeyCode::Char('x') => self.reset_filters(),
      KeyCode::Char('r') => {
        self.refresh.mutate(());
      }
      KeyCode::Char('a') => {
        return ViewAction::Push(Box::new(ProductFormView::add(self.ctx.clone())));
      }
      KeyCode::Char('e') => {
        if let Some(product) = self.selected_product() {
          return ViewAction::Push(Box::new(ProductFormView::edit(self.ctx.clone(), &product)));
        }
      }
      KeyCode::Char('d') => {
        if let Some(product) = self.selected_product() {
          self.confirm.show(product.id, delete_prompt(&product.title));
        }
      }
      KeyCode::Enter => {
        if let Some(product) = self.selected_product() {
          return ViewAction::Push(Box::new(ProductDetailView::new(self.ctx.clone(), product.id)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    self.column_picker.render_overlay(frame, area, &self.grid);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Products".to_string()
  }

  fn location(&self) -> Option<String> {
    Some(self.pagination.location())
  }

  fn status(&self) -> Option<String> {
    self.query.data()?;
    let page = self.grid.page(self.products(), self.pagination.state());
    Some(format!(
      "Page {} of {} · {} per page",
      page.state.page_index + 1,
      page.page_count,
      page.state.page_size
    ))
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.column_picker.is_active() || self.confirm.is_active()
  }

  fn on_command(&mut self, name: &str, args: &str) -> bool {
    match name {
      "goto" => {
        self.goto(args);
        true
      }
      "reset" => {
        self.reset_filters();
        true
      }
      "refresh" => {
        self.refresh.mutate(());
        true
      }
      _ => false,
    }
  }

  fn tick(&mut self, now: Instant) -> ViewAction {
    self.query.poll();
    if let Some(Err(e)) = self.delete.poll() {
      debug!(error = %e, "delete from list failed");
    }
    let refreshed = matches!(self.refresh.poll(), Some(Ok(())));
    self.reload_from_cache(refreshed);

    if let Some(SearchEvent::Apply(value)) = self.search.poll(now) {
      self.apply_filter(value);
    }
    self.sync_location();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "filter").with_priority(20),
      Shortcut::new("a", "add").with_priority(30),
      Shortcut::new("e", "edit").with_priority(31),
      Shortcut::new("d", "delete").with_priority(32),
      Shortcut::new("n/p", "page").with_priority(40),
      Shortcut::new("+/-", "size").with_priority(41),
      Shortcut::new("</>/s", "sort").with_priority(50),
      Shortcut::new("v", "columns").with_priority(51),
      Shortcut::new("x", "reset").with_priority(52),
      Shortcut::new("r", "refresh").with_priority(60),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ui::components::input::tests::key;
  use crate::ui::views::tests::context_with;
  use std::time::Duration;

  async fn loaded(ids: &[u64], location: &str) -> ProductListView {
    let mut view = ProductListView::new(context_with(ids), location);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick(Instant::now());
    view
  }

  fn press(view: &mut ProductListView, code: KeyCode) {
    let _ = view.handle_key(key(code));
  }

  fn ids(range: std::ops::RangeInclusive<u64>) -> Vec<u64> {
    range.collect()
  }

  #[tokio::test]
  async fn test_location_drives_page() {
    let mut view = loaded(&ids(1..=25), "?page=3").await;
    assert_eq!(view.status().unwrap(), "Page 3 of 3 · 10 per page");

    press(&mut view, KeyCode::Char('p'));
    assert_eq!(view.location().unwrap(), "?page=2");
    assert_eq!(view.selected_product().unwrap().id, 11);
  }

  #[tokio::test]
  async fn test_page_past_end_is_clamped_in_location() {
    let view = loaded(&ids(1..=25), "?page=9").await;
    assert_eq!(view.location().unwrap(), "?page=3");
  }

  #[tokio::test]
  async fn test_next_page_stops_at_last() {
    let mut view = loaded(&ids(1..=15), "").await;
    press(&mut view, KeyCode::Char('n'));
    press(&mut view, KeyCode::Char('n'));
    assert_eq!(view.location().unwrap(), "?page=2");
    press(&mut view, KeyCode::Char('g'));
    assert_eq!(view.location().unwrap(), "?page=1");
  }

  #[tokio::test]
  async fn test_resize_writes_size_only_when_not_default() {
    let mut view = loaded(&ids(1..=60), "?page=2").await;
    press(&mut view, KeyCode::Char('+'));
    assert_eq!(view.location().unwrap(), "?page=1&size=20");
    press(&mut view, KeyCode::Char('-'));
    assert_eq!(view.location().unwrap(), "?page=1");
  }

  #[tokio::test]
  async fn test_filter_applies_after_debounce_and_resets_page() {
    let mut view = loaded(&ids(1..=25), "?page=2").await;
    press(&mut view, KeyCode::Char('/'));
    for c in "Product 2".chars() {
      press(&mut view, KeyCode::Char(c));
    }
    assert!(view.captures_input());

    view.tick(Instant::now());
    assert_eq!(view.filtered_count(), 25);

    view.tick(Instant::now() + Duration::from_millis(600));
    // "Product 2" and "Product 20".."Product 25"
    assert_eq!(view.filtered_count(), 7);
    assert_eq!(view.location().unwrap(), "?page=1");

    press(&mut view, KeyCode::Esc);
    assert_eq!(view.filtered_count(), 25);
  }

  #[tokio::test]
  async fn test_delete_asks_for_confirmation() {
    let mut view = loaded(&ids(1..=3), "").await;
    press(&mut view, KeyCode::Char('d'));
    assert!(view.captures_input());
    press(&mut view, KeyCode::Char('n'));
    assert!(!view.captures_input());
    assert!(!view.delete.is_pending());
  }

  #[tokio::test]
  async fn test_sort_focused_column() {
    let mut view = loaded(&[3, 1, 2], "").await;
    press(&mut view, KeyCode::Char('<'));
    press(&mut view, KeyCode::Char('s'));
    press(&mut view, KeyCode::Char('s'));
    assert_eq!(view.selected_product().unwrap().id, 3);
    press(&mut view, KeyCode::Char('s'));
    press(&mut view, KeyCode::Char('s'));
    assert_eq!(view.selected_product().unwrap().id, 1);
  }

  #[tokio::test]
  async fn test_open_list_is_kept_through_gc() {
    let ctx = context_with(&ids(1..=5));
    let store = ctx.store.clone();
    let view = ProductListView::new(ctx, "");
    let later = chrono::Utc::now() + chrono::Duration::minutes(11);

    assert_eq!(store.collect_garbage_at(later).unwrap(), 0);
    assert_eq!(store.cached_products().unwrap().unwrap().total, 5);

    drop(view);
    assert_eq!(store.collect_garbage_at(later).unwrap(), 1);
    assert!(store.cached_products().unwrap().is_none());
  }

  #[tokio::test]
  async fn test_goto_command_replaces_location() {
    let mut view = loaded(&ids(1..=60), "?page=2").await;
    assert!(view.on_command("goto", "?page=3&size=20"));
    assert_eq!(view.status().unwrap(), "Page 3 of 3 · 20 per page");
    assert_eq!(view.selected_product().unwrap().id, 41);

    // Past the end is clamped and written back
    view.on_command("goto", "?page=9");
    assert_eq!(view.location().unwrap(), "?page=6");

    view.on_command("goto", "");
    assert_eq!(view.location().unwrap(), "");
    assert_eq!(view.status().unwrap(), "Page 1 of 6 · 10 per page");
  }
}
