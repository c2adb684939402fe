use super::{delete_prompt, delete_with_toast, ProductFormView};
use crate::api::types::Product;
use crate::cache::{CacheObserver, CacheResult};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::renderfns::{format_price, rating_color, stock_color};
use crate::ui::view::{Shortcut, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::time::Instant;

/// One product, looked up through the list cache first
pub struct ProductDetailView {
  ctx: ViewContext,
  id: u64,
  query: Query<CacheResult<Product>>,
  _observer: CacheObserver,
  seen_generation: u64,
  confirm: ConfirmDialog<u64>,
  delete: Mutation<u64, ()>,
  scroll: u16,
}

impl ProductDetailView {
  pub fn new(ctx: ViewContext, id: u64) -> Self {
    let store = ctx.store.clone();
    let mut query = Query::new(move || {
      let store = store.clone();
      async move { store.product(id).await.map_err(|e| e.to_string()) }
    });
    query.fetch();

    let store = ctx.store.clone();
    let notifier = ctx.notifier.clone();
    let delete = Mutation::new(move |id: u64| {
      let store = store.clone();
      let notifier = notifier.clone();
      async move { delete_with_toast(&store, &notifier, id).await }
    });

    Self {
      _observer: ctx.store.observe_product(id),
      seen_generation: ctx.store.generation(),
      ctx,
      id,
      query,
      confirm: ConfirmDialog::new(),
      delete,
      scroll: 0,
    }
  }

  fn product(&self) -> Option<&Product> {
    self.query.data().map(|result| &result.data)
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Idle | QueryState::Loading => format!(" #{} (loading...) ", self.id),
      QueryState::Error(_) => format!(" #{} ", self.id),
      QueryState::Success(result) => {
        let source = result
          .source
          .label()
          .map(|label| format!(" [{}]", label))
          .unwrap_or_default();
        format!(" {} (#{}){} ", result.data.title, self.id, source)
      }
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading product...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let text = vec![
        Line::from(Span::styled(
          "Product not found or failed to load.",
          Style::default().fg(Color::Red).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(error, Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
          "Press 'r' to retry or 'q' to go back.",
          Style::default().fg(Color::DarkGray),
        )),
      ];
      frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
      return;
    }

    let Some(product) = self.product() else {
      return;
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));

    let mut lines = vec![
      Line::from(Span::styled(
        product.category.to_uppercase(),
        Style::default().fg(Color::Magenta).bold(),
      )),
      Line::from(Span::styled(
        product.title.as_str(),
        Style::default().fg(Color::White).bold(),
      )),
      Line::from(vec![
        label("Brand: "),
        Span::raw(if product.brand.is_empty() {
          "-"
        } else {
          product.brand.as_str()
        }),
      ]),
      Line::from(""),
      Line::from(vec![
        label("Rating: "),
        Span::styled(
          format!("{:.2}", product.rating),
          Style::default().fg(rating_color(product.rating)),
        ),
        Span::raw("   "),
        label("Price: "),
        Span::styled(
          format_price(product.price),
          Style::default().fg(Color::Green).bold(),
        ),
      ]),
      Line::from(vec![
        label("Stock: "),
        Span::styled(
          product.stock.to_string(),
          Style::default().fg(stock_color(product.stock)),
        ),
        Span::raw("   "),
        label("Discount: "),
        Span::raw(format!("{:.2}%", product.discount_percentage)),
      ]),
      Line::from(""),
      Line::from(product.description.as_str()),
      Line::from(""),
      Line::from(vec![label("Thumbnail: "), Span::raw(product.thumbnail.as_str())]),
    ];

    if !product.images.is_empty() {
      lines.push(Line::from(label("Images:")));
      lines.extend(
        product
          .images
          .iter()
          .map(|url| Line::from(format!("  {}", url))),
      );
    }

    let paragraph = Paragraph::new(lines)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, inner);
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed(id)) => {
        self.delete.mutate(id);
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('e') => {
        if let Some(product) = self.product() {
          return ViewAction::Push(Box::new(ProductFormView::edit(self.ctx.clone(), product)));
        }
      }
      KeyCode::Char('d') => {
        if let Some(product) = self.product() {
          let prompt = delete_prompt(&product.title);
          self.confirm.show(self.id, prompt);
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.product() {
      Some(product) => product.title.clone(),
      None => format!("#{}", self.id),
    }
  }

  fn captures_input(&self) -> bool {
    self.confirm.is_active()
  }

  fn tick(&mut self, _now: Instant) -> ViewAction {
    if self.query.poll() {
      // The lookup itself writes to the cache; don't treat that as a change
      self.seen_generation = self.ctx.store.generation();
    }

    let generation = self.ctx.store.generation();
    if generation != self.seen_generation && !self.query.is_loading() {
      self.seen_generation = generation;
      self.query.fetch();
    }

    match self.delete.poll() {
      Some(Ok(())) => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("e", "edit").with_priority(30),
      Shortcut::new("d", "delete").with_priority(31),
      Shortcut::new("r", "refresh").with_priority(60),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::ui::components::input::tests::key;
  use crate::ui::views::tests::context_with;
  use std::time::Duration;

  #[tokio::test]
  async fn test_product_served_from_list_cache() {
    let mut view = ProductDetailView::new(context_with(&[1, 2, 3]), 2);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick(Instant::now());

    let result = view.query.data().unwrap();
    assert_eq!(result.data.title, "Product 2");
    assert_eq!(result.source, CacheSource::CacheFresh);
    assert_eq!(view.breadcrumb_label(), "Product 2");
  }

  #[tokio::test]
  async fn test_own_cache_write_does_not_refetch() {
    let mut view = ProductDetailView::new(context_with(&[1, 2, 3]), 2);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick(Instant::now());
    view.tick(Instant::now());
    assert!(!view.query.is_loading());
  }

  #[tokio::test]
  async fn test_delete_needs_confirmation() {
    let mut view = ProductDetailView::new(context_with(&[5]), 5);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick(Instant::now());

    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.captures_input());
    view.handle_key(key(KeyCode::Esc));
    assert!(!view.captures_input());
    assert!(!view.delete.is_pending());
  }
}
