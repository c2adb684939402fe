use crate::api::types::Product;
use crate::catalog::form::{cycle_category, Field, FieldErrors, ProductDraft, ProductInput};
use crate::query::Mutation;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{Shortcut, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::time::Instant;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormMode {
  Add,
  Edit { id: u64 },
}

/// Add or edit a product. Fields are validated before anything is sent.
pub struct ProductFormView {
  mode: FormMode,
  draft: ProductDraft,
  field: Field,
  input: TextInput,
  errors: FieldErrors,
  submit: Mutation<ProductInput, Product>,
  submit_error: Option<String>,
}

impl ProductFormView {
  pub fn add(ctx: ViewContext) -> Self {
    let submit = Mutation::new(move |input: ProductInput| {
      let store = ctx.store.clone();
      let notifier = ctx.notifier.clone();
      async move {
        match store.add_product(input).await {
          Ok(product) => {
            notifier.success(format!(
              "Product added successfully with ID {}! It appears at the end of the list.",
              product.id
            ));
            Ok(product)
          }
          Err(e) => {
            error!(error = %e, "add failed");
            notifier.error("Failed to add product. Please try again.");
            Err(e.to_string())
          }
        }
      }
    });
    Self::with_draft(FormMode::Add, ProductDraft::default(), submit)
  }

  pub fn edit(ctx: ViewContext, product: &Product) -> Self {
    let id = product.id;
    let submit = Mutation::new(move |input: ProductInput| {
      let store = ctx.store.clone();
      let notifier = ctx.notifier.clone();
      async move {
        match store.update_product(id, input).await {
          Ok(product) => {
            notifier.success("Product updated successfully!");
            Ok(product)
          }
          Err(e) => {
            error!(id, error = %e, "update failed");
            notifier.error("Failed to update product. Please try again.");
            Err(e.to_string())
          }
        }
      }
    });
    Self::with_draft(
      FormMode::Edit { id },
      ProductDraft::from_product(product),
      submit,
    )
  }

  fn with_draft(
    mode: FormMode,
    draft: ProductDraft,
    submit: Mutation<ProductInput, Product>,
  ) -> Self {
    let field = Field::Title;
    Self {
      mode,
      input: TextInput::with_value(draft.value(field)),
      draft,
      field,
      errors: FieldErrors::default(),
      submit,
      submit_error: None,
    }
  }

  fn focus(&mut self, field: Field) {
    self.field = field;
    self.input = TextInput::with_value(self.draft.value(field));
  }

  fn cycle_category(&mut self, forward: bool) {
    let next = cycle_category(&self.draft.category, forward);
    self.draft.set(Field::Category, next);
    self.input.set_value(next);
  }

  fn submit(&mut self) {
    match self.draft.parse() {
      Ok(input) => {
        self.errors = FieldErrors::default();
        self.submit_error = None;
        self.submit.mutate(input);
      }
      Err(errors) => {
        if let Some(first) = Field::ALL.into_iter().find(|f| errors.get(*f).is_some()) {
          self.focus(first);
        }
        self.errors = errors;
      }
    }
  }

  fn title(&self) -> String {
    let base = match self.mode {
      FormMode::Add => " Add product ".to_string(),
      FormMode::Edit { id } => format!(" Edit product #{} ", id),
    };
    if self.submit.is_pending() {
      format!("{}(saving...) ", base)
    } else {
      base
    }
  }

  fn error_summary(&self) -> Option<String> {
    match self.errors.len() {
      0 => None,
      1 => Some("1 field needs attention".to_string()),
      n => Some(format!("{} fields need attention", n)),
    }
  }

  fn field_lines(&self, field: Field) -> Vec<Line<'_>> {
    let focused = field == self.field;
    let label_style = if focused {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let value = if focused {
      self.input.value()
    } else {
      self.draft.value(field)
    };

    let value_line = if field == Field::Category {
      let shown = if value.is_empty() { "Select a category" } else { value };
      Line::from(vec![
        Span::styled("  < ", Style::default().fg(Color::DarkGray)),
        Span::styled(shown, Style::default().fg(Color::Cyan)),
        Span::styled(" >", Style::default().fg(Color::DarkGray)),
      ])
    } else if focused {
      let (before, after) = split_at_char(value, self.input.cursor_position());
      Line::from(vec![
        Span::raw("  "),
        Span::raw(before),
        Span::styled("_", Style::default().fg(Color::Yellow)),
        Span::raw(after),
      ])
    } else {
      Line::from(vec![Span::raw("  "), Span::raw(value)])
    };

    let mut lines = vec![Line::from(Span::styled(field.label(), label_style)), value_line];
    if let Some(message) = self.errors.get(field) {
      lines.push(Line::from(Span::styled(
        format!("  {}", message),
        Style::default().fg(Color::Red),
      )));
    }
    lines
  }
}

fn split_at_char(s: &str, index: usize) -> (&str, &str) {
  let at = s.char_indices().nth(index).map(|(i, _)| i).unwrap_or(s.len());
  s.split_at(at)
}

impl View for ProductFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.submit.is_pending() {
      return ViewAction::None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Enter => self.submit(),
      KeyCode::Char('s') if ctrl => self.submit(),
      KeyCode::Tab | KeyCode::Down => self.focus(self.field.next()),
      KeyCode::BackTab | KeyCode::Up => self.focus(self.field.prev()),
      KeyCode::Left if self.field == Field::Category => self.cycle_category(false),
      KeyCode::Right | KeyCode::Char(' ') if self.field == Field::Category => {
        self.cycle_category(true)
      }
      _ if self.field == Field::Category => {}
      _ => {
        if self.input.handle_key(key) == InputResult::Consumed {
          self.draft.set(self.field, self.input.value());
        }
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 72.min(area.width);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let form_area = Rect::new(x, area.y, width, area.height);

    frame.render_widget(Clear, form_area);
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let mut lines = Vec::new();
    let mut focused_line = 0;
    for field in Field::ALL {
      if field == self.field {
        focused_line = lines.len();
      }
      lines.extend(self.field_lines(field));
      lines.push(Line::from(""));
    }

    if let Some(summary) = self.error_summary() {
      lines.push(Line::from(Span::styled(summary, Style::default().fg(Color::Red))));
    }
    if let Some(error) = &self.submit_error {
      lines.push(Line::from(Span::styled(
        format!("Save failed: {}", error),
        Style::default().fg(Color::Red).bold(),
      )));
    }
    lines.push(Line::from(Span::styled(
      "Tab/Shift-Tab: field   ←/→: category   Enter: save   Esc: cancel",
      Style::default().fg(Color::DarkGray),
    )));

    // Keep the focused field and its error on screen
    let scroll = (focused_line + 3).saturating_sub(inner.height as usize) as u16;
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
  }

  fn breadcrumb_label(&self) -> String {
    match self.mode {
      FormMode::Add => "Add".to_string(),
      FormMode::Edit { id } => format!("Edit #{}", id),
    }
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn tick(&mut self, _now: Instant) -> ViewAction {
    match self.submit.poll() {
      Some(Ok(_)) => ViewAction::Pop,
      Some(Err(e)) => {
        self.submit_error = Some(e);
        ViewAction::None
      }
      None => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("tab", "next field").with_priority(10),
      Shortcut::new("enter", "save").with_priority(20),
      Shortcut::new("esc", "cancel").with_priority(90),
    ]
  }
}
