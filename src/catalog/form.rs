//! Product form input and its validation schema.
//!
//! The form edits a `ProductDraft` (raw text per field). Submitting parses it
//! into a `ProductInput` and runs the `validator` schema; any failure yields
//! per-field messages and the request is never sent.

use crate::api::types::Product;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

/// Categories offered by the form's picker. Products loaded from the API may
/// carry others, which stay valid.
pub const CATEGORIES: &[&str] = &[
  "smartphones",
  "laptops",
  "fragrances",
  "skincare",
  "groceries",
  "home-decoration",
  "furniture",
  "tops",
  "womens-dresses",
  "womens-shoes",
  "mens-shirts",
  "mens-shoes",
  "mens-watches",
  "womens-watches",
  "womens-bags",
  "womens-jewellery",
  "sunglasses",
  "automotive",
  "motorcycle",
  "lighting",
];

/// Editable product fields, as sent to `POST /products/add` and `PUT /products/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct ProductInput {
  #[validate(length(min = 1, max = 100, message = "Title is required (max 100 characters)"))]
  pub title: String,
  #[validate(range(min = 0.01, message = "Price must be greater than 0"))]
  pub price: f64,
  #[validate(length(min = 1, max = 50, message = "Brand is required (max 50 characters)"))]
  pub brand: String,
  #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
  pub rating: f64,
  #[validate(url(message = "Must be a valid URL"))]
  pub thumbnail: String,
  #[validate(length(min = 10, max = 500, message = "Description must be 10 to 500 characters"))]
  pub description: String,
  #[validate(custom(function = "validate_category"))]
  pub category: String,
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
  if category.trim().is_empty() {
    return Err(ValidationError::new("required").with_message(Cow::Borrowed("Category is required")));
  }
  Ok(())
}

/// Form fields in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
  Title,
  Price,
  Brand,
  Rating,
  Thumbnail,
  Description,
  Category,
}

impl Field {
  pub const ALL: [Field; 7] = [
    Field::Title,
    Field::Price,
    Field::Brand,
    Field::Rating,
    Field::Thumbnail,
    Field::Description,
    Field::Category,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Field::Title => "Title",
      Field::Price => "Price",
      Field::Brand => "Brand",
      Field::Rating => "Rating",
      Field::Thumbnail => "Thumbnail URL",
      Field::Description => "Description",
      Field::Category => "Category",
    }
  }

  /// Struct field name used by the validation schema
  fn name(&self) -> &'static str {
    match self {
      Field::Title => "title",
      Field::Price => "price",
      Field::Brand => "brand",
      Field::Rating => "rating",
      Field::Thumbnail => "thumbnail",
      Field::Description => "description",
      Field::Category => "category",
    }
  }

  fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|f| f.name() == name)
  }

  pub fn next(self) -> Self {
    let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(i + 1) % Self::ALL.len()]
  }

  pub fn prev(self) -> Self {
    let len = Self::ALL.len();
    let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(i + len - 1) % len]
  }
}

/// Field-level validation messages, at most one per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
  pub fn get(&self, field: Field) -> Option<&str> {
    self.0.get(&field).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Record a message unless the field already has one
  fn insert(&mut self, field: Field, message: impl Into<String>) {
    self.0.entry(field).or_insert_with(|| message.into());
  }

  fn extend_from(&mut self, errors: &ValidationErrors) {
    for (name, field_errors) in errors.field_errors() {
      let Some(field) = Field::from_name(&name) else {
        continue;
      };
      if let Some(error) = field_errors.first() {
        let message = error
          .message
          .as_ref()
          .map(|m| m.to_string())
          .unwrap_or_else(|| format!("{} is invalid", field.label()));
        self.insert(field, message);
      }
    }
  }
}

/// Raw text of each form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
  pub title: String,
  pub price: String,
  pub brand: String,
  pub rating: String,
  pub thumbnail: String,
  pub description: String,
  pub category: String,
}

impl Default for ProductDraft {
  fn default() -> Self {
    Self {
      title: String::new(),
      price: "0".to_string(),
      brand: String::new(),
      rating: "0".to_string(),
      thumbnail: String::new(),
      description: String::new(),
      category: String::new(),
    }
  }
}

impl ProductDraft {
  /// Pre-fill the form with an existing product
  pub fn from_product(product: &Product) -> Self {
    Self {
      title: product.title.clone(),
      price: product.price.to_string(),
      brand: product.brand.clone(),
      rating: product.rating.to_string(),
      thumbnail: product.thumbnail.clone(),
      description: product.description.clone(),
      category: product.category.clone(),
    }
  }

  pub fn value(&self, field: Field) -> &str {
    match field {
      Field::Title => &self.title,
      Field::Price => &self.price,
      Field::Brand => &self.brand,
      Field::Rating => &self.rating,
      Field::Thumbnail => &self.thumbnail,
      Field::Description => &self.description,
      Field::Category => &self.category,
    }
  }

  pub fn set(&mut self, field: Field, value: impl Into<String>) {
    let value = value.into();
    match field {
      Field::Title => self.title = value,
      Field::Price => self.price = value,
      Field::Brand => self.brand = value,
      Field::Rating => self.rating = value,
      Field::Thumbnail => self.thumbnail = value,
      Field::Description => self.description = value,
      Field::Category => self.category = value,
    }
  }

  /// Parse and validate. Every failing field is reported, not just the first.
  pub fn parse(&self) -> Result<ProductInput, FieldErrors> {
    let mut errors = FieldErrors::default();

    let price = parse_number(&self.price).unwrap_or_else(|| {
      errors.insert(Field::Price, "Price must be a number");
      0.0
    });
    let rating = parse_number(&self.rating).unwrap_or_else(|| {
      errors.insert(Field::Rating, "Rating must be a number");
      0.0
    });

    let input = ProductInput {
      title: self.title.trim().to_string(),
      price,
      brand: self.brand.trim().to_string(),
      rating,
      thumbnail: self.thumbnail.trim().to_string(),
      description: self.description.trim().to_string(),
      category: self.category.clone(),
    };

    if let Err(validation) = input.validate() {
      errors.extend_from(&validation);
    }

    if errors.is_empty() {
      Ok(input)
    } else {
      Err(errors)
    }
  }
}

fn parse_number(value: &str) -> Option<f64> {
  value
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|n| n.is_finite())
}

/// Step through `CATEGORIES` from `current`; an unknown value starts at the ends
pub fn cycle_category(current: &str, forward: bool) -> &'static str {
  let len = CATEGORIES.len();
  match CATEGORIES.iter().position(|c| *c == current) {
    Some(i) if forward => CATEGORIES[(i + 1) % len],
    Some(i) => CATEGORIES[(i + len - 1) % len],
    None if forward => CATEGORIES[0],
    None => CATEGORIES[len - 1],
  }
}
