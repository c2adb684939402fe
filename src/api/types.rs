//! Serde types matching the catalog API's JSON shapes.
//!
//! The remote API speaks camelCase; these types are also what the cache stores,
//! so they round-trip through `serde_json` without loss.

use serde::{Deserialize, Serialize};

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  /// Remote-assigned id. The add endpoint may omit it, in which case the
  /// client assigns one when patching the cached list.
  #[serde(default)]
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub price: f64,
  #[serde(default)]
  pub rating: f64,
  #[serde(default)]
  pub brand: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub thumbnail: String,
  #[serde(default)]
  pub stock: u32,
  #[serde(default)]
  pub discount_percentage: f64,
  #[serde(default)]
  pub images: Vec<String>,
}

/// A list of products plus the remote's total count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
  #[serde(default)]
  pub products: Vec<Product>,
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub skip: u64,
  #[serde(default)]
  pub limit: u64,
}

/// Response of `DELETE /products/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedProduct {
  pub id: u64,
  #[serde(default)]
  pub is_deleted: bool,
}

/// `limit`/`skip` window for `GET /products`. A limit of zero asks for everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub limit: u64,
  pub skip: u64,
}

impl PageRequest {
  pub const fn all() -> Self {
    Self { limit: 0, skip: 0 }
  }
}
