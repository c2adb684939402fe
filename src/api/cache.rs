//! Caching implementations for catalog types.

use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, QueryKey};

use super::types::{Product, ProductList};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Product {
  fn entity_type() -> &'static str {
    "product"
  }
}

impl Cacheable for ProductList {
  fn entity_type() -> &'static str {
    "product_list"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query identities for catalog API calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductQueryKey {
  /// Every product (`GET /products?limit=0`)
  AllProducts,
  /// A single product by id
  Product { id: u64 },
}

impl QueryKey for ProductQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::AllProducts => "products:all".to_string(),
      Self::Product { id } => format!("product:{}", id),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::AllProducts => "all products".to_string(),
      Self::Product { id } => format!("product {}", id),
    }
  }
}
