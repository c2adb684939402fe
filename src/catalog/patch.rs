//! Optimistic patches applied to the cached product list after a mutation
//! succeeds remotely. The list is never refetched, so these functions are the
//! only thing keeping `total` and `products.len()` in step.

use crate::api::types::{Product, ProductList};

/// Append a newly created product, assigning it the next sequential id.
///
/// Returns the id that was assigned.
pub fn add_product(list: &mut ProductList, mut product: Product) -> u64 {
  let id = list.total + 1;
  product.id = id;
  list.products.push(product);
  list.total += 1;
  id
}

/// Replace the product with the same id in place.
///
/// Returns `false` and leaves the list untouched if the id is not cached.
pub fn update_product(list: &mut ProductList, product: &Product) -> bool {
  match list.products.iter_mut().find(|p| p.id == product.id) {
    Some(slot) => {
      *slot = product.clone();
      true
    }
    None => false,
  }
}

/// Remove every product with `id`.
///
/// `total` drops by one only when something was removed, so deleting the same
/// id twice cannot double-decrement.
pub fn delete_product(list: &mut ProductList, id: u64) -> bool {
  let before = list.products.len();
  list.products.retain(|p| p.id != id);
  let removed = list.products.len() < before;
  if removed {
    list.total = list.total.saturating_sub(1);
  }
  removed
}
