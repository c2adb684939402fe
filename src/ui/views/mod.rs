mod product_detail;
mod product_form;
mod product_list;

pub use product_detail::ProductDetailView;
pub use product_form::ProductFormView;
pub use product_list::ProductListView;

use crate::api::store::ProductStore;
use crate::ui::components::Notifier;
use tracing::error;

/// Delete a product and report the outcome as a toast
async fn delete_with_toast(
  store: &ProductStore,
  notifier: &Notifier,
  id: u64,
) -> Result<(), String> {
  match store.delete_product(id).await {
    Ok(_) => {
      notifier.success("Product deleted successfully!");
      Ok(())
    }
    Err(e) => {
      error!(id, error = %e, "delete failed");
      notifier.error("Failed to delete product. Please try again.");
      Err(e.to_string())
    }
  }
}

fn delete_prompt(title: &str) -> String {
  format!(
    "This will permanently delete \"{}\". This action cannot be undone.",
    title
  )
}

#[cfg(test)]
pub(crate) mod tests {
  use crate::api::cache::ProductQueryKey;
  use crate::api::client::CatalogClient;
  use crate::api::store::ProductStore;
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::catalog::pagination::PageSize;
  use crate::catalog::patch::tests::list_of;
  use crate::config::{ApiConfig, CacheConfig};
  use crate::ui::components::Notifier;
  use crate::ui::view::ViewContext;
  use std::time::Duration;

  /// Context whose cache already holds products `ids`. The API points at a
  /// closed local port, so anything that does reach the network fails fast.
  pub(crate) fn context_with(ids: &[u64]) -> ViewContext {
    let config = CacheConfig::default();
    let cache = CacheLayer::new(MemoryStorage::new());
    cache
      .set(&ProductQueryKey::AllProducts, &list_of(ids), config.list_policy())
      .unwrap();

    let api = CatalogClient::new(&ApiConfig {
      url: "http://127.0.0.1:9".to_string(),
      timeout_secs: 2,
    })
    .unwrap();
    let (notifier, _rx) = Notifier::channel();

    ViewContext {
      store: ProductStore::with_api(api, cache, &config),
      notifier,
      search_debounce: Duration::from_millis(500),
      default_page_size: PageSize::default(),
    }
  }
}
