//! Product store: the catalog client behind a read-through cache.
//!
//! Reads go through the cache layer. Mutations call the API and, on success,
//! patch the cached list in place instead of refetching it. A failed call
//! returns before any patch, so the cache is left exactly as it was.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use rand::Rng;
use tracing::{debug, info};

use crate::cache::{CacheLayer, CacheObserver, CachePolicy, CacheResult, MemoryStorage};
use crate::catalog::form::ProductInput;
use crate::catalog::patch;
use crate::config::{CacheConfig, Config};

use super::cache::ProductQueryKey;
use super::client::{CatalogApi, CatalogClient};
use super::types::{PageRequest, Product, ProductList};

/// Catalog client with transparent caching and optimistic mutations.
#[derive(Clone)]
pub struct ProductStore<A: CatalogApi = CatalogClient> {
  api: A,
  cache: CacheLayer<MemoryStorage>,
  list_policy: CachePolicy,
  product_policy: CachePolicy,
}

impl ProductStore<CatalogClient> {
  /// Create a store talking to the configured API with a fresh in-memory cache.
  pub fn new(config: &Config) -> Result<Self> {
    let api = CatalogClient::new(&config.api)?;
    Ok(Self::with_api(
      api,
      CacheLayer::new(MemoryStorage::new()),
      &config.cache,
    ))
  }
}

impl<A: CatalogApi> ProductStore<A> {
  pub fn with_api(api: A, cache: CacheLayer<MemoryStorage>, config: &CacheConfig) -> Self {
    Self {
      api,
      cache,
      list_policy: config.list_policy(),
      product_policy: config.product_policy(),
    }
  }

  /// Changes whenever anything in the cache changes
  pub fn generation(&self) -> u64 {
    self.cache.generation()
  }

  /// Keep the cached list alive while the guard is held
  pub fn observe_products(&self) -> CacheObserver {
    self.cache.observe(&ProductQueryKey::AllProducts)
  }

  /// Keep one product's own entry alive while the guard is held
  pub fn observe_product(&self, id: u64) -> CacheObserver {
    self.cache.observe(&ProductQueryKey::Product { id })
  }

  /// Every product, from cache when fresh.
  pub async fn all_products(&self) -> Result<CacheResult<ProductList>> {
    self
      .cache
      .fetch(&ProductQueryKey::AllProducts, self.list_policy, || {
        let api = self.api.clone();
        async move { Ok(api.list_products(PageRequest::all()).await?) }
      })
      .await
  }

  /// Refetch every product, replacing the cached list.
  ///
  /// On failure the cached list, including any local patches, is kept.
  pub async fn refresh_products(&self) -> Result<CacheResult<ProductList>> {
    let list = self.api.list_products(PageRequest::all()).await?;
    self
      .cache
      .set(&ProductQueryKey::AllProducts, &list, self.list_policy)?;
    Ok(CacheResult::from_network(list))
  }

  /// The cached list as it is now, without touching the network
  pub fn cached_products(&self) -> Result<Option<ProductList>> {
    Ok(
      self
        .cache
        .get::<ProductList>(&ProductQueryKey::AllProducts)?
        .map(|cached| cached.data),
    )
  }

  /// Look up one product.
  ///
  /// The cached list is searched first so that locally added or edited
  /// products are found without a request; then the single-product entry;
  /// then the network.
  pub async fn product(&self, id: u64) -> Result<CacheResult<Product>> {
    let key = ProductQueryKey::Product { id };

    if let Some(cached) = self
      .cache
      .get::<ProductList>(&ProductQueryKey::AllProducts)?
    {
      if let Some(product) = cached.data.products.into_iter().find(|p| p.id == id) {
        debug!(id, "product found in list cache");
        self.cache.set(&key, &product, self.product_policy)?;
        return Ok(CacheResult::from_cache(product, cached.cached_at));
      }
    }

    self
      .cache
      .fetch(&key, self.product_policy, || {
        let api = self.api.clone();
        async move { Ok(api.get_product(id).await?) }
      })
      .await
  }

  /// Create a product and append it to the cached list.
  ///
  /// The API does not hand back a usable id, so the product gets
  /// `total + 1`. Stock, discount and images are filled in locally.
  pub async fn add_product(&self, input: ProductInput) -> Result<Product> {
    let created = self.api.add_product(&input).await?;

    let mut product = {
      let mut rng = rand::thread_rng();
      Product {
        stock: rng.gen_range(1..=100),
        discount_percentage: f64::from(rng.gen_range(0u8..20)),
        images: vec![input.thumbnail.clone()],
        ..created
      }
    };

    let assigned = self
      .cache
      .patch(&ProductQueryKey::AllProducts, |list: &mut ProductList| {
        patch::add_product(list, product.clone())
      })?;
    if let Some(id) = assigned {
      product.id = id;
    }

    info!(id = product.id, title = %product.title, "product added");
    Ok(product)
  }

  /// Update a product and replace it in the cached list.
  ///
  /// If the list does not hold the product, the cache is left alone.
  pub async fn update_product(&self, id: u64, input: ProductInput) -> Result<Product> {
    let updated = self.api.update_product(id, &input).await?;

    let replaced = self
      .cache
      .patch(&ProductQueryKey::AllProducts, |list: &mut ProductList| {
        patch::update_product(list, &updated)
      })?
      .unwrap_or(false);

    if replaced {
      self.cache.set(
        &ProductQueryKey::Product { id: updated.id },
        &updated,
        self.product_policy,
      )?;
    }

    info!(id, replaced, "product updated");
    Ok(updated)
  }

  /// Delete a product, drop it from the cached list and forget its own entry.
  ///
  /// Returns whether the cached list contained it.
  pub async fn delete_product(&self, id: u64) -> Result<bool> {
    let deleted = self.api.delete_product(id).await?;

    let removed = self
      .cache
      .patch(&ProductQueryKey::AllProducts, |list: &mut ProductList| {
        patch::delete_product(list, id)
      })?
      .unwrap_or(false);
    self.cache.invalidate(&ProductQueryKey::Product { id })?;

    info!(id, removed, remote_deleted = deleted.is_deleted, "product deleted");
    Ok(removed)
  }

  /// Evict cache entries past their gc window that no view observes
  pub fn collect_garbage(&self) -> Result<usize> {
    self.collect_garbage_at(Utc::now())
  }

  pub fn collect_garbage_at(&self, now: DateTime<Utc>) -> Result<usize> {
    self.cache.collect_garbage_at(now)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::{ApiError, ApiResult};
  use crate::api::types::DeletedProduct;
  use crate::cache::CacheSource;
  use crate::catalog::patch::tests::{list_of, product};
  use reqwest::StatusCode;
  use std::sync::{Arc, Mutex};

  #[derive(Default)]
  struct FakeState {
    list: Option<ProductList>,
    fail: bool,
    list_calls: usize,
    get_calls: usize,
  }

  /// In-memory stand-in for the remote API
  #[derive(Clone, Default)]
  struct FakeApi {
    state: Arc<Mutex<FakeState>>,
  }

  impl FakeApi {
    fn with_list(list: ProductList) -> Self {
      let api = Self::default();
      api.state.lock().unwrap().list = Some(list);
      api
    }

    fn set_failing(&self, fail: bool) {
      self.state.lock().unwrap().fail = fail;
    }

    fn list_calls(&self) -> usize {
      self.state.lock().unwrap().list_calls
    }

    fn get_calls(&self) -> usize {
      self.state.lock().unwrap().get_calls
    }
  }

  fn server_error(context: &'static str) -> ApiError {
    ApiError::Status {
      context,
      status: StatusCode::INTERNAL_SERVER_ERROR,
      body: String::new(),
    }
  }

  fn from_input(id: u64, input: &ProductInput) -> Product {
    Product {
      id,
      title: input.title.clone(),
      description: input.description.clone(),
      price: input.price,
      rating: input.rating,
      brand: input.brand.clone(),
      category: input.category.clone(),
      thumbnail: input.thumbnail.clone(),
      stock: 0,
      discount_percentage: 0.0,
      images: Vec::new(),
    }
  }

  impl CatalogApi for FakeApi {
    async fn list_products(&self, _page: PageRequest) -> ApiResult<ProductList> {
      let mut state = self.state.lock().unwrap();
      state.list_calls += 1;
      if state.fail {
        return Err(server_error("Failed to fetch products"));
      }
      Ok(state.list.clone().unwrap_or_else(|| list_of(&[])))
    }

    async fn get_product(&self, id: u64) -> ApiResult<Product> {
      let mut state = self.state.lock().unwrap();
      state.get_calls += 1;
      if state.fail {
        return Err(server_error("Failed to fetch product"));
      }
      Ok(product(id, "Remote"))
    }

    async fn add_product(&self, input: &ProductInput) -> ApiResult<Product> {
      if self.state.lock().unwrap().fail {
        return Err(server_error("Failed to add product"));
      }
      Ok(from_input(195, input))
    }

    async fn update_product(&self, id: u64, input: &ProductInput) -> ApiResult<Product> {
      if self.state.lock().unwrap().fail {
        return Err(server_error("Failed to update product"));
      }
      Ok(from_input(id, input))
    }

    async fn delete_product(&self, id: u64) -> ApiResult<DeletedProduct> {
      if self.state.lock().unwrap().fail {
        return Err(server_error("Failed to delete product"));
      }
      Ok(DeletedProduct {
        id,
        is_deleted: true,
      })
    }
  }

  fn store(api: FakeApi) -> ProductStore<FakeApi> {
    ProductStore::with_api(
      api,
      CacheLayer::new(MemoryStorage::new()),
      &CacheConfig::default(),
    )
  }

  fn input(title: &str) -> ProductInput {
    ProductInput {
      title: title.to_string(),
      price: 12.5,
      brand: "Acme".to_string(),
      rating: 4.0,
      thumbnail: "https://cdn.example.com/new.png".to_string(),
      description: "Freshly added product".to_string(),
      category: "laptops".to_string(),
    }
  }

  #[tokio::test]
  async fn test_all_products_is_cached() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api.clone());

    let first = store.all_products().await.unwrap();
    assert_eq!(first.source, CacheSource::Network);
    let second = store.all_products().await.unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data.products.len(), 3);
    assert_eq!(api.list_calls(), 1);
  }

  #[tokio::test]
  async fn test_refresh_failure_keeps_cached_list() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api.clone());
    store.all_products().await.unwrap();
    store.delete_product(2).await.unwrap();

    api.set_failing(true);
    assert!(store.refresh_products().await.is_err());
    assert_eq!(store.cached_products().unwrap().unwrap().total, 2);
  }

  #[tokio::test]
  async fn test_delete_from_cached_list() {
    let api = FakeApi::with_list(list_of(&[10, 20, 42, 30, 40]));
    let store = store(api);
    store.all_products().await.unwrap();

    assert!(store.delete_product(42).await.unwrap());
    let list = store.cached_products().unwrap().unwrap();
    assert_eq!(list.products.len(), 4);
    assert_eq!(list.total, 4);
  }

  #[tokio::test]
  async fn test_delete_drops_single_product_entry() {
    let api = FakeApi::default();
    let store = store(api.clone());

    // Not in any list, so this comes from the network and gets its own entry
    store.product(7).await.unwrap();
    assert_eq!(api.get_calls(), 1);
    store.product(7).await.unwrap();
    assert_eq!(api.get_calls(), 1);

    assert!(!store.delete_product(7).await.unwrap());
    store.product(7).await.unwrap();
    assert_eq!(api.get_calls(), 2);
  }

  #[tokio::test]
  async fn test_add_appends_with_sequential_id() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api);
    store.all_products().await.unwrap();

    let added = store.add_product(input("Widget")).await.unwrap();
    assert_eq!(added.id, 4);
    assert!((1..=100).contains(&added.stock));
    assert!(added.discount_percentage < 20.0);
    assert_eq!(added.images, vec!["https://cdn.example.com/new.png".to_string()]);

    let list = store.cached_products().unwrap().unwrap();
    assert_eq!(list.total, 4);
    assert_eq!(list.products.last().unwrap().title, "Widget");
    assert_eq!(list.products.last().unwrap().id, 4);
  }

  #[tokio::test]
  async fn test_observed_list_survives_gc_and_takes_patches() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3, 4, 5]));
    let store = store(api);
    let _observer = store.observe_products();
    store.all_products().await.unwrap();

    let later = chrono::Utc::now() + chrono::Duration::minutes(11);
    assert_eq!(store.collect_garbage_at(later).unwrap(), 0);

    assert!(store.delete_product(3).await.unwrap());
    let added = store.add_product(input("Widget")).await.unwrap();
    assert_eq!(added.id, 5);

    let list = store.cached_products().unwrap().unwrap();
    assert_eq!(list.total, 5);
    assert!(list.products.iter().all(|p| p.id != 3));
    assert_eq!(list.products.last().unwrap().title, "Widget");
  }

  #[tokio::test]
  async fn test_unobserved_list_is_collected() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api);
    let observer = store.observe_products();
    store.all_products().await.unwrap();
    drop(observer);

    let later = chrono::Utc::now() + chrono::Duration::minutes(11);
    assert_eq!(store.collect_garbage_at(later).unwrap(), 1);
    assert!(store.cached_products().unwrap().is_none());
  }

  #[tokio::test]
  async fn test_add_without_cached_list_keeps_remote_id() {
    let store = store(FakeApi::default());
    let added = store.add_product(input("Widget")).await.unwrap();
    assert_eq!(added.id, 195);
    assert!(store.cached_products().unwrap().is_none());
  }

  #[tokio::test]
  async fn test_update_replaces_cached_product() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api.clone());
    store.all_products().await.unwrap();

    store.update_product(2, input("Renamed")).await.unwrap();
    let list = store.cached_products().unwrap().unwrap();
    assert_eq!(list.products[1].title, "Renamed");

    let single = store.product(2).await.unwrap();
    assert_eq!(single.data.title, "Renamed");
    assert_eq!(api.get_calls(), 0);
  }

  #[tokio::test]
  async fn test_update_of_uncached_product_leaves_cache() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api);
    store.all_products().await.unwrap();
    let before = store.cached_products().unwrap();

    store.update_product(99, input("Ghost")).await.unwrap();
    assert_eq!(store.cached_products().unwrap(), before);
  }

  #[tokio::test]
  async fn test_failed_mutations_leave_cache_untouched() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api.clone());
    store.all_products().await.unwrap();
    let before = store.cached_products().unwrap();
    let generation = store.generation();

    api.set_failing(true);
    assert!(store.add_product(input("Widget")).await.is_err());
    assert!(store.update_product(1, input("Renamed")).await.is_err());
    assert!(store.delete_product(1).await.is_err());

    assert_eq!(store.cached_products().unwrap(), before);
    assert_eq!(store.generation(), generation);
  }

  #[tokio::test]
  async fn test_product_prefers_list_cache() {
    let api = FakeApi::with_list(list_of(&[1, 2, 3]));
    let store = store(api.clone());
    store.all_products().await.unwrap();
    let added = store.add_product(input("Local only")).await.unwrap();

    let found = store.product(added.id).await.unwrap();
    assert_eq!(found.data.title, "Local only");
    assert_eq!(found.source, CacheSource::CacheFresh);
    assert_eq!(api.get_calls(), 0);
  }

  #[tokio::test]
  async fn test_product_network_failure_without_cache_errors() {
    let api = FakeApi::default();
    api.set_failing(true);
    let store = store(api);
    assert!(store.product(5).await.is_err());
  }
}
