use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{DeletedProduct, PageRequest, Product, ProductList};
use crate::catalog::form::ProductInput;
use crate::config::ApiConfig;
use color_eyre::{eyre::eyre, Result};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Operations the catalog API offers.
///
/// `ProductStore` is written against this trait so it can be driven by an
/// in-memory fake in tests.
pub trait CatalogApi: Clone + Send + Sync + 'static {
  /// `GET /products?limit&skip`
  fn list_products(&self, page: PageRequest) -> impl Future<Output = ApiResult<ProductList>> + Send;

  /// `GET /products/{id}`
  fn get_product(&self, id: u64) -> impl Future<Output = ApiResult<Product>> + Send;

  /// `POST /products/add`
  fn add_product(&self, input: &ProductInput) -> impl Future<Output = ApiResult<Product>> + Send;

  /// `PUT /products/{id}`
  fn update_product(
    &self,
    id: u64,
    input: &ProductInput,
  ) -> impl Future<Output = ApiResult<Product>> + Send;

  /// `DELETE /products/{id}`
  fn delete_product(&self, id: u64) -> impl Future<Output = ApiResult<DeletedProduct>> + Send;
}

/// HTTP client for the catalog API
#[derive(Debug, Clone)]
pub struct CatalogClient {
  client: reqwest::Client,
  base_url: Url,
}

impl CatalogClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url =
      Url::parse(&config.url).map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid API url {}: not a base url", config.url));
    }

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("p9s/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  /// Build an endpoint url by appending path segments to the base url
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn products_url(&self, page: PageRequest) -> Url {
    let mut url = self.endpoint(&["products"]);
    url
      .query_pairs_mut()
      .append_pair("limit", &page.limit.to_string())
      .append_pair("skip", &page.skip.to_string());
    url
  }

  fn product_url(&self, id: u64) -> Url {
    self.endpoint(&["products", &id.to_string()])
  }

  /// Send a request and decode the JSON body, mapping non-2xx to `ApiError::Status`
  async fn send<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    context: &'static str,
  ) -> ApiResult<T> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      debug!(%status, %body, "{}", context);
      return Err(ApiError::Status {
        context,
        status,
        body,
      });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
  }
}

impl CatalogApi for CatalogClient {
  async fn list_products(&self, page: PageRequest) -> ApiResult<ProductList> {
    let url = self.products_url(page);
    debug!(%url, "GET products");
    self
      .send(self.client.get(url), "Failed to fetch products")
      .await
  }

  async fn get_product(&self, id: u64) -> ApiResult<Product> {
    let url = self.product_url(id);
    debug!(%url, "GET product");
    self
      .send(self.client.get(url), "Failed to fetch product")
      .await
  }

  async fn add_product(&self, input: &ProductInput) -> ApiResult<Product> {
    let url = self.endpoint(&["products", "add"]);
    debug!(%url, title = %input.title, "POST product");
    self
      .send(self.client.post(url).json(input), "Failed to add product")
      .await
  }

  async fn update_product(&self, id: u64, input: &ProductInput) -> ApiResult<Product> {
    let url = self.product_url(id);
    debug!(%url, "PUT product");
    self
      .send(self.client.put(url).json(input), "Failed to update product")
      .await
  }

  async fn delete_product(&self, id: u64) -> ApiResult<DeletedProduct> {
    let url = self.product_url(id);
    debug!(%url, "DELETE product");
    self
      .send(self.client.delete(url), "Failed to delete product")
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(url: &str) -> CatalogClient {
    CatalogClient::new(&ApiConfig {
      url: url.to_string(),
      timeout_secs: 5,
    })
    .unwrap()
  }

  #[test]
  fn test_products_url_all() {
    let c = client("https://dummyjson.com");
    assert_eq!(
      c.products_url(PageRequest::all()).as_str(),
      "https://dummyjson.com/products?limit=0&skip=0"
    );
  }

  #[test]
  fn test_products_url_window() {
    let c = client("https://dummyjson.com/");
    assert_eq!(
      c.products_url(PageRequest { limit: 10, skip: 20 }).as_str(),
      "https://dummyjson.com/products?limit=10&skip=20"
    );
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let c = client("http://localhost:8080/api/");
    assert_eq!(
      c.product_url(42).as_str(),
      "http://localhost:8080/api/products/42"
    );
    assert_eq!(
      c.endpoint(&["products", "add"]).as_str(),
      "http://localhost:8080/api/products/add"
    );
  }

  #[test]
  fn test_rejects_invalid_url() {
    let result = CatalogClient::new(&ApiConfig {
      url: "not a url".to_string(),
      timeout_secs: 5,
    });
    assert!(result.is_err());

    let result = CatalogClient::new(&ApiConfig {
      url: "mailto:shop@example.com".to_string(),
      timeout_secs: 5,
    });
    assert!(result.is_err());
  }
}
