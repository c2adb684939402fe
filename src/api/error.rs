//! Catalog API error types

use reqwest::StatusCode;
use thiserror::Error;

/// Errors from talking to the catalog API
#[derive(Debug, Error)]
pub enum ApiError {
  /// Request could not be sent or the body could not be read
  #[error("HTTP error: {0}")]
  Transport(#[from] reqwest::Error),

  /// Server answered with a non-2xx status
  #[error("{context} ({status})")]
  Status {
    context: &'static str,
    status: StatusCode,
    body: String,
  },

  /// Body was not the JSON we expected
  #[error("Invalid response: {0}")]
  Decode(#[from] serde_json::Error),
}

/// Result type for catalog API calls
pub type ApiResult<T> = Result<T, ApiError>;
