use thiserror::Error;

/// Errors produced by the query layer.
///
/// Network-facing variants never escape a fetch; the executor folds them into
/// an [`ErrorInfo`](crate::query::ErrorInfo) on the cache entry instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown data source: {0:?}")]
  InvalidSource(String),
  /// Connection refused, DNS failure, timeout, or a body that could not be read.
  #[error("network error: {0}")]
  Transport(String),
  #[error("HTTP {status}: {message}")]
  HttpStatus { status: u16, message: String },
  #[error("response parsing error: {0}")]
  Parse(String),
  #[error("invalid configuration: {0}")]
  Config(String),
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    Error::Transport(err.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self {
    Error::Parse(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
