//! Network seam used by the fetch executor.

use std::future::Future;
use std::time::Duration;

use tracing::trace;
use url::Url;

use crate::error::Result;

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Issues GET requests for the executor.
///
/// Implementations return `Ok` for any response that arrived, including
/// non-2xx ones, and `Err(Error::Transport)` when no response was obtained.
pub trait Transport: Send + Sync + 'static {
  fn get(&self, url: Url) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  /// Build a client; `timeout` bounds each whole request when set.
  pub fn new(timeout: Option<Duration>) -> Result<Self> {
    let mut builder =
      reqwest::Client::builder().user_agent(concat!("skyintel/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    Ok(Self {
      client: builder.build()?,
    })
  }
}

impl Transport for HttpTransport {
  async fn get(&self, url: Url) -> Result<RawResponse> {
    trace!(%url, "GET");
    let response = self
      .client
      .get(url)
      .header(reqwest::header::ACCEPT, "application/json")
      .send()
      .await?;

    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();

    Ok(RawResponse { status, body })
  }
}
