//! Entry point that wires registry, store and executor together.

use crate::cache::{CacheStore, FetchExecutor, HttpTransport, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::query::{OverviewAggregator, QueryOptions, SourceQuery};
use crate::source::{EndpointRegistry, SourceId};

/// Hands out query controllers that share one cache and one executor.
///
/// Cheap to clone; clones share the same cache.
pub struct QueryClient<T> {
  executor: FetchExecutor<T>,
  options: QueryOptions,
}

impl<T> Clone for QueryClient<T> {
  fn clone(&self) -> Self {
    Self {
      executor: self.executor.clone(),
      options: self.options,
    }
  }
}

impl QueryClient<HttpTransport> {
  /// Build an HTTP-backed client from configuration.
  pub fn from_config(config: &Config) -> Result<Self> {
    let registry = EndpointRegistry::new(&config.api.base_url)?;
    let transport = HttpTransport::new(config.timeout())?;
    let store = CacheStore::new(config.query.max_entries);
    let options = QueryOptions {
      stale_time: config.stale_time(),
      refetch_interval: config.refetch_interval(),
    };
    Ok(Self::new(transport, registry, store, options))
  }
}

impl<T: Transport> QueryClient<T> {
  pub fn new(
    transport: T,
    registry: EndpointRegistry,
    store: CacheStore,
    options: QueryOptions,
  ) -> Self {
    Self {
      executor: FetchExecutor::new(transport, registry, store),
      options,
    }
  }

  pub fn facebook(&self) -> SourceQuery<T> {
    self.source(SourceId::Facebook)
  }

  pub fn instagram(&self) -> SourceQuery<T> {
    self.source(SourceId::Instagram)
  }

  pub fn ads(&self) -> SourceQuery<T> {
    self.source(SourceId::Ads)
  }

  pub fn analytics(&self) -> SourceQuery<T> {
    self.source(SourceId::Analytics)
  }

  pub fn overview(&self) -> OverviewAggregator<T> {
    OverviewAggregator::new(self.executor.clone(), self.options)
  }

  /// Controller for any source, `overall` included.
  pub fn source(&self, source: SourceId) -> SourceQuery<T> {
    SourceQuery::new(source, self.executor.clone(), self.options)
  }

  pub fn options(&self) -> QueryOptions {
    self.options
  }

  pub fn store(&self) -> &CacheStore {
    self.executor.store()
  }

  pub fn executor(&self) -> &FetchExecutor<T> {
    &self.executor
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::MockTransport;
  use std::time::Duration;

  fn client(transport: &MockTransport) -> QueryClient<MockTransport> {
    QueryClient::new(
      transport.clone(),
      EndpointRegistry::new("http://backend.test").unwrap(),
      CacheStore::default(),
      QueryOptions::default(),
    )
  }

  #[test]
  fn test_from_config() {
    let config = Config::from_yaml(
      "api:\n  base_url: http://localhost:9000/\nquery:\n  stale_time_secs: 30\n",
    )
    .unwrap();
    let client = QueryClient::from_config(&config).unwrap();
    assert_eq!(
      client.executor().registry().base_url().as_str(),
      "http://localhost:9000/"
    );
    assert_eq!(client.options().stale_time, Some(Duration::from_secs(30)));
  }

  #[test]
  fn test_from_config_rejects_bad_url() {
    let mut config = Config::default();
    config.api.base_url = "not a url".to_string();
    assert!(QueryClient::from_config(&config).is_err());
  }

  #[tokio::test]
  async fn test_controllers_share_cache() {
    let transport = MockTransport::default();
    let client = client(&transport);

    let mut ads = client.ads();
    let mut also_ads = client.clone().source(SourceId::Ads);
    ads.fetch(Some("2024-01-01"), Some("2024-01-31")).await;
    also_ads.fetch(Some("2024-01-01"), Some("2024-01-31")).await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(client.store().len(), 1);
  }

  #[test]
  fn test_source_controllers() {
    let client = client(&MockTransport::default());
    assert_eq!(client.facebook().source(), SourceId::Facebook);
    assert_eq!(client.instagram().source(), SourceId::Instagram);
    assert_eq!(client.analytics().source(), SourceId::Analytics);
    assert_eq!(client.overview().query().source(), SourceId::Overall);
  }
}
