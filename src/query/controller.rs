//! Per-source query controllers.
//!
//! A [`SourceQuery`] is what presentation code holds for one data source.
//! It turns a date range into a [`QueryKey`], keeps a live subscription to
//! that key's cache entry, and starts a fetch when the entry is idle or stale.
//!
//! # Example
//!
//! ```ignore
//! let mut analytics = client.analytics();
//!
//! // Starts a fetch on first use; later calls with the same range reuse the cache
//! let mut entry = analytics.observe(Some("2024-02-01"), None);
//!
//! // In event loop tick
//! if entry.has_changed().unwrap_or(false) {
//!     match entry.borrow_and_update().status {
//!         QueryStatus::Loading => render_spinner(),
//!         QueryStatus::Success | QueryStatus::Revalidating => render_data(..),
//!         QueryStatus::Error => render_error(..),
//!         QueryStatus::Idle => {}
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::key::QueryKey;
use super::state::{CacheEntry, QueryStatus};
use crate::cache::{FetchExecutor, Subscription, Transport};
use crate::normalize::Kpi;
use crate::source::SourceId;

/// Freshness policy for a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
  /// Successful data older than this is refetched on the next `observe`.
  /// `None` keeps cached data until it is invalidated.
  pub stale_time: Option<Duration>,
  /// Invalidate and refetch the observed key on this period.
  pub refetch_interval: Option<Duration>,
}

/// The key currently observed, with everything tied to its lifetime.
struct Observed {
  key: QueryKey,
  rx: watch::Receiver<CacheEntry>,
  _subscription: Subscription,
  poller: Option<JoinHandle<()>>,
}

impl Drop for Observed {
  fn drop(&mut self) {
    if let Some(poller) = self.poller.take() {
      poller.abort();
    }
  }
}

/// Query controller for one data source.
///
/// Must be used from within a tokio runtime: fetches and the periodic
/// refetch run on spawned tasks.
pub struct SourceQuery<T: Transport> {
  source: SourceId,
  executor: FetchExecutor<T>,
  options: QueryOptions,
  observed: Option<Observed>,
}

impl<T: Transport> SourceQuery<T> {
  pub fn new(source: SourceId, executor: FetchExecutor<T>, options: QueryOptions) -> Self {
    Self {
      source,
      executor,
      options,
      observed: None,
    }
  }

  /// Set the stale time. Takes effect from the next `observe`.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.options.stale_time = Some(stale_time);
    self
  }

  /// Attach a periodic refetch. Takes effect for the next observed key.
  pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
    self.options.refetch_interval = Some(interval);
    self
  }

  pub fn source(&self) -> SourceId {
    self.source
  }

  pub fn options(&self) -> QueryOptions {
    self.options
  }

  /// Key of the current subscription, if any.
  pub fn key(&self) -> Option<&QueryKey> {
    self.observed.as_ref().map(|o| &o.key)
  }

  /// Observe the entry for a date range.
  ///
  /// With the same range as the previous call this returns the existing live
  /// receiver. A different range replaces the subscription. Either way a fetch
  /// is started when the entry is idle or stale.
  pub fn observe(
    &mut self,
    start_date: Option<&str>,
    end_date: Option<&str>,
  ) -> watch::Receiver<CacheEntry> {
    let key = QueryKey::for_source(self.source, start_date, end_date);

    if let Some(observed) = &self.observed {
      if observed.key == key {
        self.ensure_fresh(&key);
        return observed.rx.clone();
      }
    }

    // drop the old subscription and poller before wiring the new key
    self.observed = None;

    let (tx, rx) = watch::channel(CacheEntry::default());
    let subscription = self.executor.store().subscribe(key.clone(), move |entry| {
      tx.send_replace(entry.clone());
    });
    let poller = self
      .options
      .refetch_interval
      .map(|every| self.spawn_poller(key.clone(), every));

    debug!(key = %key.description(), "observing");
    self.ensure_fresh(&key);

    self.observed = Some(Observed {
      key,
      rx: rx.clone(),
      _subscription: subscription,
      poller,
    });
    rx
  }

  /// Observe a range and wait until its entry settles on Success or Error.
  pub async fn fetch(&mut self, start_date: Option<&str>, end_date: Option<&str>) -> CacheEntry {
    let mut rx = self.observe(start_date, end_date);
    let settled = rx
      .wait_for(|entry| entry.status.is_settled())
      .await
      .map(|entry| entry.clone());

    match settled {
      Ok(entry) => entry,
      // the subscription went away while waiting; report what the store holds now
      Err(_) => self
        .key()
        .and_then(|key| self.executor.store().get(key))
        .unwrap_or_default(),
    }
  }

  /// Latest entry for the observed key.
  pub fn current(&self) -> Option<CacheEntry> {
    self.observed.as_ref().map(|o| o.rx.borrow().clone())
  }

  /// Invalidate the observed key and refetch it, superseding any fetch in flight.
  pub fn refresh(&self) {
    let Some(observed) = &self.observed else {
      return;
    };

    self.executor.store().invalidate(&observed.key);
    self.executor.start_refetch(&observed.key);
  }

  /// Stop observing. The cache entry itself stays in the store.
  pub fn reset(&mut self) {
    self.observed = None;
  }

  fn ensure_fresh(&self, key: &QueryKey) {
    let entry = self.executor.store().get(key).unwrap_or_default();
    let stale = entry.status == QueryStatus::Success
      && self
        .options
        .stale_time
        .is_some_and(|stale_time| entry.is_stale(stale_time));

    if entry.status != QueryStatus::Idle && !stale {
      return;
    }

    debug!(key = %key.description(), stale, "starting fetch");
    // moves the entry off its settled state before observe() hands out the receiver
    self.executor.start(key);
  }

  fn spawn_poller(&self, key: QueryKey, every: Duration) -> JoinHandle<()> {
    let executor = self.executor.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
      // the first tick completes immediately; observe() already fetched
      ticker.tick().await;

      loop {
        ticker.tick().await;
        // a fetch already in flight is joined rather than flipped back to idle
        if !executor.is_fetching(&key) {
          debug!(key = %key.description(), "periodic refetch");
          executor.store().invalidate(&key);
        }
        executor.request(&key).await;
      }
    })
  }
}

/// Controller for the composite `overall` source.
///
/// KPIs come from the backend's own overview endpoint; they are not derived
/// from the other four sources.
pub struct OverviewAggregator<T: Transport> {
  query: SourceQuery<T>,
}

impl<T: Transport> OverviewAggregator<T> {
  pub fn new(executor: FetchExecutor<T>, options: QueryOptions) -> Self {
    Self {
      query: SourceQuery::new(SourceId::Overall, executor, options),
    }
  }

  pub fn observe(
    &mut self,
    start_date: Option<&str>,
    end_date: Option<&str>,
  ) -> watch::Receiver<CacheEntry> {
    self.query.observe(start_date, end_date)
  }

  pub async fn fetch(&mut self, start_date: Option<&str>, end_date: Option<&str>) -> CacheEntry {
    self.query.fetch(start_date, end_date).await
  }

  pub fn current(&self) -> Option<CacheEntry> {
    self.query.current()
  }

  pub fn refresh(&self) {
    self.query.refresh();
  }

  /// KPIs of the last successful fetch, empty before one lands.
  pub fn kpis(&self) -> Vec<Kpi> {
    self
      .current()
      .and_then(|entry| entry.data)
      .and_then(|data| data.as_overview().map(|o| o.kpis.clone()))
      .unwrap_or_default()
  }

  pub fn query(&self) -> &SourceQuery<T> {
    &self.query
  }

  pub fn query_mut(&mut self) -> &mut SourceQuery<T> {
    &mut self.query
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::cache::CacheStore;
  use crate::source::EndpointRegistry;
  use crate::testing::MockTransport;

  fn executor(transport: &MockTransport) -> FetchExecutor<MockTransport> {
    let registry = EndpointRegistry::new("http://backend.test").unwrap();
    FetchExecutor::new(transport.clone(), registry, CacheStore::default())
  }

  fn insight(entry: &CacheEntry) -> Option<String> {
    entry.data.as_ref().map(|d| d.ai_insight().to_string())
  }

  async fn settle(rx: &mut watch::Receiver<CacheEntry>) -> CacheEntry {
    rx.wait_for(|e| e.status.is_settled())
      .await
      .unwrap()
      .clone()
  }

  #[tokio::test]
  async fn test_cached_success_is_reused_until_invalidated() {
    let transport = MockTransport::default();
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Ads, exec.clone(), QueryOptions::default());

    let entry = query.fetch(Some("2024-01-01"), Some("2024-01-31")).await;
    assert!(entry.is_success());

    let again = query.fetch(Some("2024-01-01"), Some("2024-01-31")).await;
    assert!(again.is_success());
    assert_eq!(again.generation, entry.generation);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.calls(), 1);

    exec.store().invalidate(query.key().unwrap());
    let refetched = query.fetch(Some("2024-01-01"), Some("2024-01-31")).await;
    assert!(refetched.generation > entry.generation);
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_second_controller_shares_cache() {
    let transport = MockTransport::default();
    let exec = executor(&transport);
    let mut first = SourceQuery::new(SourceId::Facebook, exec.clone(), QueryOptions::default());
    let mut second = SourceQuery::new(SourceId::Facebook, exec, QueryOptions::default());

    first.fetch(None, None).await;
    let entry = second.fetch(Some(""), None).await;

    assert!(entry.is_success());
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_range_change_follows_latest_key() {
    let transport = MockTransport::default();
    let slow = transport.respond_gated(200, r#"{"chartData": {"deviceData": [{"name": "Mobile", "value": 65}]}, "aiInsight": "all time"}"#);
    transport.respond(200, r#"{"aiInsight": "february"}"#);
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Analytics, exec.clone(), QueryOptions::default());

    let _all_time = query.observe(None, None);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let mut february = query.observe(Some("2024-02-01"), None);

    let entry = settle(&mut february).await;
    assert_eq!(insight(&entry).as_deref(), Some("february"));

    slow.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(insight(&february.borrow()).as_deref(), Some("february"));
    assert_eq!(insight(&query.current().unwrap()).as_deref(), Some("february"));

    let old_key = QueryKey::for_source(SourceId::Analytics, None, None);
    assert_eq!(exec.store().subscriber_count(&old_key), 0);
    // the first range still lands in its own slot
    assert!(exec.store().get(&old_key).unwrap().is_success());
  }

  #[tokio::test]
  async fn test_stale_data_is_refetched() {
    let transport = MockTransport::default();
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Instagram, exec, QueryOptions::default())
      .with_stale_time(Duration::ZERO);

    query.fetch(None, None).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    query.observe(None, None);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_fetch_waits_for_stale_refetch() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"aiInsight": "first"}"#);
    transport.respond(200, r#"{"aiInsight": "second"}"#);
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Ads, exec, QueryOptions::default())
      .with_stale_time(Duration::ZERO);

    let first = query.fetch(None, None).await;
    assert_eq!(insight(&first).as_deref(), Some("first"));
    tokio::time::sleep(Duration::from_millis(5)).await;

    let second = query.fetch(None, None).await;
    assert_eq!(insight(&second).as_deref(), Some("second"));
    assert!(second.generation > first.generation);
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_stale_entry_is_revalidating_when_observe_returns() {
    let transport = MockTransport::default();
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Facebook, exec, QueryOptions::default())
      .with_stale_time(Duration::ZERO);

    query.fetch(None, None).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let rx = query.observe(None, None);
    assert_eq!(rx.borrow().status, QueryStatus::Revalidating);
  }

  #[tokio::test]
  async fn test_evicted_key_is_refetched_for_observer() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"aiInsight": "first"}"#);
    transport.respond(200, r#"{"aiInsight": "second"}"#);
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Ads, exec.clone(), QueryOptions::default());

    let first = query.fetch(None, None).await;
    assert_eq!(insight(&first).as_deref(), Some("first"));

    let key = query.key().unwrap().clone();
    exec.store().evict(&key);
    assert_eq!(query.current().unwrap().status, QueryStatus::Idle);

    let entry = query.fetch(None, None).await;
    assert_eq!(insight(&entry).as_deref(), Some("second"));
    assert_eq!(insight(&query.current().unwrap()).as_deref(), Some("second"));
    assert_eq!(exec.store().subscriber_count(&key), 1);
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_error_is_not_retried_automatically() {
    let transport = MockTransport::default();
    transport.respond(500, r#"{"detail": "rate limited"}"#);
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Ads, exec, QueryOptions::default());

    let entry = query.fetch(None, None).await;
    assert_eq!(entry.error_message(), Some("rate limited"));

    query.observe(None, None);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_refresh_forces_new_fetch() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"aiInsight": "first"}"#);
    transport.respond(200, r#"{"aiInsight": "second"}"#);
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Ads, exec, QueryOptions::default());

    let mut rx = query.observe(None, None);
    settle(&mut rx).await;

    query.refresh();
    let entry = rx
      .wait_for(|e| e.is_success() && insight(e).as_deref() == Some("second"))
      .await
      .unwrap()
      .clone();
    assert_eq!(transport.calls(), 2);
    assert!(entry.fetched_at.is_some());
  }

  #[tokio::test]
  async fn test_refetch_interval_polls_until_dropped() {
    let transport = MockTransport::default();
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Facebook, exec, QueryOptions::default())
      .with_refetch_interval(Duration::from_millis(20));

    query.fetch(None, None).await;
    tokio::time::sleep(Duration::from_millis(75)).await;
    let polled = transport.calls();
    assert!(polled >= 3, "expected periodic refetches, got {} calls", polled);

    drop(query);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.calls() <= polled + 1);
  }

  #[tokio::test]
  async fn test_poll_leaves_fetch_in_flight_alone() {
    let transport = MockTransport::default();
    let gate = transport.respond_gated(200, r#"{"aiInsight": "slow"}"#);
    let exec = executor(&transport);
    let mut query = SourceQuery::new(SourceId::Analytics, exec.clone(), QueryOptions::default())
      .with_refetch_interval(Duration::from_millis(10));

    let mut rx = query.observe(None, None);
    let key = query.key().unwrap().clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = exec
      .store()
      .subscribe(key, move |entry| sink.lock().unwrap().push(entry.status));

    // several poll periods pass while the first response is held back
    tokio::time::sleep(Duration::from_millis(35)).await;
    assert!(!seen.lock().unwrap().contains(&QueryStatus::Idle));
    assert_eq!(transport.calls(), 1);

    gate.send(()).unwrap();
    assert!(settle(&mut rx).await.is_success());
  }

  #[tokio::test]
  async fn test_overview_kpis() {
    let transport = MockTransport::default();
    transport.respond(
      200,
      r#"{"overviewData": {"kpis": [{"title": "Total Spend", "value": "$3,240", "period": "7d"}]}, "aiInsight": "Spend is flat."}"#,
    );
    let exec = executor(&transport);
    let mut overview = OverviewAggregator::new(exec, QueryOptions::default());

    assert!(overview.kpis().is_empty());
    overview.fetch(None, None).await;

    let kpis = overview.kpis();
    assert_eq!(kpis.len(), 1);
    assert_eq!(kpis[0].title, "Total Spend");
    assert_eq!(kpis[0].period.as_deref(), Some("7d"));
    assert_eq!(
      *transport.urls(),
      vec!["http://backend.test/api/overview/all".to_string()]
    );
  }
}
