//! Issues, deduplicates and commits source fetches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::store::CacheStore;
use super::transport::Transport;
use crate::normalize::{normalize, CanonicalDataset};
use crate::query::state::fallback_message;
use crate::query::{CacheEntry, ErrorInfo, QueryKey};
use crate::source::{EndpointRegistry, SourceId};

/// How a fetch ended, as seen by everyone awaiting it.
#[derive(Debug, Clone)]
enum Outcome {
  Committed(CacheEntry),
  /// A newer generation owns the key; this result was dropped.
  Superseded,
}

type SharedFetch = Shared<BoxFuture<'static, Outcome>>;

struct InFlight {
  generation: u64,
  fetch: SharedFetch,
}

struct ExecutorInner<T> {
  transport: T,
  registry: EndpointRegistry,
  store: CacheStore,
  in_flight: Mutex<HashMap<QueryKey, InFlight>>,
}

impl<T> ExecutorInner<T> {
  fn in_flight(&self) -> MutexGuard<'_, HashMap<QueryKey, InFlight>> {
    self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Removes a fetch from the in-flight table when its task ends, unless a
/// newer generation has already replaced it.
struct InFlightGuard<T> {
  inner: Arc<ExecutorInner<T>>,
  key: QueryKey,
  generation: u64,
}

impl<T> Drop for InFlightGuard<T> {
  fn drop(&mut self) {
    let mut in_flight = self.inner.in_flight();
    if in_flight
      .get(&self.key)
      .is_some_and(|f| f.generation == self.generation)
    {
      in_flight.remove(&self.key);
    }
  }
}

/// Runs network fetches for query keys and writes outcomes to the store.
///
/// At most one fetch per key is in flight; concurrent `request`s for the same
/// key await the same fetch. Each fetch runs on its own task, so it finishes
/// (and frees its slot) even if every caller stops waiting.
pub struct FetchExecutor<T> {
  inner: Arc<ExecutorInner<T>>,
}

impl<T> Clone for FetchExecutor<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T: Transport> FetchExecutor<T> {
  pub fn new(transport: T, registry: EndpointRegistry, store: CacheStore) -> Self {
    Self {
      inner: Arc::new(ExecutorInner {
        transport,
        registry,
        store,
        in_flight: Mutex::new(HashMap::new()),
      }),
    }
  }

  pub fn store(&self) -> &CacheStore {
    &self.inner.store
  }

  pub fn registry(&self) -> &EndpointRegistry {
    &self.inner.registry
  }

  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    self.inner.in_flight().contains_key(key)
  }

  /// Fetch `key`, or join the fetch already running for it.
  ///
  /// Resolves once the entry reaches `Success` or `Error`. No retries.
  pub async fn request(&self, key: &QueryKey) -> CacheEntry {
    let fetch = self.attach_or_start(key, false);
    self.settle(key, fetch).await
  }

  /// Start a new generation for `key` even if a fetch is in flight.
  ///
  /// The older fetch's result will be discarded on arrival.
  pub async fn refetch(&self, key: &QueryKey) -> CacheEntry {
    let fetch = self.attach_or_start(key, true);
    self.settle(key, fetch).await
  }

  /// Like [`request`](Self::request) without waiting.
  ///
  /// The entry has moved to `Loading`/`Revalidating` (and subscribers have
  /// been told) by the time this returns.
  pub fn start(&self, key: &QueryKey) {
    self.attach_or_start(key, false);
  }

  /// Like [`refetch`](Self::refetch) without waiting.
  pub fn start_refetch(&self, key: &QueryKey) {
    self.attach_or_start(key, true);
  }

  async fn settle(&self, key: &QueryKey, mut fetch: SharedFetch) -> CacheEntry {
    loop {
      match fetch.await {
        Outcome::Committed(entry) => return entry,
        // follow whichever fetch superseded ours
        Outcome::Superseded => match self.attached(key) {
          Some(newer) => fetch = newer,
          None => return self.inner.store.get(key).unwrap_or_default(),
        },
      }
    }
  }

  fn attached(&self, key: &QueryKey) -> Option<SharedFetch> {
    self.inner.in_flight().get(key).map(|f| f.fetch.clone())
  }

  fn attach_or_start(&self, key: &QueryKey, force: bool) -> SharedFetch {
    let mut in_flight = self.inner.in_flight();

    if !force {
      if let Some(existing) = in_flight.get(key) {
        debug!(
          key = %key.description(),
          generation = existing.generation,
          "joining in-flight fetch"
        );
        return existing.fetch.clone();
      }
    }

    let generation = self.inner.store.begin_fetch(key);
    let fetch = self.spawn_fetch(key.clone(), generation);
    in_flight.insert(
      key.clone(),
      InFlight {
        generation,
        fetch: fetch.clone(),
      },
    );
    fetch
  }

  fn spawn_fetch(&self, key: QueryKey, generation: u64) -> SharedFetch {
    let inner = Arc::clone(&self.inner);
    let store = inner.store.clone();
    let task_key = key.clone();

    let handle = tokio::spawn(async move {
      let guard = InFlightGuard {
        inner,
        key: task_key,
        generation,
      };
      let inner = &guard.inner;
      let key = &guard.key;

      let url = inner.registry.url_for(key);
      debug!(
        key = %key.description(),
        hash = %key.cache_hash(),
        generation,
        %url,
        "fetching"
      );

      let outcome = fetch_dataset(&inner.transport, url, key.source).await;
      if let Err(error) = &outcome {
        warn!(
          key = %key.description(),
          generation,
          status = ?error.http_status,
          error = %error.message,
          "fetch failed"
        );
      }

      match inner.store.commit(key, generation, outcome) {
        Some(entry) => Outcome::Committed(entry),
        None => Outcome::Superseded,
      }
    });

    handle
      .map(move |joined| match joined {
        Ok(outcome) => outcome,
        Err(err) => {
          warn!(key = %key.description(), generation, error = %err, "fetch task aborted");
          let failure = ErrorInfo::transport(format!("{}: {}", fallback_message(key.source), err));
          match store.commit(&key, generation, Err(failure)) {
            Some(entry) => Outcome::Committed(entry),
            None => Outcome::Superseded,
          }
        }
      })
      .boxed()
      .shared()
  }
}

/// One network round trip plus normalization.
async fn fetch_dataset<T: Transport>(
  transport: &T,
  url: Url,
  source: SourceId,
) -> Result<CanonicalDataset, ErrorInfo> {
  let response = transport.get(url).await.map_err(|err| {
    let mut info = ErrorInfo::from(err);
    info.message = format!("{}: {}", fallback_message(source), info.message);
    info
  })?;

  if !response.is_success() {
    return Err(ErrorInfo::from_response(
      source,
      response.status,
      &response.body,
    ));
  }

  let raw: Value = serde_json::from_slice(&response.body).map_err(|e| {
    ErrorInfo::parse(format!(
      "invalid JSON from the {} endpoint: {}",
      source.label(),
      e
    ))
  })?;

  if !raw.is_object() {
    return Err(ErrorInfo::parse(format!(
      "expected a JSON object from the {} endpoint",
      source.label()
    )));
  }

  Ok(normalize(source, &raw))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{ErrorKind, QueryStatus};
  use crate::testing::MockTransport;
  use std::time::Duration;

  fn executor(transport: &MockTransport) -> FetchExecutor<MockTransport> {
    let registry = EndpointRegistry::new("http://backend.test").unwrap();
    FetchExecutor::new(transport.clone(), registry, CacheStore::default())
  }

  fn insight(entry: &CacheEntry) -> Option<&str> {
    entry.data.as_ref().map(|d| d.ai_insight())
  }

  #[tokio::test]
  async fn test_request_success() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"chartData": {"deviceData": [{"name": "Mobile", "value": 65}]}, "aiInsight": "mobile first"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Analytics, None, None);

    let entry = exec.request(&key).await;

    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(insight(&entry), Some("mobile first"));
    assert!(entry.fetched_at.is_some());
    assert_eq!(
      *transport.urls(),
      vec!["http://backend.test/ga/overview".to_string()]
    );
  }

  #[tokio::test]
  async fn test_concurrent_requests_share_one_fetch() {
    let transport = MockTransport::default();
    let gate = transport.respond_gated(200, r#"{"aiInsight": "once"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Ads, Some("2024-01-01"), Some("2024-01-31"));

    let (a, b, _) = tokio::join!(exec.request(&key), exec.request(&key), async {
      tokio::time::sleep(Duration::from_millis(10)).await;
      gate.send(()).unwrap();
    });

    assert_eq!(transport.calls(), 1);
    assert_eq!(a.generation, b.generation);
    assert_eq!(insight(&a), Some("once"));
    assert_eq!(insight(&b), Some("once"));
    assert!(!exec.is_fetching(&key));
  }

  #[tokio::test]
  async fn test_superseded_response_is_discarded() {
    let transport = MockTransport::default();
    let old_gate = transport.respond_gated(200, r#"{"aiInsight": "old"}"#);
    let new_gate = transport.respond_gated(200, r#"{"aiInsight": "new"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Analytics, None, None);

    let (old, new, _) = tokio::join!(exec.request(&key), exec.refetch(&key), async {
      tokio::time::sleep(Duration::from_millis(10)).await;
      new_gate.send(()).unwrap();
      tokio::time::sleep(Duration::from_millis(10)).await;
      old_gate.send(()).unwrap();
    });

    assert_eq!(transport.calls(), 2);
    assert_eq!(insight(&new), Some("new"));
    // the waiter on the superseded fetch sees the newer outcome
    assert_eq!(insight(&old), Some("new"));

    // give the old task time to finish and be discarded
    tokio::time::sleep(Duration::from_millis(20)).await;
    let stored = exec.store().get(&key).unwrap();
    assert_eq!(stored.generation, new.generation);
    assert_eq!(insight(&stored), Some("new"));
  }

  #[tokio::test]
  async fn test_http_error_uses_detail() {
    let transport = MockTransport::default();
    transport.respond(500, r#"{"detail": "rate limited"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Facebook, None, None);

    let entry = exec.request(&key).await;

    assert_eq!(entry.status, QueryStatus::Error);
    let error = entry.error.unwrap();
    assert_eq!(error.message, "rate limited");
    assert_eq!(error.http_status, Some(500));
    assert_eq!(error.kind, ErrorKind::HttpStatus);
  }

  #[tokio::test]
  async fn test_http_error_with_unparsable_body() {
    let transport = MockTransport::default();
    transport.respond(500, "Internal Server Error");
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Facebook, None, None);

    let entry = exec.request(&key).await;
    assert_eq!(entry.error_message(), Some("Failed to load Facebook data"));
  }

  #[tokio::test]
  async fn test_failure_keeps_last_good_data() {
    let transport = MockTransport::default();
    transport.respond(200, r#"{"aiInsight": "good"}"#);
    let gate = transport.respond_gated(503, r#"{"message": "maintenance"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Instagram, None, None);

    exec.request(&key).await;

    let (entry, _) = tokio::join!(exec.request(&key), async {
      tokio::time::sleep(Duration::from_millis(10)).await;
      assert_eq!(
        exec.store().get(&key).unwrap().status,
        QueryStatus::Revalidating
      );
      gate.send(()).unwrap();
    });

    assert_eq!(entry.status, QueryStatus::Error);
    assert_eq!(entry.error_message(), Some("maintenance"));
    assert_eq!(insight(&entry), Some("good"));
  }

  #[tokio::test]
  async fn test_transport_error() {
    let transport = MockTransport::default();
    transport.fail("connection refused");
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Overall, None, None);

    let entry = exec.request(&key).await;

    let error = entry.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Transport);
    assert_eq!(error.http_status, None);
    assert_eq!(
      error.message,
      "Failed to load overall overview data: connection refused"
    );
  }

  #[tokio::test]
  async fn test_parse_errors() {
    let transport = MockTransport::default();
    transport.respond(200, "not json");
    transport.respond(200, "[1, 2, 3]");
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Ads, None, None);

    for _ in 0..2 {
      let entry = exec.request(&key).await;
      assert_eq!(entry.status, QueryStatus::Error);
      assert_eq!(entry.error.unwrap().kind, ErrorKind::Parse);
      assert!(entry.data.is_none());
    }
  }

  #[tokio::test]
  async fn test_fetch_completes_without_waiters() {
    let transport = MockTransport::default();
    let gate = transport.respond_gated(200, r#"{"aiInsight": "late"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Ads, None, None);

    let timed_out = tokio::time::timeout(Duration::from_millis(10), exec.request(&key)).await;
    assert!(timed_out.is_err());
    assert!(exec.is_fetching(&key));

    gate.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!exec.is_fetching(&key));
    let entry = exec.store().get(&key).unwrap();
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(insight(&entry), Some("late"));
  }

  #[tokio::test]
  async fn test_generations_increase() {
    let transport = MockTransport::default();
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Ads, None, None);

    let first = exec.request(&key).await;
    let second = exec.request(&key).await;
    assert!(second.generation > first.generation);
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_start_marks_entry_before_returning() {
    let transport = MockTransport::default();
    let gate = transport.respond_gated(200, r#"{"aiInsight": "started"}"#);
    let exec = executor(&transport);
    let key = QueryKey::for_source(SourceId::Facebook, None, None);

    exec.start(&key);
    assert_eq!(exec.store().get(&key).unwrap().status, QueryStatus::Loading);
    assert!(exec.is_fetching(&key));

    // a second start joins the fetch in flight
    exec.start(&key);
    gate.send(()).unwrap();
    let entry = exec.request(&key).await;
    assert_eq!(insight(&entry), Some("started"));
    assert_eq!(transport.calls(), 1);
  }
}
