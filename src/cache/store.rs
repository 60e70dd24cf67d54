//! In-memory cache store keyed by [`QueryKey`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use chrono::Utc;
use tracing::debug;

use crate::normalize::CanonicalDataset;
use crate::query::{CacheEntry, ErrorInfo, QueryKey, QueryStatus};

/// Subscriber callback, invoked with every new state of its key.
pub type Callback = Arc<dyn Fn(&CacheEntry) + Send + Sync>;

struct Slot {
  entry: CacheEntry,
  subscribers: Vec<(u64, Callback)>,
}

impl Slot {
  fn new() -> Self {
    Self {
      entry: CacheEntry::default(),
      subscribers: Vec::new(),
    }
  }
}

struct StoreInner {
  slots: RwLock<HashMap<QueryKey, Slot>>,
  /// Serializes writers so subscribers see each key's transitions in order.
  write_lock: Mutex<()>,
  next_generation: AtomicU64,
  next_subscriber: AtomicU64,
  max_entries: Option<usize>,
}

/// Shared map from query key to cache entry.
///
/// Reads are concurrent. Writes are serialized and notify the key's
/// subscribers synchronously before the write returns. Callbacks run outside
/// the entry lock, so they may read the store, but must not write to it.
#[derive(Clone)]
pub struct CacheStore {
  inner: Arc<StoreInner>,
}

impl CacheStore {
  /// Create a store. With `max_entries`, the least recently fetched
  /// unobserved entry is evicted once a new key would exceed the bound.
  pub fn new(max_entries: Option<usize>) -> Self {
    Self {
      inner: Arc::new(StoreInner {
        slots: RwLock::new(HashMap::new()),
        write_lock: Mutex::new(()),
        next_generation: AtomicU64::new(1),
        next_subscriber: AtomicU64::new(1),
        max_entries,
      }),
    }
  }

  pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
    self.read().get(key).map(|slot| slot.entry.clone())
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.read().contains_key(key)
  }

  /// Replace the entry for `key` wholesale.
  pub fn put(&self, key: QueryKey, entry: CacheEntry) {
    self.update(&key, |current| *current = entry);
  }

  /// Mark `key` as needing a refetch. Data is kept so views don't blank.
  pub fn invalidate(&self, key: &QueryKey) {
    if !self.contains(key) {
      return;
    }
    self.update(key, |entry| {
      entry.status = QueryStatus::Idle;
      entry.error = None;
    });
  }

  /// Like [`invalidate`](Self::invalidate), but also drops cached data.
  pub fn clear(&self, key: &QueryKey) {
    if !self.contains(key) {
      return;
    }
    self.update(key, |entry| {
      entry.status = QueryStatus::Idle;
      entry.error = None;
      entry.data = None;
      entry.fetched_at = None;
    });
  }

  /// Drop the cached entry for `key` and return it.
  ///
  /// An unobserved key is removed outright. An observed one keeps its
  /// subscribers and is reset to an empty `Idle` entry, which they are told
  /// about. The generation survives the reset so a fetch already in flight
  /// can still land.
  pub fn evict(&self, key: &QueryKey) -> Option<CacheEntry> {
    let _guard = self.write_guard();
    let (evicted, reset, subscribers) = {
      let mut slots = self.write();
      let slot = slots.get_mut(key)?;
      if slot.subscribers.is_empty() {
        return slots.remove(key).map(|slot| slot.entry);
      }

      let reset = CacheEntry {
        generation: slot.entry.generation,
        ..CacheEntry::default()
      };
      let evicted = std::mem::replace(&mut slot.entry, reset.clone());
      (evicted, reset, callbacks(slot))
    };

    debug!(key = %key.description(), "evicted observed entry, resetting");
    notify(&subscribers, &reset);
    Some(evicted)
  }

  /// Register `callback` for `key`. It runs immediately with the current
  /// entry (an idle one is created if the key is new), then on every change.
  pub fn subscribe<F>(&self, key: QueryKey, callback: F) -> Subscription
  where
    F: Fn(&CacheEntry) + Send + Sync + 'static,
  {
    let callback: Callback = Arc::new(callback);
    let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);

    let _guard = self.write_guard();
    let current = {
      let mut slots = self.write();
      let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
      slot.subscribers.push((id, Arc::clone(&callback)));
      let current = slot.entry.clone();
      self.enforce_capacity(&mut slots, &key);
      current
    };
    callback(&current);

    Subscription {
      store: Arc::downgrade(&self.inner),
      key,
      id,
    }
  }

  /// Start a new fetch generation for `key`.
  ///
  /// Status becomes `Revalidating` when data is already cached, `Loading`
  /// otherwise. Returns the generation the eventual commit must present.
  pub fn begin_fetch(&self, key: &QueryKey) -> u64 {
    let mut generation = 0;
    self.update(key, |entry| {
      // allocated under the write lock so generations land in increasing order
      generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
      entry.generation = generation;
      entry.status = if entry.data.is_some() {
        QueryStatus::Revalidating
      } else {
        QueryStatus::Loading
      };
    });
    generation
  }

  /// Apply a fetch outcome if `generation` is still current for `key`.
  ///
  /// Returns the committed entry, or `None` when a newer fetch owns the key
  /// (or the key was evicted meanwhile) and the outcome was discarded.
  pub fn commit(
    &self,
    key: &QueryKey,
    generation: u64,
    outcome: Result<CanonicalDataset, ErrorInfo>,
  ) -> Option<CacheEntry> {
    let _guard = self.write_guard();
    let (entry, subscribers) = {
      let mut slots = self.write();
      let slot = slots.get_mut(key)?;
      if slot.entry.generation != generation {
        debug!(
          key = %key.description(),
          generation,
          current = slot.entry.generation,
          "discarding superseded response"
        );
        return None;
      }

      let entry = &mut slot.entry;
      match outcome {
        Ok(data) => {
          entry.status = QueryStatus::Success;
          entry.data = Some(data);
          entry.error = None;
          entry.fetched_at = Some(Utc::now());
        }
        Err(error) => {
          entry.status = QueryStatus::Error;
          entry.error = Some(error);
        }
      }
      let snapshot = entry.clone();
      (snapshot, callbacks(slot))
    };

    notify(&subscribers, &entry);
    Some(entry)
  }

  /// Read-modify-write one entry (creating it if needed), then notify.
  fn update(&self, key: &QueryKey, apply: impl FnOnce(&mut CacheEntry)) {
    let _guard = self.write_guard();
    let (entry, subscribers) = {
      let mut slots = self.write();
      let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
      apply(&mut slot.entry);
      let snapshot = (slot.entry.clone(), callbacks(slot));
      self.enforce_capacity(&mut slots, key);
      snapshot
    };
    notify(&subscribers, &entry);
  }

  fn enforce_capacity(&self, slots: &mut HashMap<QueryKey, Slot>, keep: &QueryKey) {
    let Some(max) = self.inner.max_entries else {
      return;
    };

    while slots.len() > max {
      // Oldest fetch first; never-fetched entries sort before everything
      let victim = slots
        .iter()
        .filter(|(key, slot)| *key != keep && slot.subscribers.is_empty())
        .min_by_key(|(_, slot)| slot.entry.fetched_at)
        .map(|(key, _)| key.clone());

      match victim {
        Some(key) => {
          debug!(key = %key.description(), "evicting cache entry");
          slots.remove(&key);
        }
        // everything left is observed; allow exceeding the bound
        None => break,
      }
    }
  }

  fn unsubscribe(&self, key: &QueryKey, id: u64) {
    let _guard = self.write_guard();
    if let Some(slot) = self.write().get_mut(key) {
      slot.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }
  }

  /// Number of live subscriptions on `key`.
  pub fn subscriber_count(&self, key: &QueryKey) -> usize {
    self
      .read()
      .get(key)
      .map(|slot| slot.subscribers.len())
      .unwrap_or(0)
  }

  fn write_guard(&self) -> MutexGuard<'_, ()> {
    self
      .inner
      .write_lock
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<QueryKey, Slot>> {
    self
      .inner
      .slots
      .read()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<QueryKey, Slot>> {
    self
      .inner
      .slots
      .write()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(None)
  }
}

impl std::fmt::Debug for CacheStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CacheStore")
      .field("entries", &self.len())
      .field("max_entries", &self.inner.max_entries)
      .finish_non_exhaustive()
  }
}

fn callbacks(slot: &Slot) -> Vec<Callback> {
  slot
    .subscribers
    .iter()
    .map(|(_, cb)| Arc::clone(cb))
    .collect()
}

fn notify(subscribers: &[Callback], entry: &CacheEntry) {
  for callback in subscribers {
    callback(entry);
  }
}

/// Handle for a store subscription. Dropping it unsubscribes.
pub struct Subscription {
  store: Weak<StoreInner>,
  key: QueryKey,
  id: u64,
}

impl Subscription {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn unsubscribe(self) {
    // Drop does the work
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(inner) = self.store.upgrade() {
      CacheStore { inner }.unsubscribe(&self.key, self.id);
    }
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key)
      .field("id", &self.id)
      .finish()
  }
}
