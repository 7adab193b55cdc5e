//! Cache layer that orchestrates caching logic with network fetching.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, trace, warn};

use super::pages::{drain_pages, PageLimits};
use super::storage::EntryStore;
use super::traits::{CacheResult, CacheSnapshot, Cacheable, Transform};
use crate::error::{CacheError, Result};
use crate::filter::FilterDescriptor;
use crate::transport::{CollectionId, Fields, Transport};

type Records<T> = Arc<Vec<T>>;
type Flight<T> = Shared<BoxFuture<'static, Result<Records<T>>>>;

/// Tuning for one [`CollectionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
  /// How long a fetched entry may be served without refetching
  pub ttl: Duration,
  pub limits: PageLimits,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      ttl: Duration::from_secs(5 * 60),
      limits: PageLimits::default(),
    }
  }
}

/// Cached, de-duplicated access to one collection.
///
/// Every read goes through [`fetch`](Self::fetch), which serves a valid entry
/// without touching the network, joins a fetch already in flight for the same
/// key, or drains all pages from the transport. Writes go to the transport
/// first and then patch whatever entries are loaded, so the visible lists stay
/// consistent without a refetch.
///
/// Cloning is cheap and clones share state.
pub struct CollectionCache<T: Cacheable> {
  inner: Arc<Inner<T>>,
}

struct Inner<T: Cacheable> {
  collection: CollectionId,
  transport: Arc<dyn Transport>,
  transform: Transform<T>,
  settings: CacheSettings,
  store: EntryStore<T>,
  flights: DashMap<String, Flight<T>>,
  total_count: AtomicUsize,
  default_key: String,
}

enum Claim<T> {
  Ready(CacheResult<Records<T>>),
  Started(Flight<T>),
  Joined(Flight<T>),
}

impl<T: Cacheable> CollectionCache<T> {
  /// Create a cache for `collection` that normalizes raw items with `transform`.
  pub fn new(
    collection: CollectionId,
    transport: Arc<dyn Transport>,
    transform: Transform<T>,
  ) -> Self {
    Self::with_settings(collection, transport, transform, CacheSettings::default())
  }

  pub fn with_settings(
    collection: CollectionId,
    transport: Arc<dyn Transport>,
    transform: Transform<T>,
    settings: CacheSettings,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        collection,
        transport,
        transform,
        settings,
        store: EntryStore::new(settings.ttl),
        flights: DashMap::new(),
        total_count: AtomicUsize::new(0),
        default_key: FilterDescriptor::default().cache_key(),
      }),
    }
  }

  pub fn collection(&self) -> &CollectionId {
    &self.inner.collection
  }

  pub fn settings(&self) -> CacheSettings {
    self.inner.settings
  }

  /// Records for `filter` (the unfiltered view when `None`).
  pub async fn fetch(&self, filter: Option<&FilterDescriptor>) -> Result<Records<T>> {
    Ok(self.fetch_with_source(filter).await?.data)
  }

  /// Like [`fetch`](Self::fetch), also reporting where the records came from.
  pub async fn fetch_with_source(
    &self,
    filter: Option<&FilterDescriptor>,
  ) -> Result<CacheResult<Records<T>>> {
    let filter = filter.map(FilterDescriptor::normalized).unwrap_or_default();
    let key = filter.cache_key();

    if let Some(hit) = self.inner.store.get_valid(&key) {
      trace!(
        collection = %self.inner.collection,
        filter = %filter.description(),
        "cache hit"
      );
      return Ok(CacheResult::from_cache(hit.records, hit.cached_at));
    }

    match self.claim(&key, filter) {
      Claim::Ready(result) => Ok(result),
      Claim::Started(flight) => flight.await.map(CacheResult::from_network),
      Claim::Joined(flight) => flight.await.map(CacheResult::joined),
    }
  }

  /// Find or start the flight for `key`.
  ///
  /// The drain runs in its own task so that a caller dropping its future
  /// never leaves the marker behind for the other waiters.
  fn claim(&self, key: &str, filter: FilterDescriptor) -> Claim<T> {
    match self.inner.flights.entry(key.to_string()) {
      Entry::Occupied(flight) => {
        debug!(
          collection = %self.inner.collection,
          filter = %filter.description(),
          "joining fetch in flight"
        );
        Claim::Joined(flight.get().clone())
      }
      Entry::Vacant(slot) => {
        // A flight may have landed between the cache check and taking the slot
        if let Some(hit) = self.inner.store.get_valid(key) {
          return Claim::Ready(CacheResult::from_cache(hit.records, hit.cached_at));
        }

        let inner = Arc::clone(&self.inner);
        let flight_key = key.to_string();
        let handle = tokio::spawn(async move { inner.run_flight(flight_key, filter).await });
        let flight = async move {
          handle
            .await
            .unwrap_or_else(|e| Err(CacheError::FlightAborted(e.to_string())))
        }
        .boxed()
        .shared();

        slot.insert(flight.clone());
        Claim::Started(flight)
      }
    }
  }

  /// Record `id`, from a valid loaded entry when one holds it, otherwise read
  /// through from the transport. A read-through leaves the entries alone.
  pub async fn get(&self, id: &str) -> Result<T> {
    let inner = &self.inner;
    if let Some(record) = inner.store.find_valid(id) {
      trace!(collection = %inner.collection, id, "record served from cache");
      return Ok(record);
    }

    let raw = inner
      .transport
      .get_item(&inner.collection, id)
      .await
      .inspect_err(|e| warn!(collection = %inner.collection, id, error = %e, "get failed"))?;
    let record = (inner.transform)(raw)?;
    debug!(collection = %inner.collection, id, "read record through");
    Ok(record)
  }

  /// Non-fetching view of the entry for `filter`, valid or not.
  pub fn peek(&self, filter: Option<&FilterDescriptor>) -> Option<CacheSnapshot<T>> {
    self.inner.store.peek(&key_for(filter))
  }

  /// True while a fetch for `filter` is running.
  pub fn is_in_flight(&self, filter: Option<&FilterDescriptor>) -> bool {
    self.inner.flights.contains_key(&key_for(filter))
  }

  /// Number of loaded entries, valid or not.
  pub fn entry_count(&self) -> usize {
    self.inner.store.len()
  }

  /// Size of the unfiltered collection as last fetched, adjusted by writes.
  pub fn total_count(&self) -> usize {
    self.inner.total_count.load(Ordering::SeqCst)
  }

  /// Create one record and put it at the front of the unfiltered entry.
  ///
  /// Filtered entries are left alone and catch up on their next refetch.
  pub async fn create(&self, fields: &Fields) -> Result<T> {
    let inner = &self.inner;
    let raw = inner
      .transport
      .create_item(&inner.collection, fields)
      .await
      .inspect_err(|e| warn!(collection = %inner.collection, error = %e, "create failed"))?;
    let record = (inner.transform)(raw)?;

    if inner.store.prepend(&inner.default_key, record.clone()) {
      inner.total_count.fetch_add(1, Ordering::SeqCst);
    }
    debug!(
      collection = %inner.collection,
      id = record.record_id(),
      entity = T::entity_type(),
      "created record"
    );
    Ok(record)
  }

  /// Partially update record `id` and swap the result into every loaded entry
  /// that holds it. Entries without the record are not touched.
  pub async fn update(&self, id: &str, fields: &Fields) -> Result<T> {
    let inner = &self.inner;
    let raw = inner
      .transport
      .update_item(&inner.collection, id, fields)
      .await
      .inspect_err(|e| warn!(collection = %inner.collection, id, error = %e, "update failed"))?;
    let record = (inner.transform)(raw)?;

    let patched = inner.store.replace_record(&record);
    if patched == 0 {
      trace!(collection = %inner.collection, id, "updated record not resident in any entry");
    }
    debug!(collection = %inner.collection, id, entries = patched, "updated record");
    Ok(record)
  }

  /// Delete record `id`, drop it from every loaded entry and decrement the
  /// total count (never below zero).
  pub async fn delete(&self, id: &str) -> Result<()> {
    let inner = &self.inner;
    inner
      .transport
      .delete_item(&inner.collection, id)
      .await
      .inspect_err(|e| warn!(collection = %inner.collection, id, error = %e, "delete failed"))?;

    let patched = inner.store.remove_record(id);
    if patched == 0 {
      trace!(collection = %inner.collection, id, "deleted record not resident in any entry");
    }
    let previous = inner
      .total_count
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
        Some(n.saturating_sub(1))
      })
      .unwrap_or_else(|n| n);
    debug!(
      collection = %inner.collection,
      id,
      entries = patched,
      total = previous.saturating_sub(1),
      "deleted record"
    );
    Ok(())
  }

  /// Drop the entry for `filter`, or every entry when `None`, so the next
  /// fetch goes to the network regardless of the validity window.
  pub fn invalidate(&self, filter: Option<&FilterDescriptor>) {
    match filter {
      Some(filter) => {
        let removed = self.inner.store.remove(&filter.cache_key());
        debug!(
          collection = %self.inner.collection,
          filter = %filter.description(),
          removed,
          "invalidated entry"
        );
      }
      None => {
        self.inner.store.clear();
        debug!(collection = %self.inner.collection, "invalidated all entries");
      }
    }
  }
}

impl<T: Cacheable> Inner<T> {
  async fn run_flight(&self, key: String, filter: FilterDescriptor) -> Result<Records<T>> {
    // Dropped last, after the entry is stored; also runs if the task panics
    let _marker = FlightMarker {
      flights: &self.flights,
      key: &key,
    };
    debug!(
      collection = %self.collection,
      filter = %filter.description(),
      "fetching collection"
    );

    let result = self.load(&filter).await.map(Arc::new);
    match &result {
      Ok(records) => {
        self.store.replace(&key, Arc::clone(records));
        if key == self.default_key {
          self.total_count.store(records.len(), Ordering::SeqCst);
        }
        debug!(
          collection = %self.collection,
          records = records.len(),
          "stored cache entry"
        );
      }
      Err(e) => {
        warn!(collection = %self.collection, error = %e, "fetch failed");
      }
    }

    result
  }

  async fn load(&self, filter: &FilterDescriptor) -> Result<Vec<T>> {
    let raw = drain_pages(
      self.transport.as_ref(),
      &self.collection,
      filter,
      self.settings.limits,
    )
    .await?;

    let now = Utc::now();
    let mut records = Vec::with_capacity(raw.len());
    for item in raw {
      let record = (self.transform)(item)?;
      if record.matches(filter, now) {
        records.push(record);
      }
    }
    Ok(records)
  }
}

/// Removes the in-flight marker for `key` when the flight ends, however it
/// ends. Late callers then hit the stored entry or start a new flight.
struct FlightMarker<'a, T> {
  flights: &'a DashMap<String, Flight<T>>,
  key: &'a str,
}

impl<T> Drop for FlightMarker<'_, T> {
  fn drop(&mut self) {
    self.flights.remove(self.key);
  }
}

impl<T: Cacheable> Clone for CollectionCache<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

fn key_for(filter: Option<&FilterDescriptor>) -> String {
  filter
    .map(FilterDescriptor::cache_key)
    .unwrap_or_else(|| FilterDescriptor::default().cache_key())
}
