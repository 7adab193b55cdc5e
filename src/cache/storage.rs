//! In-memory entry storage, partitioned by cache key.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;

use super::traits::{CacheSnapshot, Cacheable};

/// The most recent successful fetch for one key.
#[derive(Debug)]
struct CacheEntry<T> {
  records: Arc<Vec<T>>,
  stored_at: Instant,
  cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  fn new(records: Arc<Vec<T>>) -> Self {
    Self {
      records,
      stored_at: Instant::now(),
      cached_at: Utc::now(),
    }
  }

  fn is_valid(&self, ttl: Duration) -> bool {
    self.stored_at.elapsed() < ttl
  }

  /// Swap in a patched record list, keeping the original fetch time.
  fn with_records(&self, records: Vec<T>) -> Self {
    Self {
      records: Arc::new(records),
      stored_at: self.stored_at,
      cached_at: self.cached_at,
    }
  }
}

/// A fresh entry as returned to a caller.
pub(crate) struct Hit<T> {
  pub records: Arc<Vec<T>>,
  pub cached_at: DateTime<Utc>,
}

/// Cache entries for one collection.
///
/// Entries are never mutated in place: every write stores a new record list
/// so callers holding an older `Arc` keep a consistent view.
pub(crate) struct EntryStore<T> {
  entries: DashMap<String, CacheEntry<T>>,
  ttl: Duration,
}

impl<T: Cacheable> EntryStore<T> {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: DashMap::new(),
      ttl,
    }
  }

  /// Records for `key` if an entry exists and is inside its validity window.
  pub fn get_valid(&self, key: &str) -> Option<Hit<T>> {
    let entry = self.entries.get(key)?;
    if !entry.is_valid(self.ttl) {
      return None;
    }
    Some(Hit {
      records: Arc::clone(&entry.records),
      cached_at: entry.cached_at,
    })
  }

  pub fn peek(&self, key: &str) -> Option<CacheSnapshot<T>> {
    self.entries.get(key).map(|entry| CacheSnapshot {
      records: Arc::clone(&entry.records),
      cached_at: entry.cached_at,
      is_valid: entry.is_valid(self.ttl),
    })
  }

  /// First record with `id` in any entry still inside its validity window.
  pub fn find_valid(&self, id: &str) -> Option<T> {
    self
      .entries
      .iter()
      .filter(|entry| entry.is_valid(self.ttl))
      .find_map(|entry| entry.records.iter().find(|r| r.record_id() == id).cloned())
  }

  pub fn replace(&self, key: &str, records: Arc<Vec<T>>) {
    self
      .entries
      .insert(key.to_string(), CacheEntry::new(records));
  }

  pub fn remove(&self, key: &str) -> bool {
    self.entries.remove(key).is_some()
  }

  pub fn clear(&self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Put `record` at the front of the entry for `key`. Returns false if no
  /// entry is loaded for that key.
  pub fn prepend(&self, key: &str, record: T) -> bool {
    let Some(mut entry) = self.entries.get_mut(key) else {
      return false;
    };
    let mut records = Vec::with_capacity(entry.records.len() + 1);
    records.push(record);
    records.extend(entry.records.iter().cloned());
    *entry = entry.with_records(records);
    true
  }

  /// Replace the record with `record`'s id in every entry holding it, at the
  /// same position. Returns how many entries changed.
  pub fn replace_record(&self, record: &T) -> usize {
    let id = record.record_id();
    let mut patched = 0;
    for mut entry in self.entries.iter_mut() {
      let Some(index) = entry.records.iter().position(|r| r.record_id() == id) else {
        continue;
      };
      let mut records: Vec<T> = entry.records.as_ref().clone();
      records[index] = record.clone();
      *entry = entry.with_records(records);
      patched += 1;
    }
    patched
  }

  /// Drop the record with `id` from every entry holding it. Returns how many
  /// entries changed.
  pub fn remove_record(&self, id: &str) -> usize {
    let mut patched = 0;
    for mut entry in self.entries.iter_mut() {
      if !entry.records.iter().any(|r| r.record_id() == id) {
        continue;
      }
      let records: Vec<T> = entry
        .records
        .iter()
        .filter(|r| r.record_id() != id)
        .cloned()
        .collect();
      *entry = entry.with_records(records);
      patched += 1;
    }
    patched
  }
}
