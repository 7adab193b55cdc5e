//! Core traits and types for the caching system.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::filter::FilterDescriptor;
use crate::transport::RawRecord;

/// Trait for records that can live in a [`CollectionCache`](super::CollectionCache).
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Opaque source id, unique within the collection (e.g. `recXXXXXXXX`)
  fn record_id(&self) -> &str;

  /// Entity type name used in log output (e.g. "agent", "appointment")
  fn entity_type() -> &'static str;

  /// Client-side filter check, applied after transform.
  ///
  /// Facets that do not apply to the entity should be ignored.
  fn matches(&self, _filter: &FilterDescriptor, _now: DateTime<Utc>) -> bool {
    true
  }
}

/// Normalizes one raw source item into a record.
pub type Transform<T> = Arc<dyn Fn(RawRecord) -> Result<T> + Send + Sync>;

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from a fetch this caller started.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a fetch another caller started.
  pub fn joined(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Joined,
      cached_at: None,
    }
  }

  /// Create a new cache result from a valid entry.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// This caller drove the network fetch
  Network,
  /// Served from a valid cache entry, no network access
  Cache,
  /// Awaited a fetch already in flight for the same key
  Joined,
}

/// Non-fetching view of a cache entry.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
  pub records: Arc<Vec<T>>,
  pub cached_at: DateTime<Utc>,
  /// False once the validity window has passed
  pub is_valid: bool,
}
