//! Generic caching layer for collection reads and writes.
//!
//! This module provides an entity-agnostic caching mechanism that:
//! - Serves repeated reads of the same filtered view from memory for a fixed window
//! - Collapses concurrent reads of the same view into one network fetch
//! - Drains cursor-paginated listings completely, up to a page ceiling
//! - Patches loaded views after create, update and delete instead of refetching

mod layer;
mod pages;
mod storage;
mod traits;

pub use layer::{CacheSettings, CollectionCache};
pub use pages::PageLimits;
pub use traits::{CacheResult, CacheSnapshot, CacheSource, Cacheable, Transform};
