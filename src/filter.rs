//! Filter descriptors, their cache keys, and client-side page slicing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl DateRange {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    at >= self.start && at <= self.end
  }
}

/// Value object describing a filtered view of a collection.
///
/// Descriptors that are equal after [`normalized`](Self::normalized) map to
/// the same cache key. The default descriptor is the unfiltered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterDescriptor {
  /// Free-text search, matched case-insensitively by each entity type
  pub search: Option<String>,
  /// Entity-specific status; `"all"` means no status filter
  pub status: Option<String>,
  /// Owner (agent) record ids; a record matches if it is linked to any of them
  #[serde(default)]
  pub owner_ids: BTreeSet<String>,
  pub date_range: Option<DateRange>,
}

impl FilterDescriptor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    self.search = Some(search.into());
    self
  }

  pub fn with_status(mut self, status: impl Into<String>) -> Self {
    self.status = Some(status.into());
    self
  }

  pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
    self.owner_ids.insert(owner_id.into());
    self
  }

  pub fn with_date_range(mut self, range: DateRange) -> Self {
    self.date_range = Some(range);
    self
  }

  /// Canonical form: search trimmed and lower-cased, status lower-cased,
  /// empty values and `"all"` status dropped.
  pub fn normalized(&self) -> Self {
    let search = self
      .search
      .as_deref()
      .map(|s| s.trim().to_lowercase())
      .filter(|s| !s.is_empty());
    let status = self
      .status
      .as_deref()
      .map(|s| s.trim().to_lowercase())
      .filter(|s| !s.is_empty() && s != "all");
    let owner_ids = self
      .owner_ids
      .iter()
      .map(|id| id.trim())
      .filter(|id| !id.is_empty())
      .map(String::from)
      .collect();

    Self {
      search,
      status,
      owner_ids,
      date_range: self.date_range,
    }
  }

  /// True when the descriptor selects the unfiltered view.
  pub fn is_default(&self) -> bool {
    self.normalized() == Self::default()
  }

  /// Normalized search term, if any.
  pub fn search_term(&self) -> Option<String> {
    self.normalized().search
  }

  /// Normalized status, if any.
  pub fn status_value(&self) -> Option<String> {
    self.normalized().status
  }

  /// Stable cache key for this descriptor.
  pub fn cache_key(&self) -> String {
    let input = self.canonical();

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Human-readable form used in logs.
  pub fn description(&self) -> String {
    if self.is_default() {
      return "all records".to_string();
    }
    self.canonical()
  }

  fn canonical(&self) -> String {
    let n = self.normalized();
    let search = n.search.unwrap_or_default();
    let status = n.status.unwrap_or_default();
    // Length-prefixed so separators inside values cannot collide
    let owners = n
      .owner_ids
      .iter()
      .map(|o| format!("{}:{}", o.len(), o))
      .collect::<Vec<_>>()
      .join(",");
    let range = n
      .date_range
      .map(|r| format!("{}..{}", r.start.to_rfc3339(), r.end.to_rfc3339()))
      .unwrap_or_default();

    format!(
      "search:{}:{}|status:{}:{}|owners:{}|range:{}",
      search.len(),
      search,
      status.len(),
      status,
      owners,
      range,
    )
  }
}

/// 1-based client-side pagination over an already fetched list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  pub page: usize,
  pub page_size: usize,
}

impl Default for Pagination {
  fn default() -> Self {
    Self {
      page: 1,
      page_size: 10,
    }
  }
}

impl Pagination {
  pub fn new(page: usize, page_size: usize) -> Self {
    Self {
      page: page.max(1),
      page_size: page_size.max(1),
    }
  }

  /// The records on the current page. Out-of-range pages are empty.
  pub fn slice<'a, T>(&self, records: &'a [T]) -> &'a [T] {
    let start = (self.page.max(1) - 1).saturating_mul(self.page_size);
    if start >= records.len() {
      return &[];
    }
    let end = start.saturating_add(self.page_size).min(records.len());
    &records[start..end]
  }

  pub fn total_pages(&self, total: usize) -> usize {
    total.div_ceil(self.page_size.max(1))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_equal_filters_share_key() {
    let a = FilterDescriptor::new()
      .with_search("Rossi")
      .with_owner("recB")
      .with_owner("recA");
    let b = FilterDescriptor::new()
      .with_owner("recA")
      .with_owner("recB")
      .with_search("  rossi ");
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_different_filters_differ() {
    let open = FilterDescriptor::new().with_status("open");
    let closed = FilterDescriptor::new().with_status("closed");
    assert_ne!(open.cache_key(), closed.cache_key());
    assert_ne!(open.cache_key(), FilterDescriptor::default().cache_key());
  }

  #[test]
  fn test_all_status_is_default_view() {
    let filter = FilterDescriptor::new().with_status("All").with_search("   ");
    assert!(filter.is_default());
    assert_eq!(filter.cache_key(), FilterDescriptor::default().cache_key());
  }

  #[test]
  fn test_key_has_no_separator_collisions() {
    let a = FilterDescriptor::new().with_owner("a,b");
    let b = FilterDescriptor::new().with_owner("a").with_owner("b");
    assert_ne!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_date_range_is_inclusive() {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
    let range = DateRange::new(start, end);
    assert!(range.contains(start));
    assert!(range.contains(end));
    assert!(!range.contains(end + chrono::Duration::seconds(1)));
  }

  #[test]
  fn test_pagination_slices() {
    let items: Vec<u32> = (1..=25).collect();
    let pages = Pagination::new(3, 10);
    assert_eq!(pages.slice(&items), &[21, 22, 23, 24, 25]);
    assert_eq!(pages.total_pages(items.len()), 3);

    let past_end = Pagination::new(4, 10);
    assert!(past_end.slice(&items).is_empty());
  }

  #[test]
  fn test_pagination_clamps_zero_page() {
    let items = [1, 2, 3];
    let pages = Pagination::new(0, 2);
    assert_eq!(pages.page, 1);
    assert_eq!(pages.slice(&items), &[1, 2]);
  }
}
