//! The network collaborator the cache layer fetches and writes through.
//!
//! The cache never talks HTTP itself; it drives a [`Transport`] one page or
//! one item at a time and leaves timeouts, auth and request shaping to it.

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Result;
use crate::filter::FilterDescriptor;

/// Raw field map as the source stores it.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Re-serialize a value through JSON to convert between compatible types.
pub fn reserialize<T: DeserializeOwned>(value: impl Serialize) -> serde_json::Result<T> {
  serde_json::from_value(serde_json::to_value(value)?)
}

/// Identifies one collection (table) at the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionId(String);

impl CollectionId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CollectionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Opaque continuation token returned after a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// One record as returned by the source, before any transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
  pub id: String,
  #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
  pub created_time: Option<String>,
  #[serde(default)]
  pub fields: Fields,
}

impl RawRecord {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      created_time: None,
      fields: Fields::new(),
    }
  }

  pub fn with_created_time(mut self, created_time: impl Into<String>) -> Self {
    self.created_time = Some(created_time.into());
    self
  }

  pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
    self.fields.insert(name.to_string(), value.into());
    self
  }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
  pub items: Vec<RawRecord>,
  /// Absent when the source has no further pages
  pub next_cursor: Option<Cursor>,
}

impl Page {
  pub fn new(items: Vec<RawRecord>, next_cursor: Option<Cursor>) -> Self {
    Self { items, next_cursor }
  }

  pub fn last(items: Vec<RawRecord>) -> Self {
    Self::new(items, None)
  }
}

/// Source of truth for a set of collections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
  /// Fetch one page. `cursor` is `None` for the first page.
  async fn get_page(
    &self,
    collection: &CollectionId,
    filter: &FilterDescriptor,
    cursor: Option<&Cursor>,
  ) -> Result<Page>;

  /// Read a single record by id. A missing record is a 404 transport error.
  async fn get_item(&self, collection: &CollectionId, id: &str) -> Result<RawRecord>;

  async fn create_item(&self, collection: &CollectionId, fields: &Fields) -> Result<RawRecord>;

  /// Partial update: only the given fields change.
  async fn update_item(
    &self,
    collection: &CollectionId,
    id: &str,
    fields: &Fields,
  ) -> Result<RawRecord>;

  async fn delete_item(&self, collection: &CollectionId, id: &str) -> Result<()>;
}
