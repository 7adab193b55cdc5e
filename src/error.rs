//! Error types for the data access layer.

use thiserror::Error;

/// Errors surfaced by [`CollectionCache`](crate::cache::CollectionCache) and
/// its [`Transport`](crate::transport::Transport).
///
/// The type is `Clone` so a single failed flight can hand the same error to
/// every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
  /// Network or HTTP failure reported by the transport.
  #[error("transport error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
  Transport {
    status: Option<u16>,
    message: String,
  },

  /// A raw record could not be normalized into its entity type.
  #[error("failed to transform record {record_id}: {message}")]
  Transform { record_id: String, message: String },

  /// The source answered, but the body was not what the transport expected.
  #[error("unexpected response: {0}")]
  Decode(String),

  /// Page draining hit its ceiling before the source stopped returning cursors.
  #[error("collection {collection} exceeded the page limit after {pages} pages ({items} items)")]
  PageLimitExceeded {
    collection: String,
    pages: usize,
    items: usize,
  },

  /// The task driving a shared fetch panicked or was cancelled by the runtime.
  #[error("fetch aborted: {0}")]
  FlightAborted(String),
}

impl CacheError {
  /// Shorthand for a transport failure.
  pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
    Self::Transport {
      status,
      message: message.into(),
    }
  }

  /// Shorthand for a transform failure on the given record.
  pub fn transform(record_id: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Transform {
      record_id: record_id.into(),
      message: message.into(),
    }
  }

  /// HTTP status, when the failure came from a response.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Transport { status, .. } => *status,
      _ => None,
    }
  }
}

impl From<reqwest::Error> for CacheError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return Self::Decode(err.to_string());
    }
    Self::Transport {
      status: err.status().map(|s| s.as_u16()),
      message: err.to_string(),
    }
  }
}

impl From<serde_json::Error> for CacheError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transport_display_includes_status() {
    let err = CacheError::transport(Some(429), "rate limited");
    assert_eq!(err.to_string(), "transport error (429): rate limited");
    assert_eq!(err.status(), Some(429));
  }

  #[test]
  fn test_transport_display_without_status() {
    let err = CacheError::transport(None, "connection reset");
    assert_eq!(err.to_string(), "transport error: connection reset");
    assert_eq!(err.status(), None);
  }
}
