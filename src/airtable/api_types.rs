//! Serde types matching Airtable REST request and response bodies.

use serde::{Deserialize, Serialize};

use crate::transport::{Fields, RawRecord};

// ============================================================================
// Responses
// ============================================================================

/// `GET /{base}/{table}`
#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub records: Vec<RawRecord>,
  /// Continuation token, absent on the last page
  pub offset: Option<String>,
}

/// `POST` / `PATCH /{base}/{table}`
#[derive(Debug, Deserialize)]
pub struct ApiRecordsResponse {
  #[serde(default)]
  pub records: Vec<RawRecord>,
}

/// Error envelope. Airtable sends either an object or a bare code string.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorDetail {
  Detailed {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
  },
  Code(String),
}

impl ApiErrorDetail {
  pub fn into_message(self) -> Option<String> {
    match self {
      Self::Detailed {
        message: Some(message),
        ..
      } => Some(message),
      Self::Detailed {
        kind: Some(kind), ..
      } => Some(kind),
      Self::Detailed { .. } => None,
      Self::Code(code) => Some(code),
    }
  }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiWriteRequest<'a> {
  pub records: [ApiWriteRecord<'a>; 1],
}

#[derive(Debug, Serialize)]
pub struct ApiWriteRecord<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<&'a str>,
  pub fields: &'a Fields,
}

impl<'a> ApiWriteRequest<'a> {
  pub fn create(fields: &'a Fields) -> Self {
    Self {
      records: [ApiWriteRecord { id: None, fields }],
    }
  }

  pub fn update(id: &'a str, fields: &'a Fields) -> Self {
    Self {
      records: [ApiWriteRecord {
        id: Some(id),
        fields,
      }],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_error_body_shapes() {
    let detailed: ApiErrorBody = serde_json::from_value(json!({
      "error": { "type": "INVALID_REQUEST_UNKNOWN", "message": "Invalid request" }
    }))
    .unwrap();
    assert_eq!(detailed.error.into_message().as_deref(), Some("Invalid request"));

    let code: ApiErrorBody = serde_json::from_value(json!({ "error": "NOT_FOUND" })).unwrap();
    assert_eq!(code.error.into_message().as_deref(), Some("NOT_FOUND"));
  }

  #[test]
  fn test_list_response_offset_optional() {
    let page: ApiListResponse = serde_json::from_value(json!({
      "records": [{ "id": "rec1", "createdTime": "2025-01-02T03:04:05.000Z", "fields": {} }]
    }))
    .unwrap();
    assert_eq!(page.records.len(), 1);
    assert!(page.offset.is_none());
  }

  #[test]
  fn test_update_request_shape() {
    let fields = json!({ "is_cancelled": true }).as_object().cloned().unwrap();
    let body = serde_json::to_value(ApiWriteRequest::update("rec1", &fields)).unwrap();
    assert_eq!(
      body,
      json!({ "records": [{ "id": "rec1", "fields": { "is_cancelled": true } }] })
    );
  }
}
