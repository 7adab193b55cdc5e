use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use color_eyre::eyre::eyre;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::airtable::api_types::{ApiErrorBody, ApiListResponse, ApiRecordsResponse, ApiWriteRequest};
use crate::config::{AirtableConfig, TableConfig};
use crate::error::{CacheError, Result};
use crate::filter::FilterDescriptor;
use crate::transport::{CollectionId, Cursor, Fields, Page, RawRecord, Transport};

/// Airtable REST API transport.
///
/// Lists are read `page_size` records at a time using the `offset` cursor.
/// Filter descriptors are not sent to Airtable; narrowing happens client-side
/// after transform.
#[derive(Clone)]
pub struct AirtableTransport {
  http: reqwest::Client,
  /// `{url}/{base_id}`
  base: Url,
  page_size: u32,
  tables: Arc<HashMap<String, TableConfig>>,
}

impl AirtableTransport {
  pub fn new(config: &AirtableConfig, token: &str) -> color_eyre::Result<Self> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|e| eyre!("Invalid Airtable API token: {}", e))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let mut base =
      Url::parse(&config.url).map_err(|e| eyre!("Invalid Airtable URL {}: {}", config.url, e))?;
    base
      .path_segments_mut()
      .map_err(|_| eyre!("Airtable URL cannot be used as a base: {}", config.url))?
      .pop_if_empty()
      .push(&config.base_id);

    let tables = config
      .tables
      .all()
      .into_iter()
      .map(|t| (t.table.clone(), t.clone()))
      .collect();

    Ok(Self {
      http,
      base,
      page_size: config.page_size.clamp(1, 100),
      tables: Arc::new(tables),
    })
  }

  fn table_url(&self, collection: &CollectionId) -> Url {
    let mut url = self.base.clone();
    // Checked in new(): the base URL always has path segments
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.push(collection.as_str());
    }
    url
  }

  fn record_url(&self, collection: &CollectionId, id: &str) -> Url {
    let mut url = self.table_url(collection);
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.push(id);
    }
    url
  }

  fn list_query(&self, collection: &CollectionId, cursor: Option<&Cursor>) -> Vec<(String, String)> {
    let mut query = vec![("pageSize".to_string(), self.page_size.to_string())];

    if let Some(table) = self.tables.get(collection.as_str()) {
      if let Some(view) = &table.view {
        query.push(("view".to_string(), view.clone()));
      }
      if let Some(field) = &table.sort_field {
        query.push(("sort[0][field]".to_string(), field.clone()));
        query.push((
          "sort[0][direction]".to_string(),
          table.sort_direction.as_str().to_string(),
        ));
      }
    }

    if let Some(cursor) = cursor {
      query.push(("offset".to_string(), cursor.as_str().to_string()));
    }
    query
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response> {
    let request = request.build()?;
    let method = request.method().clone();
    let url = request.url().path().to_string();
    debug!(%method, url = %url, "airtable request");

    let response = self.http.execute(request).await.inspect_err(|e| {
      warn!(%method, url = %url, error = %e, "airtable request failed");
    })?;

    let status = response.status();
    if status.is_success() {
      debug!(%method, url = %url, status = status.as_u16(), "airtable response");
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
      .ok()
      .and_then(|b| b.error.into_message())
      .or_else(|| status.canonical_reason().map(String::from))
      .unwrap_or_else(|| "request failed".to_string());

    warn!(
      %method,
      url = %url,
      status = status.as_u16(),
      reason = %message,
      "airtable error response"
    );
    Err(CacheError::transport(Some(status.as_u16()), message))
  }

  async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
    let response = self.send(request).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
  }

  async fn single_record(&self, request: RequestBuilder) -> Result<RawRecord> {
    let response: ApiRecordsResponse = self.json(request).await?;
    response
      .records
      .into_iter()
      .next()
      .ok_or_else(|| CacheError::Decode("write response contained no records".to_string()))
  }
}

#[async_trait]
impl Transport for AirtableTransport {
  async fn get_page(
    &self,
    collection: &CollectionId,
    _filter: &FilterDescriptor,
    cursor: Option<&Cursor>,
  ) -> Result<Page> {
    let request = self
      .http
      .get(self.table_url(collection))
      .query(&self.list_query(collection, cursor));

    let response: ApiListResponse = self.json(request).await?;
    Ok(Page::new(response.records, response.offset.map(Cursor::new)))
  }

  async fn get_item(&self, collection: &CollectionId, id: &str) -> Result<RawRecord> {
    self
      .json(self.http.get(self.record_url(collection, id)))
      .await
  }

  async fn create_item(&self, collection: &CollectionId, fields: &Fields) -> Result<RawRecord> {
    let request = self
      .http
      .post(self.table_url(collection))
      .json(&ApiWriteRequest::create(fields));
    self.single_record(request).await
  }

  async fn update_item(
    &self,
    collection: &CollectionId,
    id: &str,
    fields: &Fields,
  ) -> Result<RawRecord> {
    let request = self
      .http
      .patch(self.table_url(collection))
      .json(&ApiWriteRequest::update(id, fields));
    self.single_record(request).await
  }

  async fn delete_item(&self, collection: &CollectionId, id: &str) -> Result<()> {
    let request = self
      .http
      .delete(self.table_url(collection))
      .query(&[("records[]", id)]);
    self.send(request).await?;
    Ok(())
  }
}
