//! Airtable transport against a mock HTTP server.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use crmdesk::airtable::AirtableTransport;
use crmdesk::cache::{CacheSource, CollectionCache};
use crmdesk::config::AirtableConfig;
use crmdesk::crm::{Agent, AppointmentInput, ContactInput, CrmClient};
use crmdesk::error::CacheError;
use crmdesk::filter::FilterDescriptor;
use crmdesk::transport::{CollectionId, Cursor, Transport};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const TOKEN: &str = "patTEST";

fn config(server: &ServerGuard) -> AirtableConfig {
  AirtableConfig::new(server.url(), "appTEST")
}

fn transport(server: &ServerGuard) -> AirtableTransport {
  AirtableTransport::new(&config(server), TOKEN).expect("transport")
}

fn agent_record(id: &str, name: &str) -> serde_json::Value {
  json!({
    "id": id,
    "createdTime": "2025-01-01T08:00:00.000Z",
    "fields": { "agent_name": name, "color": "#ff4d4f" }
  })
}

fn appointment_record(id: &str) -> serde_json::Value {
  json!({
    "id": id,
    "createdTime": "2025-01-01T08:00:00.000Z",
    "fields": {
      "appointment_date": "2025-06-01T09:30:00.000Z",
      "appointment_address": "Via Roma 1",
      "contact_id": ["recC1"],
      "agent_id": ["recA1"]
    }
  })
}

#[tokio::test]
async fn test_list_sends_auth_and_paging_parameters() {
  let mut server = Server::new_async().await;
  let mock = server
    .mock("GET", "/appTEST/Appointments")
    .match_header("authorization", "Bearer patTEST")
    .match_query(Matcher::AllOf(vec![
      Matcher::UrlEncoded("pageSize".into(), "100".into()),
      Matcher::UrlEncoded("sort[0][field]".into(), "appointment_date".into()),
      Matcher::UrlEncoded("sort[0][direction]".into(), "desc".into()),
    ]))
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(json!({ "records": [appointment_record("rec1")], "offset": "itr1" }).to_string())
    .create_async()
    .await;

  let page = transport(&server)
    .get_page(
      &CollectionId::new("Appointments"),
      &FilterDescriptor::default(),
      None,
    )
    .await
    .unwrap();

  mock.assert_async().await;
  assert_eq!(page.items.len(), 1);
  assert_eq!(page.items[0].id, "rec1");
  assert_eq!(page.next_cursor, Some(Cursor::new("itr1")));
}

#[tokio::test]
async fn test_cache_drains_offset_cursor_once() {
  let mut server = Server::new_async().await;
  let first = server
    .mock("GET", "/appTEST/Agents")
    .match_query(Matcher::Regex("^pageSize=100$".into()))
    .with_status(200)
    .with_body(
      json!({ "records": [agent_record("recA1", "Marco")], "offset": "itr1" }).to_string(),
    )
    .expect(1)
    .create_async()
    .await;
  let second = server
    .mock("GET", "/appTEST/Agents")
    .match_query(Matcher::UrlEncoded("offset".into(), "itr1".into()))
    .with_status(200)
    .with_body(json!({ "records": [agent_record("recA2", "Luca")] }).to_string())
    .expect(1)
    .create_async()
    .await;

  let cache: CollectionCache<Agent> = CollectionCache::new(
    CollectionId::new("Agents"),
    Arc::new(transport(&server)),
    Arc::new(Agent::from_raw),
  );

  let fetched = cache.fetch_with_source(None).await.unwrap();
  assert_eq!(fetched.source, CacheSource::Network);
  let names: Vec<_> = fetched.data.iter().map(|a| a.name.as_str()).collect();
  assert_eq!(names, vec!["Marco", "Luca"]);

  let again = cache.fetch_with_source(None).await.unwrap();
  assert_eq!(again.source, CacheSource::Cache);
  assert!(Arc::ptr_eq(&fetched.data, &again.data));

  first.assert_async().await;
  second.assert_async().await;
}

#[tokio::test]
async fn test_create_posts_records_wrapper() {
  let mut server = Server::new_async().await;
  let mock = server
    .mock("POST", "/appTEST/Appointments")
    .match_header("content-type", "application/json")
    .match_body(Matcher::Json(json!({
      "records": [{
        "fields": {
          "appointment_date": "2025-06-01T09:30:00Z",
          "appointment_address": "Via Roma 1",
          "contact_id": ["recC1"],
          "agent_id": ["recA1"]
        }
      }]
    })))
    .with_status(200)
    .with_body(json!({ "records": [appointment_record("rec9")] }).to_string())
    .create_async()
    .await;

  let input = AppointmentInput {
    appointment_date: Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()),
    appointment_address: Some("Via Roma 1".to_string()),
    contact_id: Some(vec!["recC1".to_string()]),
    agent_id: Some(vec!["recA1".to_string()]),
    is_cancelled: None,
  };

  let created = transport(&server)
    .create_item(&CollectionId::new("Appointments"), &input.to_fields().unwrap())
    .await
    .unwrap();

  mock.assert_async().await;
  assert_eq!(created.id, "rec9");
}

#[tokio::test]
async fn test_cancel_patches_single_record() {
  let mut server = Server::new_async().await;
  let mut cancelled = appointment_record("rec1");
  cancelled["fields"]["is_cancelled"] = json!(true);
  let mock = server
    .mock("PATCH", "/appTEST/Appointments")
    .match_body(Matcher::Json(json!({
      "records": [{ "id": "rec1", "fields": { "is_cancelled": true } }]
    })))
    .with_status(200)
    .with_body(json!({ "records": [cancelled] }).to_string())
    .create_async()
    .await;

  let client = CrmClient::with_transport(
    Arc::new(transport(&server)),
    &config(&server).tables,
    Default::default(),
  );
  let appointment = client.cancel_appointment("rec1").await.unwrap();

  mock.assert_async().await;
  assert!(appointment.is_cancelled);
}

#[tokio::test]
async fn test_delete_passes_record_id_in_query() {
  let mut server = Server::new_async().await;
  let mock = server
    .mock("DELETE", "/appTEST/Appointments")
    .match_query(Matcher::UrlEncoded("records[]".into(), "rec1".into()))
    .with_status(200)
    .with_body(json!({ "records": [{ "id": "rec1", "deleted": true }] }).to_string())
    .create_async()
    .await;

  transport(&server)
    .delete_item(&CollectionId::new("Appointments"), "rec1")
    .await
    .unwrap();

  mock.assert_async().await;
}

#[tokio::test]
async fn test_error_bodies_become_transport_errors() {
  let mut server = Server::new_async().await;
  server
    .mock("POST", "/appTEST/Contacts")
    .with_status(422)
    .with_body(
      json!({
        "error": {
          "type": "INVALID_VALUE_FOR_COLUMN",
          "message": "Field \"contact_email\" cannot accept the provided value"
        }
      })
      .to_string(),
    )
    .create_async()
    .await;
  server
    .mock("DELETE", "/appTEST/Contacts")
    .match_query(Matcher::Any)
    .with_status(404)
    .with_body(json!({ "error": "NOT_FOUND" }).to_string())
    .create_async()
    .await;

  let transport = transport(&server);
  let contacts = CollectionId::new("Contacts");

  let err = transport
    .create_item(&contacts, &serde_json::Map::new())
    .await
    .unwrap_err();
  assert_eq!(
    err,
    CacheError::Transport {
      status: Some(422),
      message: "Field \"contact_email\" cannot accept the provided value".to_string(),
    }
  );

  let err = transport.delete_item(&contacts, "recX").await.unwrap_err();
  assert_eq!(err.status(), Some(404));
  assert!(err.to_string().contains("NOT_FOUND"));
}

#[tokio::test]
async fn test_empty_error_body_uses_status_reason() {
  let mut server = Server::new_async().await;
  server
    .mock("GET", "/appTEST/Agents")
    .match_query(Matcher::Any)
    .with_status(503)
    .create_async()
    .await;

  let err = transport(&server)
    .get_page(&CollectionId::new("Agents"), &FilterDescriptor::default(), None)
    .await
    .unwrap_err();

  assert_eq!(err.status(), Some(503));
  assert!(err.to_string().contains("Service Unavailable"));
}

fn crm_client(server: &ServerGuard) -> CrmClient {
  CrmClient::with_transport(
    Arc::new(transport(server)),
    &config(server).tables,
    Default::default(),
  )
}

#[tokio::test]
async fn test_get_item_reads_single_record() {
  let mut server = Server::new_async().await;
  let mock = server
    .mock("GET", "/appTEST/Agents/recA1")
    .match_header("authorization", "Bearer patTEST")
    .with_status(200)
    .with_body(agent_record("recA1", "Marco").to_string())
    .create_async()
    .await;

  let record = transport(&server)
    .get_item(&CollectionId::new("Agents"), "recA1")
    .await
    .unwrap();

  mock.assert_async().await;
  assert_eq!(record.id, "recA1");
  assert_eq!(record.fields["agent_name"], json!("Marco"));
}

#[tokio::test]
async fn test_get_item_missing_record_is_404() {
  let mut server = Server::new_async().await;
  server
    .mock("GET", "/appTEST/Contacts/recGone")
    .with_status(404)
    .with_body(json!({ "error": "NOT_FOUND" }).to_string())
    .create_async()
    .await;

  let err = crm_client(&server).get_contact("recGone").await.unwrap_err();
  let err = err.downcast_ref::<CacheError>().expect("cache error");

  assert_eq!(
    err,
    &CacheError::Transport {
      status: Some(404),
      message: "NOT_FOUND".to_string(),
    }
  );
}

#[tokio::test]
async fn test_crm_single_record_reads() {
  let mut server = Server::new_async().await;
  let appointment = server
    .mock("GET", "/appTEST/Appointments/rec1")
    .with_status(200)
    .with_body(appointment_record("rec1").to_string())
    .create_async()
    .await;
  let agent = server
    .mock("GET", "/appTEST/Agents/recA1")
    .with_status(200)
    .with_body(agent_record("recA1", "Marco").to_string())
    .create_async()
    .await;
  let contact = server
    .mock("GET", "/appTEST/Contacts/recC1")
    .with_status(200)
    .with_body(
      json!({
        "id": "recC1",
        "createdTime": "2025-01-01T08:00:00.000Z",
        "fields": { "contact_name": "Giulia", "contact_surname": "Rossi" }
      })
      .to_string(),
    )
    .create_async()
    .await;

  let client = crm_client(&server);

  let apt = client.get_appointment("rec1").await.unwrap();
  assert_eq!(apt.address, "Via Roma 1");
  assert_eq!(apt.agent_ids, vec!["recA1"]);
  assert_eq!(client.get_agent("recA1").await.unwrap().name, "Marco");
  assert_eq!(client.get_contact("recC1").await.unwrap().full_name, "Giulia Rossi");

  appointment.assert_async().await;
  agent.assert_async().await;
  contact.assert_async().await;
}

#[tokio::test]
async fn test_create_contact_posts_fields() {
  let mut server = Server::new_async().await;
  let mock = server
    .mock("POST", "/appTEST/Contacts")
    .match_body(Matcher::Json(json!({
      "records": [{
        "fields": {
          "contact_name": "Giulia",
          "contact_surname": "Rossi",
          "contact_email": "giulia@example.com",
          "contact_phone": "3331234567"
        }
      }]
    })))
    .with_status(200)
    .with_body(
      json!({
        "records": [{
          "id": "recC9",
          "createdTime": "2025-01-01T08:00:00.000Z",
          "fields": {
            "contact_name": "Giulia",
            "contact_surname": "Rossi",
            "contact_email": "giulia@example.com",
            "contact_phone": "3331234567"
          }
        }]
      })
      .to_string(),
    )
    .create_async()
    .await;

  let input = ContactInput {
    contact_name: Some("Giulia".to_string()),
    contact_surname: Some("Rossi".to_string()),
    contact_email: Some("giulia@example.com".to_string()),
    contact_phone: Some("3331234567".to_string()),
    contact_address: None,
  };
  let contact = crm_client(&server).create_contact(&input).await.unwrap();

  mock.assert_async().await;
  assert_eq!(contact.id, "recC9");
  assert_eq!(contact.initials, "GR");
  assert_eq!(contact.phone, "3331234567");
}
