//! Field shapes of the CRM base's tables, as Airtable returns them.
//!
//! Every field is optional: Airtable omits empty cells entirely. Lookup
//! fields (linked contact and agent data on appointments) arrive as arrays.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct AgentFields {
  pub agent_name: Option<String>,
  pub agent_surname: Option<String>,
  pub number: Option<Value>,
  pub color: Option<String>,
  #[serde(default)]
  pub appointments: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactFields {
  pub contact_id: Option<Value>,
  pub contact_name: Option<String>,
  pub contact_surname: Option<String>,
  pub contact_email: Option<String>,
  pub contact_phone: Option<Value>,
  pub contact_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFields {
  pub appointment_id: Option<Value>,
  pub appointment_date: Option<String>,
  pub appointment_address: Option<String>,
  #[serde(default)]
  pub contact_id: Vec<String>,
  #[serde(default)]
  pub contact_name: Vec<String>,
  #[serde(default)]
  pub contact_surname: Vec<String>,
  #[serde(default)]
  pub contact_email: Vec<String>,
  #[serde(default)]
  pub contact_phone: Vec<Value>,
  #[serde(default)]
  pub agent_id: Vec<String>,
  #[serde(default)]
  pub agent_name: Vec<String>,
  #[serde(default)]
  pub agent_surname: Vec<String>,
  #[serde(default)]
  pub is_cancelled: bool,
}

/// Text form of a cell that may be typed as a string or a number
/// (phone numbers, autonumber ids).
pub fn text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}
