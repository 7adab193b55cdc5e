//! Caching implementations for CRM types: transforms from raw Airtable
//! records and client-side filter matching.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;

use crate::cache::Cacheable;
use crate::error::{CacheError, Result};
use crate::filter::FilterDescriptor;
use crate::transport::RawRecord;

use super::fields::{text, AgentFields, AppointmentFields, ContactFields};
use super::types::{Agent, Appointment, AppointmentStatus, Contact};

// ============================================================================
// Transforms
// ============================================================================

impl Agent {
  pub fn from_raw(raw: RawRecord) -> Result<Self> {
    let created_time = created_time(&raw)?;
    let fields: AgentFields = parse_fields(&raw)?;

    let first_name = fields.agent_name.unwrap_or_default();
    let last_name = fields.agent_surname.unwrap_or_default();
    Ok(Self {
      name: join_name(&first_name, &last_name),
      id: raw.id,
      number: fields.number.as_ref().and_then(text).unwrap_or_default(),
      first_name,
      last_name,
      color: fields.color.unwrap_or_default(),
      appointment_ids: fields.appointments,
      created_time,
    })
  }
}

impl Contact {
  pub fn from_raw(raw: RawRecord) -> Result<Self> {
    let created_time = created_time(&raw)?;
    let fields: ContactFields = parse_fields(&raw)?;

    let name = fields.contact_name.unwrap_or_default();
    let surname = fields.contact_surname.unwrap_or_default();
    let initials = [&name, &surname]
      .iter()
      .filter_map(|part| part.chars().next())
      .collect::<String>()
      .to_uppercase();

    Ok(Self {
      full_name: join_name(&name, &surname),
      initials,
      id: raw.id,
      contact_id: fields.contact_id.as_ref().and_then(text).unwrap_or_default(),
      name,
      surname,
      email: fields.contact_email.unwrap_or_default(),
      phone: fields.contact_phone.as_ref().and_then(text).unwrap_or_default(),
      address: fields.contact_address.unwrap_or_default(),
      created_time,
    })
  }
}

impl Appointment {
  /// Transform with the status evaluated against the current time.
  pub fn from_raw(raw: RawRecord) -> Result<Self> {
    Self::from_raw_at(raw, Utc::now())
  }

  pub fn from_raw_at(raw: RawRecord, now: DateTime<Utc>) -> Result<Self> {
    let created_time = created_time(&raw)?;
    let fields: AppointmentFields = parse_fields(&raw)?;

    let date = fields
      .appointment_date
      .as_deref()
      .filter(|d| !d.is_empty())
      .map(|d| {
        parse_timestamp(d).ok_or_else(|| {
          CacheError::transform(&raw.id, format!("invalid appointment_date '{}'", d))
        })
      })
      .transpose()?;

    let contact_name = fields.contact_name.into_iter().next();
    let contact_surname = fields.contact_surname.into_iter().next();
    let contact = join_name(
      contact_name.as_deref().unwrap_or_default(),
      contact_surname.as_deref().unwrap_or_default(),
    );
    let agent = fields
      .agent_name
      .first()
      .cloned()
      .unwrap_or_else(|| "Unassigned".to_string());

    let mut appointment = Self {
      id: raw.id,
      appointment_id: fields.appointment_id.as_ref().and_then(text),
      date,
      address: fields.appointment_address.unwrap_or_default(),
      contact_id: fields.contact_id.into_iter().next(),
      contact_name,
      contact_surname,
      contact_email: fields.contact_email.into_iter().next().unwrap_or_default(),
      contact_phone: fields.contact_phone.first().and_then(text).unwrap_or_default(),
      agent_ids: fields.agent_id,
      agent_names: fields.agent_name,
      agent_surnames: fields.agent_surname,
      is_cancelled: fields.is_cancelled,
      created_time,
      contact,
      agent,
      status: AppointmentStatus::Upcoming,
    };
    appointment.status = appointment.status_at(now);
    Ok(appointment)
  }
}

fn parse_fields<T: DeserializeOwned>(raw: &RawRecord) -> Result<T> {
  serde_json::from_value(serde_json::Value::Object(raw.fields.clone()))
    .map_err(|e| CacheError::transform(&raw.id, e.to_string()))
}

fn created_time(raw: &RawRecord) -> Result<DateTime<Utc>> {
  let value = raw
    .created_time
    .as_deref()
    .ok_or_else(|| CacheError::transform(&raw.id, "missing createdTime"))?;
  parse_timestamp(value)
    .ok_or_else(|| CacheError::transform(&raw.id, format!("invalid createdTime '{}'", value)))
}

/// RFC 3339 timestamp, or a bare date taken as midnight UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
  if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
    return Some(ts.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

fn join_name(first: &str, last: &str) -> String {
  format!("{} {}", first, last).trim().to_string()
}

fn contains(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(needle)
}

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Agent {
  fn record_id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "agent"
  }

  fn matches(&self, filter: &FilterDescriptor, _now: DateTime<Utc>) -> bool {
    match filter.search_term() {
      Some(term) => contains(&self.name, &term) || contains(&self.number, &term),
      None => true,
    }
  }
}

impl Cacheable for Contact {
  fn record_id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "contact"
  }

  fn matches(&self, filter: &FilterDescriptor, _now: DateTime<Utc>) -> bool {
    match filter.search_term() {
      Some(term) => [&self.name, &self.surname, &self.email, &self.full_name]
        .iter()
        .any(|field| contains(field, &term)),
      None => true,
    }
  }
}

impl Cacheable for Appointment {
  fn record_id(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "appointment"
  }

  fn matches(&self, filter: &FilterDescriptor, now: DateTime<Utc>) -> bool {
    let filter = filter.normalized();

    if let Some(term) = &filter.search {
      let hit = [
        &self.contact,
        &self.contact_email,
        &self.contact_phone,
        &self.address,
      ]
      .iter()
      .any(|field| contains(field, term));
      if !hit {
        return false;
      }
    }

    if let Some(status) = &filter.status {
      let keep = match status.as_str() {
        "cancelled" => self.is_cancelled,
        "upcoming" => !self.is_cancelled && self.date.is_some_and(|d| d > now),
        "completed" => !self.is_cancelled && self.date.is_some_and(|d| d <= now),
        _ => false,
      };
      if !keep {
        return false;
      }
    }

    if !filter.owner_ids.is_empty()
      && !self.agent_ids.iter().any(|id| filter.owner_ids.contains(id))
    {
      return false;
    }

    if let Some(range) = filter.date_range {
      if !self.date.is_some_and(|d| range.contains(d)) {
        return false;
      }
    }

    true
  }
}
