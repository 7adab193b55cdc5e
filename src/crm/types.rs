use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::transport::{reserialize, Fields};

/// Sales agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
  pub id: String,
  pub number: String,
  pub first_name: String,
  pub last_name: String,
  /// "First Last", trimmed
  pub name: String,
  /// Calendar color, e.g. "#ff4d4f"
  pub color: String,
  pub appointment_ids: Vec<String>,
  pub created_time: DateTime<Utc>,
}

/// Customer contact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
  pub id: String,
  pub contact_id: String,
  pub name: String,
  pub surname: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub full_name: String,
  pub initials: String,
  pub created_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
  Upcoming,
  Completed,
  Cancelled,
}

impl AppointmentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Upcoming => "upcoming",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for AppointmentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Property viewing appointment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
  pub id: String,
  pub appointment_id: Option<String>,
  pub date: Option<DateTime<Utc>>,
  pub address: String,
  pub contact_id: Option<String>,
  pub contact_name: Option<String>,
  pub contact_surname: Option<String>,
  pub contact_email: String,
  pub contact_phone: String,
  pub agent_ids: Vec<String>,
  pub agent_names: Vec<String>,
  pub agent_surnames: Vec<String>,
  pub is_cancelled: bool,
  pub created_time: DateTime<Utc>,
  /// Contact display name
  pub contact: String,
  /// First agent's name, or "Unassigned"
  pub agent: String,
  /// Derived when the record was loaded
  pub status: AppointmentStatus,
}

impl Appointment {
  /// "HH:MM" of the appointment date, empty when undated.
  pub fn time(&self) -> String {
    self
      .date
      .map(|d| d.format("%H:%M").to_string())
      .unwrap_or_default()
  }

  /// Status as of `now`.
  pub fn status_at(&self, now: DateTime<Utc>) -> AppointmentStatus {
    if self.is_cancelled {
      return AppointmentStatus::Cancelled;
    }
    match self.date {
      Some(date) if date < now => AppointmentStatus::Completed,
      _ => AppointmentStatus::Upcoming,
    }
  }
}

/// Write payload for appointments. Unset fields are left unchanged on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub appointment_date: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub appointment_address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_id: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub agent_id: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_cancelled: Option<bool>,
}

impl AppointmentInput {
  /// Payload that only marks the appointment cancelled.
  pub fn cancel() -> Self {
    Self {
      is_cancelled: Some(true),
      ..Self::default()
    }
  }

  pub fn to_fields(&self) -> Result<Fields> {
    Ok(reserialize(self)?)
  }
}

/// Write payload for a new contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_surname: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_address: Option<String>,
}

impl ContactInput {
  pub fn to_fields(&self) -> Result<Fields> {
    Ok(reserialize(self)?)
  }
}
