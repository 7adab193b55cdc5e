//! Summary figures for the landing page.

use chrono::NaiveDate;
use serde::Serialize;

use super::directory::DEFAULT_AGENT_COLOR;
use super::types::{Agent, Appointment, AppointmentStatus, Contact};

const RECENT_LIMIT: usize = 5;
const SERVICE_LABEL: &str = "Property Viewing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
  pub today_appointments: usize,
  pub total_contacts: usize,
  pub active_agents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentAppointment {
  pub id: String,
  pub contact_name: String,
  pub initials: String,
  /// Color of the first listed agent assigned to the appointment
  pub color: String,
  pub time: String,
  pub service: String,
  pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
  pub stats: DashboardStats,
  pub recent: Vec<RecentAppointment>,
}

impl Dashboard {
  /// Build the summary. `appointments` is expected newest first, as the
  /// source sorts it; `today` is compared against appointment dates in UTC.
  pub fn compute(
    appointments: &[Appointment],
    agents: &[Agent],
    contacts: &[Contact],
    today: NaiveDate,
  ) -> Self {
    let today_appointments = appointments
      .iter()
      .filter(|a| a.date.is_some_and(|d| d.date_naive() == today))
      .count();

    let recent = appointments
      .iter()
      .take(RECENT_LIMIT)
      .map(|apt| {
        let contact_name = if apt.contact.is_empty() {
          "Unknown".to_string()
        } else {
          apt.contact.clone()
        };
        let color = agents
          .iter()
          .find(|agent| apt.agent_ids.contains(&agent.id))
          .map(|agent| agent.color.clone())
          .filter(|c| !c.is_empty())
          .unwrap_or_else(|| DEFAULT_AGENT_COLOR.to_string());

        RecentAppointment {
          id: apt.id.clone(),
          initials: initials(&contact_name),
          contact_name,
          color,
          time: apt.time(),
          service: SERVICE_LABEL.to_string(),
          status: apt.status,
        }
      })
      .collect();

    Self {
      stats: DashboardStats {
        today_appointments,
        total_contacts: contacts.len(),
        active_agents: agents.len(),
      },
      recent,
    }
  }
}

/// Up to two uppercase initials from a display name.
fn initials(name: &str) -> String {
  name
    .split_whitespace()
    .filter_map(|word| word.chars().next())
    .flat_map(char::to_uppercase)
    .take(2)
    .collect()
}
