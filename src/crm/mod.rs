//! Real-estate CRM domain over the Airtable base: agents, contacts and
//! property-viewing appointments.

mod cache;
mod cached_client;
pub mod dashboard;
pub mod directory;
pub mod fields;
pub mod types;

pub use cached_client::CrmClient;
pub use dashboard::{Dashboard, DashboardStats, RecentAppointment};
pub use directory::Directory;
pub use types::{
  Agent, Appointment, AppointmentInput, AppointmentStatus, Contact, ContactInput,
};
