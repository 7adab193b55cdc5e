//! CRM client over one cache per table.

use std::sync::Arc;

use chrono::NaiveDate;
use color_eyre::Result;

use crate::airtable::AirtableTransport;
use crate::cache::{CacheSettings, CollectionCache};
use crate::config::{Config, TablesConfig};
use crate::filter::FilterDescriptor;
use crate::transport::{CollectionId, Transport};

use super::dashboard::Dashboard;
use super::directory::Directory;
use super::types::{Agent, Appointment, AppointmentInput, Contact, ContactInput};

/// Agents, contacts and appointments, each behind its own
/// [`CollectionCache`] sharing a single transport.
#[derive(Clone)]
pub struct CrmClient {
  agents: CollectionCache<Agent>,
  contacts: CollectionCache<Contact>,
  appointments: CollectionCache<Appointment>,
}

impl CrmClient {
  /// Connect to the configured Airtable base.
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    let transport = AirtableTransport::new(&config.airtable, &token)?;
    Ok(Self::with_transport(
      Arc::new(transport),
      &config.airtable.tables,
      config.cache.settings(),
    ))
  }

  pub fn with_transport(
    transport: Arc<dyn Transport>,
    tables: &TablesConfig,
    settings: CacheSettings,
  ) -> Self {
    Self {
      agents: CollectionCache::with_settings(
        CollectionId::new(&tables.agents.table),
        Arc::clone(&transport),
        Arc::new(Agent::from_raw),
        settings,
      ),
      contacts: CollectionCache::with_settings(
        CollectionId::new(&tables.contacts.table),
        Arc::clone(&transport),
        Arc::new(Contact::from_raw),
        settings,
      ),
      appointments: CollectionCache::with_settings(
        CollectionId::new(&tables.appointments.table),
        transport,
        Arc::new(Appointment::from_raw),
        settings,
      ),
    }
  }

  pub fn agents(&self) -> &CollectionCache<Agent> {
    &self.agents
  }

  pub fn contacts(&self) -> &CollectionCache<Contact> {
    &self.contacts
  }

  pub fn appointments(&self) -> &CollectionCache<Appointment> {
    &self.appointments
  }

  pub async fn list_agents(&self, filter: Option<&FilterDescriptor>) -> Result<Arc<Vec<Agent>>> {
    Ok(self.agents.fetch(filter).await?)
  }

  pub async fn list_contacts(
    &self,
    filter: Option<&FilterDescriptor>,
  ) -> Result<Arc<Vec<Contact>>> {
    Ok(self.contacts.fetch(filter).await?)
  }

  pub async fn list_appointments(
    &self,
    filter: Option<&FilterDescriptor>,
  ) -> Result<Arc<Vec<Appointment>>> {
    Ok(self.appointments.fetch(filter).await?)
  }

  pub async fn get_agent(&self, id: &str) -> Result<Agent> {
    Ok(self.agents.get(id).await?)
  }

  pub async fn get_contact(&self, id: &str) -> Result<Contact> {
    Ok(self.contacts.get(id).await?)
  }

  pub async fn get_appointment(&self, id: &str) -> Result<Appointment> {
    Ok(self.appointments.get(id).await?)
  }

  pub async fn agent_directory(&self) -> Result<Directory<Agent>> {
    Ok(Directory::new(&self.agents.fetch(None).await?))
  }

  pub async fn contact_directory(&self) -> Result<Directory<Contact>> {
    Ok(Directory::new(&self.contacts.fetch(None).await?))
  }

  pub async fn create_contact(&self, input: &ContactInput) -> Result<Contact> {
    Ok(self.contacts.create(&input.to_fields()?).await?)
  }

  pub async fn create_appointment(&self, input: &AppointmentInput) -> Result<Appointment> {
    Ok(self.appointments.create(&input.to_fields()?).await?)
  }

  pub async fn update_appointment(
    &self,
    id: &str,
    input: &AppointmentInput,
  ) -> Result<Appointment> {
    Ok(self.appointments.update(id, &input.to_fields()?).await?)
  }

  /// Mark an appointment cancelled; the record is kept.
  pub async fn cancel_appointment(&self, id: &str) -> Result<Appointment> {
    self.update_appointment(id, &AppointmentInput::cancel()).await
  }

  pub async fn delete_appointment(&self, id: &str) -> Result<()> {
    Ok(self.appointments.delete(id).await?)
  }

  /// Load all three tables concurrently and summarize them for `today`.
  pub async fn load_dashboard(&self, today: NaiveDate) -> Result<Dashboard> {
    let (appointments, agents, contacts) = tokio::try_join!(
      self.appointments.fetch(None),
      self.agents.fetch(None),
      self.contacts.fetch(None),
    )?;
    Ok(Dashboard::compute(&appointments, &agents, &contacts, today))
  }

  /// Drop every cached entry of every table.
  pub fn invalidate_all(&self) {
    self.agents.invalidate(None);
    self.contacts.invalidate(None);
    self.appointments.invalidate(None);
  }
}
