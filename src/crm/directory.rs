use std::collections::HashMap;

use crate::cache::Cacheable;

use super::types::{Agent, Contact};

/// Default calendar color for agents without one
pub const DEFAULT_AGENT_COLOR: &str = "#1890ff";

/// Id lookup over a fetched list.
#[derive(Debug, Clone)]
pub struct Directory<T> {
  by_id: HashMap<String, T>,
}

impl<T: Cacheable> Directory<T> {
  pub fn new(records: &[T]) -> Self {
    Self {
      by_id: records
        .iter()
        .map(|r| (r.record_id().to_string(), r.clone()))
        .collect(),
    }
  }

  pub fn get(&self, id: &str) -> Option<&T> {
    self.by_id.get(id)
  }

  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }
}

impl Directory<Agent> {
  pub fn color(&self, id: &str) -> &str {
    self
      .get(id)
      .map(|a| a.color.as_str())
      .filter(|c| !c.is_empty())
      .unwrap_or(DEFAULT_AGENT_COLOR)
  }

  pub fn name(&self, id: &str) -> &str {
    self
      .get(id)
      .map(|a| a.name.as_str())
      .unwrap_or("Unknown Agent")
  }
}

impl Directory<Contact> {
  pub fn name(&self, id: &str) -> &str {
    self
      .get(id)
      .map(|c| c.full_name.as_str())
      .unwrap_or("Unknown Contact")
  }

  pub fn email(&self, id: &str) -> &str {
    self.get(id).map(|c| c.email.as_str()).unwrap_or_default()
  }
}
