use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheSettings, PageLimits};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub airtable: AirtableConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtableConfig {
  /// REST API root, without the base id
  #[serde(default = "default_api_url")]
  pub url: String,
  pub base_id: String,
  /// Per-request timeout; the cache layer enforces none of its own
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Records per page, 100 is the Airtable maximum
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  #[serde(default)]
  pub tables: TablesConfig,
}

impl AirtableConfig {
  /// Minimal config pointing at `url`, with default tables.
  pub fn new(url: impl Into<String>, base_id: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      base_id: base_id.into(),
      timeout_secs: default_timeout_secs(),
      page_size: default_page_size(),
      tables: TablesConfig::default(),
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
  #[serde(default = "default_agents_table")]
  pub agents: TableConfig,
  #[serde(default = "default_contacts_table")]
  pub contacts: TableConfig,
  #[serde(default = "default_appointments_table")]
  pub appointments: TableConfig,
}

impl Default for TablesConfig {
  fn default() -> Self {
    Self {
      agents: default_agents_table(),
      contacts: default_contacts_table(),
      appointments: default_appointments_table(),
    }
  }
}

impl TablesConfig {
  pub fn all(&self) -> [&TableConfig; 3] {
    [&self.agents, &self.contacts, &self.appointments]
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableConfig {
  /// Table name or id (e.g. "Agents" or "tblXXXXXXXX")
  pub table: String,
  /// Optional Airtable view to list through
  pub view: Option<String>,
  pub sort_field: Option<String>,
  #[serde(default)]
  pub sort_direction: SortDirection,
}

impl TableConfig {
  pub fn named(table: impl Into<String>) -> Self {
    Self {
      table: table.into(),
      view: None,
      sort_field: None,
      sort_direction: SortDirection::default(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

impl SortDirection {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Asc => "asc",
      Self::Desc => "desc",
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Validity window for fetched lists
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  /// Ceiling on pages drained per fetch
  #[serde(default = "default_max_pages")]
  pub max_pages: usize,
  pub max_items: Option<usize>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
      max_pages: default_max_pages(),
      max_items: None,
    }
  }
}

impl CacheConfig {
  pub fn settings(&self) -> CacheSettings {
    CacheSettings {
      ttl: Duration::from_secs(self.ttl_secs),
      limits: PageLimits {
        max_pages: self.max_pages.max(1),
        max_items: self.max_items,
      },
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default level when RUST_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_api_url() -> String {
  "https://api.airtable.com/v0".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_page_size() -> u32 {
  100
}

fn default_ttl_secs() -> u64 {
  5 * 60
}

fn default_max_pages() -> usize {
  100
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_agents_table() -> TableConfig {
  TableConfig::named("Agents")
}

fn default_contacts_table() -> TableConfig {
  TableConfig::named("Contacts")
}

fn default_appointments_table() -> TableConfig {
  TableConfig {
    sort_field: Some("appointment_date".to_string()),
    sort_direction: SortDirection::Desc,
    ..TableConfig::named("Appointments")
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./crmdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/crmdesk/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/crmdesk/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("crmdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("crmdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.airtable.base_id.trim().is_empty() {
      return Err(eyre!("airtable.base_id must not be empty"));
    }
    Ok(config)
  }

  /// Get the Airtable API token from environment variables.
  ///
  /// Checks CRMDESK_AIRTABLE_TOKEN first, then AIRTABLE_API_KEY as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("CRMDESK_AIRTABLE_TOKEN")
      .or_else(|_| std::env::var("AIRTABLE_API_KEY"))
      .map_err(|_| {
        eyre!(
          "Airtable API token not found. Set CRMDESK_AIRTABLE_TOKEN or AIRTABLE_API_KEY environment variable."
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("airtable:\n  base_id: appTEST\n").unwrap();

    assert_eq!(config.airtable.url, "https://api.airtable.com/v0");
    assert_eq!(config.airtable.page_size, 100);
    assert_eq!(config.airtable.timeout(), Duration::from_secs(10));
    assert_eq!(config.airtable.tables.agents.table, "Agents");
    assert_eq!(
      config.airtable.tables.appointments.sort_field.as_deref(),
      Some("appointment_date")
    );
    assert_eq!(
      config.airtable.tables.appointments.sort_direction,
      SortDirection::Desc
    );

    let settings = config.cache.settings();
    assert_eq!(settings.ttl, Duration::from_secs(300));
    assert_eq!(settings.limits.max_pages, 100);
    assert_eq!(config.logging.level, "info");
  }

  #[test]
  fn test_partial_tables_override() {
    let yaml = r#"
airtable:
  base_id: appTEST
  tables:
    contacts:
      table: tblContacts
      view: Active
cache:
  ttl_secs: 60
  max_pages: 5
  max_items: 400
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.airtable.tables.contacts.table, "tblContacts");
    assert_eq!(config.airtable.tables.contacts.view.as_deref(), Some("Active"));
    assert_eq!(config.airtable.tables.agents.table, "Agents");

    let settings = config.cache.settings();
    assert_eq!(settings.ttl, Duration::from_secs(60));
    assert_eq!(settings.limits.max_pages, 5);
    assert_eq!(settings.limits.max_items, Some(400));
  }

  #[test]
  fn test_example_config_parses() {
    let config = Config::from_yaml(include_str!("../config.example.yaml")).unwrap();
    assert_eq!(config.airtable.base_id, "appXXXXXXXXXXXXXX");
    assert_eq!(config.cache.ttl_secs, 300);
    assert_eq!(config.logging.file, None);
  }

  #[test]
  fn test_empty_base_id_rejected() {
    assert!(Config::from_yaml("airtable:\n  base_id: \"\"\n").is_err());
  }
}
