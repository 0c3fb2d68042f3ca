//! Loading frontend configuration from TOML, with environment overrides.
//!
//! See `AppConfig` for the expected schema. Every section is optional.

use std::{collections::HashMap, time::Duration};

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub port: u16,
  pub static_dir: String,
  pub backend: BackendConfig,
  pub storage: StorageConfig,
  /// Display labels for recommendation categories.
  pub labels: CategoryLabels,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: 3000,
      static_dir: "./static".into(),
      backend: BackendConfig::default(),
      storage: StorageConfig::default(),
      labels: CategoryLabels::default(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
  pub base_url: String,
  /// No timeout unless set.
  pub request_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self { base_url: "http://localhost:3005".into(), request_timeout_secs: None }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
  #[default]
  Memory,
  File,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  pub kind: StorageKind,
  pub dir: String,
  /// Sessions not written for this long are removed.
  pub session_ttl_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      kind: StorageKind::Memory,
      dir: "./data/sessions".into(),
      session_ttl_secs: 24 * 60 * 60,
      sweep_interval_secs: 10 * 60,
    }
  }
}

impl StorageConfig {
  pub fn session_ttl(&self) -> Duration {
    Duration::from_secs(self.session_ttl_secs)
  }

  /// Never shorter than one second.
  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

/// Category key → program label. Unknown keys display as themselves.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CategoryLabels(pub HashMap<String, String>);

impl Default for CategoryLabels {
  fn default() -> Self {
    Self(HashMap::from([
      ("TRT".to_string(), "TRT (Testosterone Replacement Therapy)".to_string()),
      ("Build".to_string(), "Build (Muscle Building)".to_string()),
      ("Peptides".to_string(), "Peptides".to_string()),
      ("Lean".to_string(), "Lean (Fat Loss / Lean Body)".to_string()),
      ("GLP1".to_string(), "GLP1 (Glucagon-like Peptide-1)".to_string()),
      ("Tadalafil".to_string(), "Tadalafil (Libido / Erectile Dysfunction)".to_string()),
    ]))
  }
}

impl CategoryLabels {
  pub fn label_for(&self, category: &str) -> String {
    self.0.get(category).cloned().unwrap_or_else(|| category.to_string())
  }
}

impl AppConfig {
  /// Config from INTAKE_CONFIG_PATH (defaults when unset or unreadable),
  /// then PORT / BACKEND_BASE_URL / STORE_DIR overrides.
  pub fn from_env() -> Self {
    let mut cfg = load_config_file_from_env().unwrap_or_default();

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
      cfg.port = port;
    }
    if let Ok(url) = std::env::var("BACKEND_BASE_URL") {
      cfg.backend.base_url = url;
    }
    if let Ok(dir) = std::env::var("STORE_DIR") {
      cfg.storage.kind = StorageKind::File;
      cfg.storage.dir = dir;
    }
    cfg
  }
}

/// Attempt to load `AppConfig` from INTAKE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_file_from_env() -> Option<AppConfig> {
  let path = std::env::var("INTAKE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "intake_frontend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "intake_frontend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "intake_frontend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
