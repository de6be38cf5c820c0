//! Server assembly for the access-request portal: configuration and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use accesos_core::{
  service::Portal,
  workflow::{Workflow, WorkflowConfig},
};
use accesos_store_sqlite::SqliteStore;
use axum::Router;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Environment variables override the file, e.g. `ACCESOS_PORT=9000` or
/// `ACCESOS_WORKFLOW__TECHNICAL_STAGE=true`.
pub const ENV_PREFIX: &str = "ACCESOS";

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub workflow:   WorkflowConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("accesos.db"),
      workflow:   WorkflowConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `ACCESOS_*` variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router over an opened store.
pub fn router(store: SqliteStore, config: &ServerConfig) -> Router {
  let portal = Portal::new(store, Workflow::new(config.workflow.clone()));
  accesos_api::api_router(Arc::new(portal))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
