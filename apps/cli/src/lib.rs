//! # depot CLI
//!
//! A thin front-end over `depot-storage`: it loads an [`AppConfig`], connects
//! the configured decorator chain and runs one [`Command`] against it.

pub mod args;
mod commands;

pub use crate::args::{Cli, Command};
pub use crate::commands::execute;

use anyhow::Context as _;
use depot_logger::LogConfig;
use depot_storage::{DepotConfig, DynStorage, load_config};
use serde::Deserialize;
use std::path::Path;

/// Root of the configuration file.
///
/// ```toml
/// [storage]
/// url = "/srv/depot"
///
/// [storage.cache]
/// url = "/var/cache/depot"
/// max_age_ms = 60000
///
/// [log]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: DepotConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { storage: DepotConfig::default(), log: LogConfig { level: "warn".to_owned(), ..LogConfig::default() } }
    }
}

impl AppConfig {
    /// Reads `path` when given, otherwise starts from defaults.
    ///
    /// # Errors
    /// Fails when the file is missing or malformed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        path.map_or_else(
            || Ok(Self::default()),
            |path| load_config(path).with_context(|| format!("Failed to load {}", path.display())),
        )
    }

    /// Connects the storage chain, honoring a `--url` override.
    ///
    /// # Errors
    /// Invalid locators, remote schemes (which need a connector this tool does not ship),
    /// or a local root that cannot be created.
    pub async fn connect(&self, url: Option<&str>) -> anyhow::Result<DynStorage> {
        let mut storage = self.storage.clone();
        if let Some(url) = url {
            url.clone_into(&mut storage.url);
        }
        storage.connect().await.with_context(|| format!("Failed to open storage '{}'", storage.url))
    }
}
