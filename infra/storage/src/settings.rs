//! File and environment driven configuration.

use crate::builder::{DepotBuilder, Locator, WithUrl};
use crate::cache::CacheOptions;
use crate::error::{Result, StorageErrorExt};
use crate::storage::DynStorage;
use crate::walk::DEFAULT_WALK_CONCURRENCY;
use crate::wrappers::Timeouts;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Prefix of environment overrides, e.g. `DEPOT__STORAGE__URL`.
pub const ENV_PREFIX: &str = "DEPOT";

/// Storage section of a configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    /// Backend locator, see [`Locator`].
    pub url: String,
    pub prefix: Option<String>,
    pub cache: Option<CacheConfig>,
    pub timeout: Option<TimeoutConfig>,
    pub walk: WalkConfig,
    /// Name used by the log decorator; `None` disables it.
    pub log_calls: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub url: String,
    pub max_age_ms: u64,
    pub treat_unknown_age_as_expired: bool,
    pub no_data: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub read_ms: u64,
    pub write_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    pub concurrency: usize,
}

impl CacheConfig {
    #[must_use]
    pub const fn options(&self) -> CacheOptions {
        CacheOptions {
            max_age: Duration::from_millis(self.max_age_ms),
            treat_unknown_age_as_expired: self.treat_unknown_age_as_expired,
            no_data: self.no_data,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        Timeouts { read: Duration::from_millis(self.read_ms), write: Duration::from_millis(self.write_ms) }
    }
}

impl DepotConfig {
    /// Turns the configuration into a [`DepotBuilder`] ready to connect.
    ///
    /// Remote URLs still need a connector and credentials on the returned builder.
    ///
    /// # Errors
    /// [`crate::StorageError::InvalidUrl`] if either URL cannot be parsed.
    pub fn builder(&self) -> Result<DepotBuilder<WithUrl>> {
        let mut builder = DepotBuilder::new().url(&self.url)?;
        if let Some(prefix) = &self.prefix {
            builder = builder.prefix(prefix.clone());
        }
        if let Some(cache) = &self.cache {
            builder = builder.cache(Locator::parse(&cache.url)?, cache.options());
        }
        if let Some(timeout) = &self.timeout {
            builder = builder.timeouts(timeout.timeouts());
        }
        if let Some(name) = &self.log_calls {
            builder = builder.log(name.clone());
        }
        Ok(builder)
    }

    /// Connects a backend that needs no remote connector.
    ///
    /// # Errors
    /// See [`DepotConfig::builder`] and [`DepotBuilder::connect`].
    pub async fn connect(&self) -> Result<DynStorage> {
        self.builder()?.connect().await
    }
}

/// Loads `T` from a required file, then overlays `DEPOT__*` environment variables.
///
/// Nested keys use a double underscore: `DEPOT__STORAGE__CACHE__MAX_AGE_MS`
/// maps to `storage.cache.max_age_ms`.
///
/// # Errors
/// [`crate::StorageError::Config`] if the file is missing or does not match `T`.
pub fn load_config<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    info!(path = %path.display(), "Loading config");

    Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

// --- Default ---

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            url: ".".to_owned(),
            prefix: None,
            cache: None,
            timeout: None,
            walk: WalkConfig::default(),
            log_calls: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { url: "mem://".to_owned(), max_age_ms: 0, treat_unknown_age_as_expired: false, no_data: false }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_WALK_CONCURRENCY }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(raw: &str) -> DepotConfig {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = DepotConfig::default();
        assert_eq!(cfg.url, ".");
        assert!(cfg.cache.is_none());
        assert_eq!(cfg.walk.concurrency, 8);
    }

    #[test]
    fn nested_sections_deserialize() {
        let cfg = from_toml(
            r#"
            url = "gs://bucket"
            prefix = "tenant/"

            [cache]
            url = "/var/cache/depot"
            max_age_ms = 1500
            treat_unknown_age_as_expired = true

            [timeout]
            read_ms = 250
            "#,
        );

        assert_eq!(cfg.prefix.as_deref(), Some("tenant/"));
        let cache = cfg.cache.unwrap().options();
        assert_eq!(cache.max_age, Duration::from_millis(1500));
        assert!(cache.treat_unknown_age_as_expired);
        assert!(!cache.no_data);
        assert_eq!(cfg.timeout.unwrap().timeouts().write, Duration::ZERO);
        assert_eq!(cfg.walk.concurrency, DEFAULT_WALK_CONCURRENCY);
    }

    #[test]
    fn bad_cache_url_is_rejected() {
        let cfg = from_toml(
            r#"
            url = "mem://"
            [cache]
            url = "gs://"
            "#,
        );
        assert!(cfg.builder().is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_config::<DepotConfig>("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, crate::StorageError::Config { .. }));
    }
}
