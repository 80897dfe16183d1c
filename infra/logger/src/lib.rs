//! # Logger
//!
//! Console and rolling-file logging for the depot tools.
//! Wraps `tracing-subscriber` behind a typestate builder so a file-only
//! option such as [`LoggerBuilder::json`] cannot be set without a log path.
//!
//! * Console output goes to stderr, leaving stdout to the tool itself.
//! * [`LogConfig`] is a `serde` view of the same settings, meant to be
//!   embedded in an application config file and passed to [`Logger::from_config`].
//! * Use [`LoggerBuilder::env_filter`] to set module-directed filters
//!   (e.g., `"depot_storage=debug,depot=info"`), in addition to `RUST_LOG`.
//!
//! ## Example
//!
//! ```rust
//! # use depot_logger::{Logger, LevelFilter};
//!
//! let _logger = Logger::builder()
//!     .name("depot")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use private::Sealed;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
struct BuilderState {
    console: bool,
    path: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for BuilderState {
    fn default() -> Self {
        Self {
            console: true,
            path: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

/// Deserializable logging settings.
///
/// ```toml
/// [log]
/// level = "debug"
/// path = "/var/log/depot"
/// rotation = "hourly"
/// json = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    pub console: bool,
    /// Directory for rolling log files. No file output when unset.
    pub path: Option<PathBuf>,
    /// One of `minutely`, `hourly`, `daily`, `never`.
    pub rotation: String,
    pub max_files: usize,
    /// JSON lines in the log file. Console output stays human readable.
    pub json: bool,
    pub env_filter: Option<String>,
}

// --- Default ---

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            console: true,
            path: None,
            rotation: "daily".to_owned(),
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    /// Parses [`LogConfig::level`].
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for an unknown level name.
    pub fn level_filter(&self) -> Result<LevelFilter, LoggerError> {
        LevelFilter::from_str(self.level.trim()).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("Invalid level '{}': {e}", self.level).into(),
            context: None,
        })
    }

    /// Parses [`LogConfig::rotation`].
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for an unknown rotation name.
    pub fn rotation(&self) -> Result<Rotation, LoggerError> {
        match self.rotation.trim().to_ascii_lowercase().as_str() {
            "minutely" => Ok(Rotation::MINUTELY),
            "hourly" => Ok(Rotation::HOURLY),
            "daily" => Ok(Rotation::DAILY),
            "never" => Ok(Rotation::NEVER),
            other => Err(LoggerError::InvalidConfiguration {
                message: format!("Invalid rotation '{other}'").into(),
                context: None,
            }),
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);
#[derive(Debug)]
pub struct NoFile;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}
impl Sealed for NoFile {}
impl Sealed for WithFile {}

/// A builder for configuring and initializing the global tracing subscriber.
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = NoFile> {
    state: BuilderState,
    name: N,
    file_state: std::marker::PhantomData<F>,
}

impl<F: Sealed> LoggerBuilder<NoName, F> {
    /// Sets the name of the logger.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName, F> {
        LoggerBuilder { name: WithName(name.into()), state: self.state, file_state: std::marker::PhantomData }
    }
}

impl LoggerBuilder<WithName, WithFile> {
    /// Configures maximum number of log files to keep.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.state.max_files = max;
        self
    }

    /// Configures the log file rotation strategy.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.state.rotation = rotation;
        self
    }

    /// Writes the log file as JSON lines.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self) -> Self {
        self.state.json = true;
        self
    }
}

impl<F: Sealed> LoggerBuilder<WithName, F> {
    /// Configures the minimum log level to be emitted.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.state.level = level;
        self
    }

    /// Adds an explicit env filter (e.g., `depot_storage=debug`).
    ///
    /// Invalid filters will cause [`LoggerBuilder::init`] to return an error.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.state.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.state.console = enabled;
        self
    }

    /// Sets the directory for rolling log files.
    pub fn path(self, path: impl Into<PathBuf>) -> LoggerBuilder<WithName, WithFile> {
        let mut state = self.state;
        state.path = Some(path.into());
        LoggerBuilder { state, name: self.name, file_state: std::marker::PhantomData }
    }

    /// Consumes the builder and initializes the global tracing subscriber.
    ///
    /// # Returns
    /// A [`Logger`] handle. **Note:** This handle contains a [`WorkerGuard`]
    /// that must be kept alive for the duration of the program so that
    /// non-blocking file output is flushed.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber has already been set.
    /// Returns [`LoggerError::InvalidConfiguration`] for invalid builder settings.
    pub fn init(self) -> Result<Logger, LoggerError> {
        validate_state(&self.state, &self.name.0)?;

        let env_filter = build_env_filter(&self.state)?;

        let mut layers = Vec::new();

        if self.state.console {
            layers.push(layer().compact().with_ansi(true).with_writer(std::io::stderr).boxed());
        }

        let guard = if let Some(path) = self.state.path {
            fs::create_dir_all(&path)
                .context(format!("Failed to create path: {}", path.display()))?;

            let file_appender = RollingFileAppender::builder()
                .rotation(self.state.rotation)
                .filename_prefix(&self.name.0)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(self.state.max_files)
                .build(path)?;

            let (non_blocking, g) = tracing_appender::non_blocking(file_appender);

            let file_layer = layer().with_writer(non_blocking).with_ansi(false);

            let boxed = if self.state.json { file_layer.json().boxed() } else { file_layer.boxed() };

            layers.push(boxed);
            Some(g)
        } else {
            None
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled. Enable console or file output.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;

        Ok(Logger { guard })
    }
}

/// A handle to the initialized logging system.
///
/// Holds the background worker guard. Drop it only when the application is
/// shutting down.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Returns a new [`LoggerBuilder`] to configure the global tracing subscriber.
    ///
    /// The `name` is used as the prefix for rolling log files
    /// (e.g., `depot.2026-10-16.log`).
    ///
    /// ```rust
    /// use depot_logger::{LevelFilter, Logger};
    ///
    /// let _logger = Logger::builder()
    ///     .name("depot")
    ///     .level(LevelFilter::DEBUG)
    ///     .init()
    ///     .unwrap();
    /// ```
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { state: BuilderState::default(), name: NoName, file_state: std::marker::PhantomData }
    }

    /// Initializes the global subscriber from deserialized settings.
    ///
    /// # Errors
    /// Any error of [`LoggerBuilder::init`], plus [`LoggerError::InvalidConfiguration`]
    /// when the level or rotation names don't parse.
    pub fn from_config(name: impl Into<String>, config: &LogConfig) -> Result<Self, LoggerError> {
        let mut builder = Self::builder().name(name).level(config.level_filter()?).console(config.console);
        if let Some(filter) = &config.env_filter {
            builder = builder.env_filter(filter.clone());
        }

        match &config.path {
            Some(path) => {
                let mut builder =
                    builder.path(path).max_files(config.max_files).rotation(config.rotation()?);
                if config.json {
                    builder = builder.json();
                }
                builder.init()
            }
            None => builder.init(),
        }
    }

    /// Best-effort synchronization point before shutdown. Buffers are
    /// flushed for real when this handle is dropped.
    pub fn flush(&self) {
        tracing::debug!("Logger flushed");
    }

    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn validate_state(state: &BuilderState, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }

    if state.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }

    Ok(())
}

fn build_env_filter(state: &BuilderState) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(state.level.into());
    state.env_filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::tempdir;

    fn parse(raw: &str) -> LogConfig {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .unwrap()
    }

    #[test]
    fn test_builder_initial_state() {
        let builder = Logger::builder().name("test-app").env_filter("depot=debug");
        assert!(builder.state.console);
        assert_eq!(builder.state.level, LevelFilter::INFO);
        assert_eq!(builder.state.env_filter.as_deref(), Some("depot=debug"));
        assert!(builder.state.path.is_none());
    }

    #[test]
    fn test_builder_file_configuration() {
        let log_dir = PathBuf::from("logs");
        let builder = Logger::builder()
            .name("test-app")
            .console(false)
            .path(log_dir.clone())
            .max_files(5)
            .rotation(Rotation::HOURLY)
            .json()
            .level(LevelFilter::DEBUG);

        assert!(!builder.state.console);
        assert!(builder.state.json);
        assert_eq!(builder.state.level, LevelFilter::DEBUG);
        assert_eq!(builder.state.max_files, 5);
        assert_eq!(builder.state.rotation, Rotation::HOURLY);
        assert_eq!(builder.state.path.as_deref(), Some(log_dir.as_path()));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = Logger::builder().name("  ").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_no_layers_is_rejected() {
        let err = Logger::builder().name("silent").console(false).init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_bad_env_filter_is_rejected() {
        let err = Logger::builder().name("x").env_filter("depot=[").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_config_defaults() {
        let config = parse("");
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.level_filter().unwrap(), LevelFilter::INFO);
        assert_eq!(config.rotation().unwrap(), Rotation::DAILY);
    }

    #[test]
    fn test_config_from_toml() {
        let config = parse(
            r#"
            level = "debug"
            console = false
            path = "/tmp/depot-logs"
            rotation = "Hourly"
            max_files = 3
            json = true
            "#,
        );
        assert_eq!(config.level_filter().unwrap(), LevelFilter::DEBUG);
        assert_eq!(config.rotation().unwrap(), Rotation::HOURLY);
        assert_eq!(config.path.as_deref(), Some(std::path::Path::new("/tmp/depot-logs")));
        assert_eq!(config.max_files, 3);
        assert!(config.json && !config.console);
    }

    #[test]
    fn test_config_rejects_unknown_names() {
        let config = LogConfig { level: "loud".into(), rotation: "yearly".into(), ..LogConfig::default() };
        assert!(matches!(config.level_filter(), Err(LoggerError::InvalidConfiguration { .. })));
        assert!(matches!(config.rotation(), Err(LoggerError::InvalidConfiguration { .. })));
        assert!(Logger::from_config("depot", &config).is_err());
    }

    #[test]
    #[serial]
    fn test_file_logging_from_config() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempdir()?;
        let log_dir = tmp_dir.path().join("logs");
        let config = LogConfig { console: false, path: Some(log_dir.clone()), ..LogConfig::default() };

        let logger = Logger::from_config("test-app", &config)?;
        assert!(logger.guard().is_some());

        tracing::info!("hello world");
        std::thread::sleep(Duration::from_millis(20));
        logger.flush();

        let has_log = fs::read_dir(&log_dir)?
            .flatten()
            .any(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("log"));
        assert!(has_log, "at least one log file should be created");
        Ok(())
    }
}
