use super::{LocalInner, LocalStorage, maintenance};
use crate::error::{Result, StorageErrorExt};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone)]
struct LocalOptions {
    create_root: bool,
    /// `None` keeps abandoned write files.
    stale_after: Option<Duration>,
    durable: bool,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self { create_root: true, stale_after: Some(maintenance::STALE_AFTER), durable: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

/// Typestate builder for [`LocalStorage`]; a root must be chosen before connecting.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct LocalStorageBuilder<S: Sealed = NoRoot> {
    root: S,
    options: LocalOptions,
}

#[allow(private_bounds)]
impl<S: Sealed> LocalStorageBuilder<S> {
    /// Whether a missing root directory is created on connect (default `true`).
    #[must_use = "The builder must be connected to open the local storage"]
    pub const fn create_root(mut self, enable: bool) -> Self {
        self.options.create_root = enable;
        self
    }

    /// Age after which write files left behind by a crashed process are deleted
    /// on connect. Five minutes by default.
    #[must_use = "The builder must be connected to open the local storage"]
    pub const fn stale_after(mut self, age: Duration) -> Self {
        self.options.stale_after = Some(age);
        self
    }

    /// Leaves abandoned write files in place.
    #[must_use = "The builder must be connected to open the local storage"]
    pub const fn keep_abandoned_writes(mut self) -> Self {
        self.options.stale_after = None;
        self
    }

    /// Whether commits fsync the file and its directory before returning
    /// (default `true`). Disabling trades crash safety for latency.
    #[must_use = "The builder must be connected to open the local storage"]
    pub const fn durable(mut self, enable: bool) -> Self {
        self.options.durable = enable;
        self
    }
}

impl LocalStorageBuilder<NoRoot> {
    #[must_use = "The builder must be connected to open the local storage"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "The builder must be connected to open the local storage"]
    pub fn root(self, path: impl Into<PathBuf>) -> LocalStorageBuilder<WithRoot> {
        LocalStorageBuilder { root: WithRoot(path.into()), options: self.options }
    }
}

impl LocalStorageBuilder<WithRoot> {
    /// Opens the directory as a storage root.
    ///
    /// The root is created when missing (unless disabled), canonicalized so
    /// symlinked keys cannot escape it, and swept for abandoned write files.
    /// Sweep failures are logged and never fail the connect.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Io`] if the root is missing and may not be
    /// created, or if it cannot be created or resolved.
    pub async fn connect(self) -> Result<LocalStorage> {
        let Self { root: WithRoot(root), options } = self;

        if options.create_root {
            fs::create_dir_all(&root)
                .await
                .context(format!("Failed to bootstrap storage root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(&root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;

        if let Some(threshold) = options.stale_after {
            maintenance::purge_tmp(&canonical, threshold).await;
        }

        info!(path = %canonical.display(), durable = options.durable, "Opened local storage root");
        Ok(LocalStorage {
            inner: Arc::new(LocalInner {
                root: canonical,
                tmp_counter: AtomicU64::new(1),
                durable: options.durable,
            }),
        })
    }
}
