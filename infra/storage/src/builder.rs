use crate::backend::{Connector, CredentialProvider, LocalStorage, MemoryStorage, RemoteStorage};
use crate::cache::{CacheOptions, CacheWrapper};
use crate::error::{Result, StorageError};
use crate::scope::{CloudStorageTiers, FlatTiers, ScopeMapping};
use crate::storage::DynStorage;
use crate::wrappers::{LogWrapper, PrefixWrapper, TimeoutWrapper, Timeouts, TraceWrapper};
use private::Sealed;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// A parsed storage URL.
///
/// | Input              | Backend                               |
/// |--------------------|---------------------------------------|
/// | `gs://bucket`      | remote, read-only/read-write/full tiers |
/// | `s3://bucket`      | remote, single full-control tier      |
/// | `file:///path`     | local directory                       |
/// | `mem://`           | in-process memory                     |
/// | anything else      | local directory at that path          |
///
/// Everything after a remote scheme is the bucket name, slashes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    CloudStorage { bucket: String },
    S3 { bucket: String },
    Local { root: PathBuf },
    Memory,
}

impl Locator {
    /// # Errors
    /// [`StorageError::InvalidUrl`] for an empty URL or a remote URL without a bucket.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(invalid("empty storage url"));
        }

        if let Some(bucket) = url.strip_prefix("gs://") {
            return Ok(Self::CloudStorage { bucket: bucket_name(url, bucket)? });
        }
        if let Some(bucket) = url.strip_prefix("s3://") {
            return Ok(Self::S3 { bucket: bucket_name(url, bucket)? });
        }
        if url.starts_with("mem://") {
            return Ok(Self::Memory);
        }
        let root = url.strip_prefix("file://").unwrap_or(url);
        if root.is_empty() {
            return Err(invalid(format!("missing path in {url}")));
        }
        Ok(Self::Local { root: PathBuf::from(root) })
    }

    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::CloudStorage { .. } => "gs",
            Self::S3 { .. } => "s3",
            Self::Local { .. } => "file",
            Self::Memory => "mem",
        }
    }
}

impl FromStr for Locator {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloudStorage { bucket } => write!(f, "gs://{bucket}"),
            Self::S3 { bucket } => write!(f, "s3://{bucket}"),
            Self::Local { root } => write!(f, "file://{}", root.display()),
            Self::Memory => f.write_str("mem://"),
        }
    }
}

fn invalid(message: impl Into<String>) -> StorageError {
    StorageError::InvalidUrl { message: message.into().into(), context: None }
}

fn bucket_name(url: &str, bucket: &str) -> Result<String> {
    if bucket.is_empty() {
        return Err(invalid(format!("missing bucket in {url}")));
    }
    Ok(bucket.to_owned())
}

#[derive(Debug, Clone, Default)]
struct DepotOptions {
    connector: Option<Arc<dyn Connector>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    prefix: Option<String>,
    cache: Option<(Locator, CacheOptions)>,
    timeouts: Option<Timeouts>,
    trace: Option<String>,
    log: Option<String>,
}

#[derive(Debug, Default)]
pub struct NoUrl;
#[derive(Debug)]
pub struct WithUrl(Locator);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoUrl {}
impl Sealed for WithUrl {}

/// Assembles a backend and its decorator chain.
///
/// Decorators are applied inside-out as backend, prefix, cache, timeout,
/// trace, log; each one is optional.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct DepotBuilder<S: Sealed = NoUrl> {
    state: S,
    options: DepotOptions,
}

#[allow(private_bounds)]
impl<S: Sealed> DepotBuilder<S> {
    #[must_use = "Sets the connector used for gs:// and s3:// buckets"]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.options.connector = Some(connector);
        self
    }

    #[must_use = "Sets the credential provider used for gs:// and s3:// buckets"]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.options.credentials = Some(credentials);
        self
    }

    #[must_use = "Confines every path to a prefix"]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.prefix = Some(prefix.into());
        self
    }

    #[must_use = "Puts a cache-aside layer in front of the backend"]
    pub fn cache(mut self, locator: Locator, options: CacheOptions) -> Self {
        self.options.cache = Some((locator, options));
        self
    }

    #[must_use = "Bounds call latency"]
    pub const fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.options.timeouts = Some(timeouts);
        self
    }

    #[must_use = "Wraps every call in a tracing span"]
    pub fn trace(mut self, name: impl Into<String>) -> Self {
        self.options.trace = Some(name.into());
        self
    }

    #[must_use = "Logs every call"]
    pub fn log(mut self, name: impl Into<String>) -> Self {
        self.options.log = Some(name.into());
        self
    }

    fn transition<N: Sealed>(self, state: N) -> DepotBuilder<N> {
        DepotBuilder { state, options: self.options }
    }

    async fn backend(&self, locator: &Locator) -> Result<DynStorage> {
        match locator {
            Locator::Local { root } => Ok(Arc::new(LocalStorage::builder().root(root).connect().await?)),
            Locator::Memory => Ok(Arc::new(MemoryStorage::new())),
            Locator::CloudStorage { bucket } => self.remote(locator, bucket, Arc::new(CloudStorageTiers)),
            Locator::S3 { bucket } => self.remote(locator, bucket, Arc::new(FlatTiers)),
        }
    }

    fn remote(
        &self,
        locator: &Locator,
        bucket: &str,
        mapping: Arc<dyn ScopeMapping>,
    ) -> Result<DynStorage> {
        let connector = self.options.connector.clone().ok_or_else(|| StorageError::NotImplemented {
            message: format!("no connector registered for {locator}").into(),
            context: None,
        })?;
        let credentials =
            self.options.credentials.clone().ok_or_else(|| StorageError::CredentialsMissing {
                message: format!("no credential provider for {locator}").into(),
                context: None,
            })?;
        Ok(Arc::new(RemoteStorage::new(bucket, connector, credentials, mapping)))
    }
}

impl DepotBuilder<NoUrl> {
    #[must_use = "Creates a new builder with no decorators"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Selects the backend"]
    pub fn locator(self, locator: Locator) -> DepotBuilder<WithUrl> {
        self.transition(WithUrl(locator))
    }

    /// Parses `url` and selects the backend it names.
    ///
    /// # Errors
    /// [`StorageError::InvalidUrl`] if `url` cannot be parsed.
    pub fn url(self, url: &str) -> Result<DepotBuilder<WithUrl>> {
        Ok(self.locator(Locator::parse(url)?))
    }
}

impl DepotBuilder<WithUrl> {
    /// Opens the backend and wraps it in the configured decorators.
    ///
    /// # Errors
    /// Backend bootstrap failures, [`StorageError::NotImplemented`] for a remote
    /// URL without a connector, or [`StorageError::CredentialsMissing`] without
    /// a credential provider.
    pub async fn connect(self) -> Result<DynStorage> {
        let locator = &self.state.0;
        let mut storage = self.backend(locator).await?;

        if let Some(prefix) = &self.options.prefix {
            storage = Arc::new(PrefixWrapper::new(storage, prefix.clone()));
        }
        if let Some((cache_locator, options)) = &self.options.cache {
            let cache = self.backend(cache_locator).await?;
            storage = Arc::new(CacheWrapper::new(storage, cache, *options));
            info!(source = %locator, cache = %cache_locator, "Cache-aside layer enabled");
        }
        if let Some(timeouts) = self.options.timeouts {
            storage = Arc::new(TimeoutWrapper::new(storage, timeouts));
        }
        if let Some(name) = &self.options.trace {
            storage = Arc::new(TraceWrapper::new(storage, name.clone()));
        }
        if let Some(name) = &self.options.log {
            storage = Arc::new(LogWrapper::new(storage, name.clone()));
        }

        info!(url = %locator, "Storage connected");
        Ok(storage)
    }
}
