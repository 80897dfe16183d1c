//! Remote object-store backend.
//!
//! The wire protocol lives behind [`Connector`] and [`Bucket`]; credentials
//! come from a [`CredentialProvider`]. [`RemoteStorage`] owns one
//! [`ScopedHandleCache`] so every operation reuses a single authenticated
//! bucket handle, upgrading it only when an operation needs a wider scope.

mod emulator;

pub use emulator::EmulatedConnector;

use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::file::{File, Writer};
use crate::handle::ScopedHandleCache;
use crate::scope::{NativeTier, Scope, ScopeMapping};
use crate::storage::{Storage, Visitor};
use async_trait::async_trait;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// Credentials resolved for a native tier.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Identity the credentials belong to, e.g. a service account email.
    pub principal: Option<String>,
    /// Bearer token used by the connector.
    pub token: Option<String>,
    /// Private key material; required to sign URLs.
    pub signing_key: Option<Vec<u8>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Source of credentials for a native tier.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    async fn find_credentials(&self, ctx: &Context, tier: NativeTier) -> Result<Credentials>;
}

/// Hands out the same credentials for every tier.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Credentials);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn find_credentials(&self, _ctx: &Context, _tier: NativeTier) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_page_token: Option<String>,
}

/// An authenticated handle to one bucket.
#[async_trait]
pub trait Bucket: Send + Sync + fmt::Debug {
    async fn reader(&self, ctx: &Context, key: &str) -> Result<File>;

    async fn attributes(&self, ctx: &Context, key: &str) -> Result<Attributes>;

    async fn writer(&self, ctx: &Context, key: &str, options: &WriterOptions) -> Result<Writer>;

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()>;

    async fn list(&self, ctx: &Context, prefix: &str, page_token: Option<String>) -> Result<ListPage>;

    async fn signed_url(
        &self,
        ctx: &Context,
        key: &str,
        credentials: &Credentials,
        options: &SignedUrlOptions,
    ) -> Result<String>;
}

/// Builds bucket handles authorized for a scope.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    async fn connect(
        &self,
        ctx: &Context,
        bucket: &str,
        scope: Scope,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Bucket>>;
}

#[derive(Debug)]
pub struct RemoteInner {
    bucket: String,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialProvider>,
    mapping: Arc<dyn ScopeMapping>,
    handles: ScopedHandleCache<dyn Bucket>,
}

impl RemoteInner {
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Scope of the currently cached bucket handle.
    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.handles.scope()
    }
}

/// A [`Storage`] over a remote bucket reached through a [`Connector`].
#[derive(Debug, Clone)]
pub struct RemoteStorage {
    inner: Arc<RemoteInner>,
}

impl Deref for RemoteStorage {
    type Target = RemoteInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl RemoteStorage {
    pub fn new(
        bucket: impl Into<String>,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialProvider>,
        mapping: Arc<dyn ScopeMapping>,
    ) -> Self {
        let bucket = bucket.into();
        let handles = ScopedHandleCache::new(bucket.clone(), Arc::clone(&mapping));
        Self { inner: Arc::new(RemoteInner { bucket, connector, credentials, mapping, handles }) }
    }

    async fn handle(&self, ctx: &Context, scope: Scope) -> Result<Arc<dyn Bucket>> {
        self.handles
            .acquire(ctx, scope, |target| async move {
                let tier = self.mapping.tier(target);
                let credentials = self.credentials.find_credentials(ctx, tier).await?;
                debug!(bucket = %self.bucket, tier = %tier, scope = %target, "Connecting bucket");
                self.connector.connect(ctx, &self.bucket, target, &credentials).await
            })
            .await
    }

    async fn signing_credentials(&self, ctx: &Context) -> Result<Credentials> {
        let tier = self.mapping.tier(Scope::SIGN_URL);
        let credentials = self.credentials.find_credentials(ctx, tier).await?;
        if credentials.signing_key.is_none() {
            return Err(StorageError::CredentialsMissing {
                message: format!("no signing key available for bucket {}", self.bucket).into(),
                context: None,
            });
        }
        Ok(credentials)
    }
}

#[async_trait]
impl Storage for RemoteStorage {
    async fn open(&self, ctx: &Context, path: &str, _options: &ReaderOptions) -> Result<File> {
        let bucket = self.handle(ctx, Scope::READ).await?;
        ctx.run(path, bucket.reader(ctx, path)).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        _options: &ReaderOptions,
    ) -> Result<Attributes> {
        let bucket = self.handle(ctx, Scope::READ).await?;
        ctx.run(path, bucket.attributes(ctx, path)).await
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        let bucket = self.handle(ctx, Scope::WRITE).await?;
        ctx.run(path, bucket.writer(ctx, path, options)).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let bucket = self.handle(ctx, Scope::DELETE).await?;
        match ctx.run(path, bucket.delete(ctx, path)).await {
            Err(err) if err.is_absent() => Ok(()),
            other => other,
        }
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        let bucket = self.handle(ctx, Scope::READ).await?;
        let mut token = None;
        loop {
            let page = ctx.run(path, bucket.list(ctx, path, token.take())).await?;
            for key in page.keys {
                ctx.check(&key)?;
                visit(key).await?;
            }
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => return Ok(()),
            }
        }
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        let bucket = self.handle(ctx, Scope::SIGN_URL).await?;
        let credentials = self.signing_credentials(ctx).await?;
        let options = options.clone().apply_defaults();
        ctx.run(path, bucket.signed_url(ctx, path, &credentials, &options)).await
    }
}
