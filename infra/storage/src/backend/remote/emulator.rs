//! In-process stand-in for a remote object store.
//!
//! Each connect hands out a bucket handle that enforces the scope it was
//! created with, which makes scope escalation observable in tests and local
//! development.

use super::{Bucket, Connector, Credentials, ListPage};
use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::backend::memory::MemoryStorage;
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::file::{File, Writer};
use crate::scope::Scope;
use crate::storage::Storage;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug)]
pub struct EmulatedConnector {
    objects: MemoryStorage,
    page_size: usize,
    connects: AtomicUsize,
}

impl Default for EmulatedConnector {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl EmulatedConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self { objects: MemoryStorage::new(), page_size: page_size.max(1), connects: AtomicUsize::new(0) }
    }

    /// Number of handles built so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for EmulatedConnector {
    async fn connect(
        &self,
        ctx: &Context,
        bucket: &str,
        scope: Scope,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Bucket>> {
        ctx.check(bucket)?;
        if credentials.token.is_none() && credentials.signing_key.is_none() {
            return Err(StorageError::CredentialsMissing {
                message: format!("no usable credentials for bucket {bucket}").into(),
                context: None,
            });
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(EmulatedBucket {
            name: bucket.to_owned(),
            scope,
            objects: self.objects.clone(),
            page_size: self.page_size,
        }))
    }
}

#[derive(Debug)]
struct EmulatedBucket {
    name: String,
    scope: Scope,
    objects: MemoryStorage,
    page_size: usize,
}

impl EmulatedBucket {
    fn key(&self, key: &str) -> String {
        format!("{}/{key}", self.name)
    }

    fn require(&self, needed: Scope) -> Result<()> {
        if self.scope.has(needed) {
            return Ok(());
        }
        Err(StorageError::Backend {
            message: format!("handle for {} is scoped to {}, needs {needed}", self.name, self.scope).into(),
            context: None,
        })
    }

    fn strip<'a>(&self, full: &'a str) -> &'a str {
        full.strip_prefix(&self.name).and_then(|k| k.strip_prefix('/')).unwrap_or(full)
    }

    fn absent(&self, err: StorageError, key: &str) -> StorageError {
        if err.is_absent() { StorageError::not_found(key) } else { err }
    }
}

#[async_trait]
impl Bucket for EmulatedBucket {
    async fn reader(&self, ctx: &Context, key: &str) -> Result<File> {
        self.require(Scope::READ)?;
        self.objects
            .open(ctx, &self.key(key), &ReaderOptions::default())
            .await
            .map_err(|e| self.absent(e, key))
    }

    async fn attributes(&self, ctx: &Context, key: &str) -> Result<Attributes> {
        self.require(Scope::READ)?;
        self.objects
            .attributes(ctx, &self.key(key), &ReaderOptions::default())
            .await
            .map_err(|e| self.absent(e, key))
    }

    async fn writer(&self, ctx: &Context, key: &str, options: &WriterOptions) -> Result<Writer> {
        self.require(Scope::WRITE)?;
        self.objects.create(ctx, &self.key(key), options).await
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        self.require(Scope::DELETE)?;
        let full = self.key(key);
        self.objects
            .attributes(ctx, &full, &ReaderOptions::default())
            .await
            .map_err(|e| self.absent(e, key))?;
        self.objects.delete(ctx, &full).await
    }

    async fn list(&self, ctx: &Context, prefix: &str, page_token: Option<String>) -> Result<ListPage> {
        self.require(Scope::READ)?;
        ctx.check(prefix)?;

        let mut remaining = self
            .objects
            .keys_with_prefix(&self.key(prefix))
            .into_iter()
            .map(|k| self.strip(&k).to_owned())
            .filter(|k| page_token.as_ref().is_none_or(|token| k > token))
            .peekable();

        let keys: Vec<String> = remaining.by_ref().take(self.page_size).collect();
        let next_page_token = if remaining.peek().is_some() { keys.last().cloned() } else { None };
        Ok(ListPage { keys, next_page_token })
    }

    async fn signed_url(
        &self,
        ctx: &Context,
        key: &str,
        credentials: &Credentials,
        options: &SignedUrlOptions,
    ) -> Result<String> {
        self.require(Scope::SIGN_URL)?;
        self.attributes(ctx, key).await?;

        let signature = fxhash::hash64(&(
            key,
            options.method.as_str(),
            options.expiry.as_secs(),
            credentials.signing_key.as_deref().unwrap_or_default(),
        ));
        Ok(format!(
            "https://{}.storage.emulator/{key}?method={}&expires={}&signature={signature:016x}",
            self.name,
            options.method,
            options.expiry.as_secs()
        ))
    }
}
