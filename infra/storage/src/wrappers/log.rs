use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::Result;
use crate::file::{File, Writer};
use crate::storage::{DynStorage, Storage, Visitor};
use async_trait::async_trait;
use tracing::{info, warn};

/// Emits one `tracing` event per call, plus a warning for every failure.
#[derive(Debug, Clone)]
pub struct LogWrapper {
    inner: DynStorage,
    name: String,
}

impl LogWrapper {
    pub fn new(inner: DynStorage, name: impl Into<String>) -> Self {
        Self { inner, name: name.into() }
    }

    fn enter(&self, op: &'static str, path: &str) {
        info!(name = %self.name, op, path, "Storage call");
    }

    fn outcome<T>(&self, op: &'static str, path: &str, res: Result<T>) -> Result<T> {
        if let Err(err) = &res {
            warn!(name = %self.name, op, path, error = %err, "Storage call failed");
        }
        res
    }
}

#[async_trait]
impl Storage for LogWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        self.enter("open", path);
        self.outcome("open", path, self.inner.open(ctx, path, options).await)
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        self.enter("attributes", path);
        self.outcome("attributes", path, self.inner.attributes(ctx, path, options).await)
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        self.enter("create", path);
        self.outcome("create", path, self.inner.create(ctx, path, options).await)
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        self.enter("delete", path);
        self.outcome("delete", path, self.inner.delete(ctx, path).await)
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        self.enter("walk", path);
        self.outcome("walk", path, self.inner.walk(ctx, path, visit).await)
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        self.enter("url", path);
        self.outcome("url", path, self.inner.url(ctx, path, options).await)
    }
}
