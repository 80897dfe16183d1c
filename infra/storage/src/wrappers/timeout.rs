use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::file::{File, Writer};
use crate::storage::{DynStorage, Storage, Visitor};
use async_trait::async_trait;
use std::time::Duration;

/// Per-class deadlines. A zero duration leaves that class unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Bounds `open`, `attributes` and `url`.
    pub read: Duration,
    /// Bounds `create` and `delete`.
    pub write: Duration,
}

/// Imposes a deadline on resolving each call.
///
/// Only the call itself is bounded; streaming an opened [`File`] or writing to
/// a returned sink afterwards is not. `walk` is never bounded. If the deadline
/// has passed when the inner call returns an error, the caller sees
/// [`StorageError::DeadlineExceeded`] instead of the inner error.
#[derive(Debug, Clone)]
pub struct TimeoutWrapper {
    inner: DynStorage,
    timeouts: Timeouts,
}

impl TimeoutWrapper {
    pub fn new(inner: DynStorage, timeouts: Timeouts) -> Self {
        Self { inner, timeouts }
    }

    fn scoped(ctx: &Context, limit: Duration) -> Context {
        if limit.is_zero() { ctx.clone() } else { ctx.with_timeout(limit) }
    }

    fn settle<T>(ctx: &Context, path: &str, res: Result<T>) -> Result<T> {
        match res {
            Err(err)
                if !matches!(err, StorageError::DeadlineExceeded { .. })
                    && !ctx.is_cancelled()
                    && ctx.is_expired() =>
            {
                Err(StorageError::deadline(path))
            },
            other => other,
        }
    }
}

#[async_trait]
impl Storage for TimeoutWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        let ctx = Self::scoped(ctx, self.timeouts.read);
        let res = ctx.run(path, self.inner.open(&ctx, path, options)).await;
        Self::settle(&ctx, path, res)
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        let ctx = Self::scoped(ctx, self.timeouts.read);
        let res = ctx.run(path, self.inner.attributes(&ctx, path, options)).await;
        Self::settle(&ctx, path, res)
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        let ctx = Self::scoped(ctx, self.timeouts.write);
        let res = ctx.run(path, self.inner.create(&ctx, path, options)).await;
        Self::settle(&ctx, path, res)
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let ctx = Self::scoped(ctx, self.timeouts.write);
        let res = ctx.run(path, self.inner.delete(&ctx, path)).await;
        Self::settle(&ctx, path, res)
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        self.inner.walk(ctx, path, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        let ctx = Self::scoped(ctx, self.timeouts.read);
        let res = ctx.run(path, self.inner.url(&ctx, path, options)).await;
        Self::settle(&ctx, path, res)
    }
}
