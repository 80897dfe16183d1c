//! The contract shared by every backend and every decorator.

use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::Result;
use crate::file::{File, Writer};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Callback invoked once per enumerated path. Returning an error stops the walk.
pub type Visitor = Arc<dyn Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Shared, type-erased storage handle. Decorators wrap one of these.
pub type DynStorage = Arc<dyn Storage>;

/// Builds a [`Visitor`] from an async closure.
pub fn visitor<F, Fut>(f: F) -> Visitor
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |path| Box::pin(f(path)))
}

/// A file-object store.
///
/// Paths are forward-slash delimited. Implementations must be safe to share
/// across tasks; every call may suspend on I/O and honours `ctx`.
#[async_trait]
pub trait Storage: Send + Sync + fmt::Debug {
    /// Opens `path` for reading.
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File>;

    /// Fetches the attributes of `path` without opening its content.
    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes>;

    /// Starts a write to `path`. The object appears once the returned sink commits.
    ///
    /// Descriptive attributes in `options` (content type, encoding, metadata) are
    /// stored by the memory and remote backends. [`crate::LocalStorage`] keeps only
    /// the bytes: reads report size and timestamps from the file system.
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer>;

    /// Removes `path`. Removing a missing path is not an error.
    async fn delete(&self, ctx: &Context, path: &str) -> Result<()>;

    /// Visits every object below `path`, sequentially, in backend order.
    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()>;

    /// Returns a URL for `path`, signed when the backend supports it.
    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String>;
}
