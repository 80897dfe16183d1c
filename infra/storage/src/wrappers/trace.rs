use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::Result;
use crate::file::{File, Writer};
use crate::storage::{DynStorage, Storage, Visitor};
use async_trait::async_trait;
use tracing::{Instrument, Span, field, info_span};

/// Runs every call inside an `info`-level `storage` span.
///
/// Failures are recorded on the span's `error` field.
#[derive(Debug, Clone)]
pub struct TraceWrapper {
    inner: DynStorage,
    name: String,
}

impl TraceWrapper {
    pub fn new(inner: DynStorage, name: impl Into<String>) -> Self {
        Self { inner, name: name.into() }
    }

    fn span(&self, op: &'static str, path: &str) -> Span {
        info_span!("storage", name = %self.name, op, path, error = field::Empty)
    }

    fn record<T>(span: &Span, res: Result<T>) -> Result<T> {
        if let Err(err) = &res {
            span.record("error", field::display(err));
        }
        res
    }
}

#[async_trait]
impl Storage for TraceWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        let span = self.span("open", path);
        let res = self.inner.open(ctx, path, options).instrument(span.clone()).await;
        Self::record(&span, res)
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        let span = self.span("attributes", path);
        let res = self.inner.attributes(ctx, path, options).instrument(span.clone()).await;
        Self::record(&span, res)
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        let span = self.span("create", path);
        let res = self.inner.create(ctx, path, options).instrument(span.clone()).await;
        Self::record(&span, res)
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let span = self.span("delete", path);
        let res = self.inner.delete(ctx, path).instrument(span.clone()).await;
        Self::record(&span, res)
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        let span = self.span("walk", path);
        let res = self.inner.walk(ctx, path, visit).instrument(span.clone()).await;
        Self::record(&span, res)
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        let span = self.span("url", path);
        let res = self.inner.url(ctx, path, options).instrument(span.clone()).await;
        Self::record(&span, res)
    }
}
