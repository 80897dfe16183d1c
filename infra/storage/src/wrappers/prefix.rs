use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::file::{File, Writer};
use crate::storage::{DynStorage, Storage, Visitor, visitor};
use async_trait::async_trait;
use std::sync::Arc;

/// Confines every path to a fixed prefix of the inner storage.
///
/// The prefix is concatenated verbatim: `"tenant/"` and `"tenant"` behave
/// differently. Walk results have the prefix stripped again.
#[derive(Debug, Clone)]
pub struct PrefixWrapper {
    inner: DynStorage,
    prefix: Arc<str>,
}

impl PrefixWrapper {
    pub fn new(inner: DynStorage, prefix: impl Into<String>) -> Self {
        Self { inner, prefix: prefix.into().into() }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full(&self, path: &str) -> String {
        format!("{}{path}", self.prefix)
    }

    /// Errors report the path the caller used, not the prefixed one.
    fn unprefix(&self, err: StorageError) -> StorageError {
        err.strip_path_prefix(&self.prefix)
    }
}

#[async_trait]
impl Storage for PrefixWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        self.inner.open(ctx, &self.full(path), options).await.map_err(|e| self.unprefix(e))
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        self.inner.attributes(ctx, &self.full(path), options).await.map_err(|e| self.unprefix(e))
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        self.inner.create(ctx, &self.full(path), options).await.map_err(|e| self.unprefix(e))
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        self.inner.delete(ctx, &self.full(path)).await.map_err(|e| self.unprefix(e))
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        let prefix = Arc::clone(&self.prefix);
        let strip = visitor(move |full: String| {
            let path = full.strip_prefix(&*prefix).map_or_else(|| full.clone(), str::to_owned);
            visit(path)
        });
        self.inner.walk(ctx, &self.full(path), strip).await.map_err(|e| self.unprefix(e))
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        self.inner.url(ctx, &self.full(path), options).await.map_err(|e| self.unprefix(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use crate::walk::{list, read, write};

    #[tokio::test]
    async fn paths_are_rewritten_both_ways() {
        let memory = MemoryStorage::new();
        let prefixed = PrefixWrapper::new(Arc::new(memory.clone()), "tenant/");
        let ctx = Context::background();

        for p in ["a", "b/c"] {
            write(&ctx, &prefixed, p, p.as_bytes(), &WriterOptions::default()).await.unwrap();
        }
        write(&ctx, &memory, "other", b"", &WriterOptions::default()).await.unwrap();

        assert_eq!(read(&ctx, &memory, "tenant/b/c").await.unwrap(), b"b/c");
        assert_eq!(read(&ctx, &prefixed, "a").await.unwrap(), b"a");
        assert_eq!(list(&ctx, &prefixed, "").await.unwrap(), vec!["a".to_owned(), "b/c".to_owned()]);
    }

    #[tokio::test]
    async fn errors_name_the_callers_path() {
        let prefixed = PrefixWrapper::new(Arc::new(MemoryStorage::new()), "tenant/");
        let ctx = Context::background();

        let err = prefixed.open(&ctx, "missing", &ReaderOptions::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "storage missing: path does not exist");
        let err = prefixed.attributes(&ctx, "missing", &ReaderOptions::default()).await.unwrap_err();
        assert_eq!(err.path(), Some("missing"));
    }

    #[tokio::test]
    async fn prefix_is_concatenated_raw() {
        let memory = MemoryStorage::new();
        let prefixed = PrefixWrapper::new(Arc::new(memory.clone()), "raw");
        let ctx = Context::background();

        write(&ctx, &prefixed, "file", b"", &WriterOptions::default()).await.unwrap();
        assert_eq!(memory.keys_with_prefix(""), vec!["rawfile".to_owned()]);
    }
}
