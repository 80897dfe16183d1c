use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::Result;
use crate::file::{File, Writer};
use crate::storage::{DynStorage, Storage, Visitor};
use async_trait::async_trait;
use std::time::Duration;

/// Delays every call before delegating. Meant for exercising timeouts and
/// concurrency limits against fast backends.
///
/// The delay honours `ctx`, so a deadline or cancellation cuts it short.
#[derive(Debug, Clone)]
pub struct SlowWrapper {
    inner: DynStorage,
    read_delay: Duration,
    write_delay: Duration,
}

impl SlowWrapper {
    pub fn new(inner: DynStorage, read_delay: Duration, write_delay: Duration) -> Self {
        Self { inner, read_delay, write_delay }
    }

    async fn pause(ctx: &Context, path: &str, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        ctx.run(path, async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Storage for SlowWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        Self::pause(ctx, path, self.read_delay).await?;
        self.inner.open(ctx, path, options).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        Self::pause(ctx, path, self.read_delay).await?;
        self.inner.attributes(ctx, path, options).await
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        Self::pause(ctx, path, self.write_delay).await?;
        self.inner.create(ctx, path, options).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        Self::pause(ctx, path, self.write_delay).await?;
        self.inner.delete(ctx, path).await
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        Self::pause(ctx, path, self.read_delay).await?;
        self.inner.walk(ctx, path, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        Self::pause(ctx, path, self.read_delay).await?;
        self.inner.url(ctx, path, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use crate::error::StorageError;
    use crate::walk::exists;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn delays_by_operation_class() {
        let slow = SlowWrapper::new(
            Arc::new(MemoryStorage::new()),
            Duration::from_millis(200),
            Duration::from_millis(50),
        );
        let ctx = Context::background();

        let started = Instant::now();
        slow.delete(&ctx, "a").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));

        let started = Instant::now();
        assert!(!exists(&ctx, &slow, "a").await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_respects_deadline() {
        let slow = SlowWrapper::new(Arc::new(MemoryStorage::new()), Duration::from_secs(60), Duration::ZERO);
        let ctx = Context::background().with_timeout(Duration::from_millis(5));

        let err = slow.open(&ctx, "a", &ReaderOptions::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::DeadlineExceeded { .. }));
    }
}
