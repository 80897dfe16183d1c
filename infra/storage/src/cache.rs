//! Cache-aside decorator.
//!
//! Reads are answered from `cache` while the entry is fresh; otherwise the
//! object is fetched from `source`, committed to `cache`, and the committed
//! copy is reopened and returned. Writes and deletes invalidate the cache
//! entry and go straight to `source`. Concurrent cold reads of the same path
//! are not coalesced: each may fetch and write the cache, and the last commit
//! wins.

use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::file::{File, Writer, copy_into};
use crate::storage::{DynStorage, Storage, Visitor};
use async_trait::async_trait;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Freshness policy of a [`CacheWrapper`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum age of a cached entry. Zero disables expiry.
    pub max_age: Duration,
    /// Whether an entry whose age cannot be determined counts as expired.
    pub treat_unknown_age_as_expired: bool,
    /// Store attributes only; content is always streamed from the source.
    pub no_data: bool,
}

impl CacheOptions {
    #[must_use]
    pub const fn with_max_age(max_age: Duration) -> Self {
        Self { max_age, treat_unknown_age_as_expired: false, no_data: false }
    }

    /// Applies the freshness policy to an entry as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, attributes: &Attributes, now: SystemTime) -> bool {
        if self.max_age.is_zero() {
            return false;
        }
        attributes.age(now).map_or(self.treat_unknown_age_as_expired, |age| age > self.max_age)
    }

    #[must_use]
    pub fn is_expired(&self, attributes: &Attributes) -> bool {
        self.is_expired_at(attributes, SystemTime::now())
    }
}

/// Read-through cache of `source` kept in `cache`.
#[derive(Debug, Clone)]
pub struct CacheWrapper {
    source: DynStorage,
    cache: DynStorage,
    options: CacheOptions,
}

impl CacheWrapper {
    pub fn new(source: DynStorage, cache: DynStorage, options: CacheOptions) -> Self {
        Self { source, cache, options }
    }

    #[must_use]
    pub const fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Removes the cache entry; a missing entry is fine.
    async fn invalidate(&self, ctx: &Context, path: &str) -> Result<()> {
        match self.cache.delete(ctx, path).await {
            Err(err) if err.is_absent() => Ok(()),
            other => other,
        }
    }

    async fn discard(&self, ctx: &Context, path: &str) {
        if let Err(err) = self.invalidate(ctx, path).await {
            warn!(path, error = %err, "Failed to drop expired cache entry");
        }
    }

    /// Returns the cache's view of `path` if it is present and fresh.
    async fn cached_attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Option<Attributes>> {
        match self.cache.attributes(ctx, path, options).await {
            Ok(attrs) if !self.options.is_expired(&attrs) => Ok(Some(attrs)),
            Ok(_) => {
                debug!(path, "Cache entry expired");
                Ok(None)
            },
            Err(err) if err.is_absent() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Opens `path` in the source, refusing copies that are themselves stale.
    async fn open_source(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        let file = self.source.open(ctx, path, options).await?;
        if self.options.is_expired(file.attributes()) {
            drop(file);
            self.discard(ctx, path).await;
            return Err(StorageError::expired(path));
        }
        Ok(file)
    }

    /// Fetches from source, commits to cache, and reopens the committed copy.
    async fn populate(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        let source = self.open_source(ctx, path, options).await?;
        let (mut reader, attributes) = source.into_parts();

        let sink = self.cache.create(ctx, path, &WriterOptions::with_attributes(attributes)).await?;
        let copied = copy_into(&mut reader, sink).await?;
        debug!(path, bytes = copied, "Cache populated from source");

        self.cache.open(ctx, path, options).await
    }

    /// Records the source attributes in the cache and streams data straight from source.
    async fn populate_attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<File> {
        let source = self.open_source(ctx, path, options).await?;
        let marker =
            self.cache.create(ctx, path, &WriterOptions::with_attributes(source.attributes().clone())).await?;
        marker.commit().await?;
        debug!(path, "Cache recorded attributes only");
        Ok(source)
    }
}

#[async_trait]
impl Storage for CacheWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        if self.options.no_data {
            if self.cached_attributes(ctx, path, options).await?.is_some() {
                return self.source.open(ctx, path, options).await;
            }
            return self.populate_attributes(ctx, path, options).await;
        }

        match self.cache.open(ctx, path, options).await {
            Ok(file) if !self.options.is_expired(file.attributes()) => {
                debug!(path, "Cache hit");
                return Ok(file);
            },
            Ok(_) => debug!(path, "Cache entry expired"),
            Err(err) if err.is_absent() => debug!(path, "Cache miss"),
            Err(err) => return Err(err),
        }

        self.populate(ctx, path, options).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        if let Some(attrs) = self.cached_attributes(ctx, path, options).await? {
            if self.options.no_data {
                return self.source.attributes(ctx, path, options).await;
            }
            return Ok(attrs);
        }

        let file = if self.options.no_data {
            self.populate_attributes(ctx, path, options).await?
        } else {
            self.populate(ctx, path, options).await?
        };
        Ok(file.attributes().clone())
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        self.invalidate(ctx, path).await?;
        self.source.create(ctx, path, options).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        self.invalidate(ctx, path).await?;
        self.source.delete(ctx, path).await
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        self.source.walk(ctx, path, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        self.source.url(ctx, path, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aged(secs: u64, now: SystemTime) -> Attributes {
        Attributes { modified: Some(now - Duration::from_secs(secs)), ..Attributes::default() }
    }

    #[test]
    fn zero_max_age_never_expires() {
        let now = SystemTime::now();
        let opts = CacheOptions { treat_unknown_age_as_expired: true, ..CacheOptions::default() };
        assert!(!opts.is_expired_at(&aged(1_000_000, now), now));
        assert!(!opts.is_expired_at(&Attributes::default(), now));
    }

    #[test]
    fn age_boundary_is_exclusive() {
        let now = SystemTime::now();
        let opts = CacheOptions::with_max_age(Duration::from_secs(10));
        assert!(!opts.is_expired_at(&aged(10, now), now));
        assert!(opts.is_expired_at(&aged(11, now), now));
    }

    #[test]
    fn unknown_age_follows_policy() {
        let now = SystemTime::now();
        let mut opts = CacheOptions::with_max_age(Duration::from_secs(10));
        assert!(!opts.is_expired_at(&Attributes::default(), now));
        opts.treat_unknown_age_as_expired = true;
        assert!(opts.is_expired_at(&Attributes::default(), now));
    }

    #[test]
    fn future_timestamps_are_fresh() {
        let now = SystemTime::now();
        let opts = CacheOptions::with_max_age(Duration::from_secs(1));
        let ahead = Attributes { modified: Some(now + Duration::from_secs(60)), ..Attributes::default() };
        assert!(!opts.is_expired_at(&ahead, now));
    }
}
