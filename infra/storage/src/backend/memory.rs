//! In-process object store backed by a sorted map.

use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::file::{File, WriteSink, Writer};
use crate::storage::{Storage, Visitor};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Deref;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone)]
struct Object {
    data: Arc<[u8]>,
    attributes: Attributes,
}

#[derive(Debug, Default)]
pub struct MemoryInner {
    objects: RwLock<BTreeMap<String, Object>>,
}

impl MemoryInner {
    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }
}

/// A thread-safe in-memory [`Storage`].
///
/// Cloning yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

impl Deref for MemoryStorage {
    type Target = MemoryInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys starting with `prefix`, in lexical order.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn get(&self, path: &str) -> Result<Object> {
        self.objects.read().get(path).cloned().ok_or_else(|| StorageError::not_found(path))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn open(&self, ctx: &Context, path: &str, _options: &ReaderOptions) -> Result<File> {
        ctx.check(path)?;
        let object = self.get(path)?;
        Ok(File::new(Box::new(Cursor::new(object.data)), object.attributes))
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        _options: &ReaderOptions,
    ) -> Result<Attributes> {
        ctx.check(path)?;
        Ok(self.get(path)?.attributes)
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        ctx.check(path)?;
        Ok(Box::new(MemoryWriter {
            store: Arc::clone(&self.inner),
            path: path.to_owned(),
            buf: Vec::with_capacity(options.buffer_size.unwrap_or_default()),
            attributes: options.attributes.descriptive(),
        }))
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        ctx.check(path)?;
        if self.objects.write().remove(path).is_some() {
            debug!(path, "Memory object deleted");
        }
        Ok(())
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        for key in self.keys_with_prefix(path) {
            ctx.check(&key)?;
            visit(key).await?;
        }
        Ok(())
    }

    async fn url(&self, ctx: &Context, path: &str, _options: &SignedUrlOptions) -> Result<String> {
        ctx.check(path)?;
        self.get(path)?;
        Ok(format!("mem://{path}"))
    }
}

struct MemoryWriter {
    store: Arc<MemoryInner>,
    path: String,
    buf: Vec<u8>,
    attributes: Attributes,
}

#[async_trait]
impl WriteSink for MemoryWriter {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { store, path, buf, mut attributes } = *self;
        let now = SystemTime::now();
        attributes.size = buf.len() as u64;
        attributes.modified = Some(now);
        attributes.created = Some(now);

        store.objects.write().insert(path.clone(), Object { data: buf.into(), attributes });
        debug!(path = %path, "Memory object committed");
        Ok(())
    }
}
