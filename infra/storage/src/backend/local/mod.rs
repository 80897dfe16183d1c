//! Local-disk backend with sandboxed keys and atomic commits.
//!
//! Object keys map to files below a canonicalized root. Writes go to a unique
//! temporary file that is synced and renamed over the target on commit, so a
//! reader never observes a partially written object.

mod builder;
mod maintenance;
mod sandbox;

pub use builder::{LocalStorageBuilder, NoRoot, WithRoot};

use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError, StorageErrorExt};
use crate::file::{File, WriteSink, Writer};
use crate::storage::{Storage, Visitor};
use async_trait::async_trait;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;

const WALK_BUFFER: usize = 64;

/// The internal shared state of a [`LocalStorage`] instance.
#[derive(Debug)]
pub struct LocalInner {
    /// The canonicalized physical path on the disk where all objects live.
    pub(crate) root: PathBuf,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
    /// Commits fsync the file and its parent directory.
    pub(crate) durable: bool,
}

impl LocalInner {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A thread-safe handle to a directory-backed [`Storage`].
///
/// Only object bytes are persisted; `WriterOptions::attributes` are dropped.
///
/// This handle is internally reference-counted and can be cheaply cloned.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    pub(crate) inner: Arc<LocalInner>,
}

impl Deref for LocalStorage {
    type Target = LocalInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl LocalStorage {
    #[must_use = "The local storage is not initialized until you call .connect()"]
    pub fn builder() -> LocalStorageBuilder {
        LocalStorageBuilder::new()
    }

    /// Resolves an object key to its physical path inside the sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversal`] if the key tries to escape the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        sandbox::resolve(&self.root, path)
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }
}

fn attributes_from(meta: &std::fs::Metadata) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.modified = meta.modified().ok();
    attrs.created = meta.created().ok();
    attrs.size = meta.len();
    attrs
}

async fn stat_file(resolved: &Path, path: &str) -> Result<std::fs::Metadata> {
    let meta = fs::metadata(resolved).await.map_err(|e| StorageError::from_io(path, e, "Stat"))?;
    if meta.is_dir() {
        return Err(StorageError::not_found(path));
    }
    Ok(meta)
}

#[async_trait]
impl Storage for LocalStorage {
    async fn open(&self, ctx: &Context, path: &str, _options: &ReaderOptions) -> Result<File> {
        let resolved = self.resolve(path)?;
        ctx.run(path, async {
            let meta = stat_file(&resolved, path).await?;
            let file =
                fs::File::open(&resolved).await.map_err(|e| StorageError::from_io(path, e, "Open"))?;
            Ok(File::new(Box::new(file), attributes_from(&meta)))
        })
        .await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        _options: &ReaderOptions,
    ) -> Result<Attributes> {
        let resolved = self.resolve(path)?;
        ctx.run(path, async { stat_file(&resolved, path).await.map(|m| attributes_from(&m)) })
            .await
    }

    async fn create(&self, ctx: &Context, path: &str, _options: &WriterOptions) -> Result<Writer> {
        let target = self.resolve(path)?;
        ctx.run(path, async {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .await
                    .context(format!("Failed to create parents for {}", target.display()))?;
            }

            let tmp = unique_tmp_path(&target, &self.tmp_counter);
            let file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&tmp)
                .await
                .context(format!("Temp creation failed: {}", tmp.display()))?;

            Ok(Box::new(LocalWriter {
                file: Some(file),
                tmp,
                target: target.clone(),
                durable: self.durable,
                committed: false,
            }) as Writer)
        })
        .await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        if resolved == self.root {
            return Err(StorageError::PathTraversal {
                path: path.to_owned().into(),
                context: Some("Refusing to delete the storage root".into()),
            });
        }

        ctx.run(path, async {
            let removed = match fs::symlink_metadata(&resolved).await {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(&resolved).await,
                Ok(_) => fs::remove_file(&resolved).await,
                Err(err) => Err(err),
            };
            match removed {
                Ok(()) => {
                    debug!(path = %resolved.display(), "Local object deleted");
                    Ok(())
                },
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StorageError::from_io(path, err, "Delete")),
            }
        })
        .await
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        let start = self.resolve(path)?;
        let root = self.root.clone();
        let key = path.to_owned();
        let (tx, mut rx) = mpsc::channel(WALK_BUFFER);

        let producer = tokio::task::spawn_blocking(move || stream_files(&root, &start, &key, &tx));

        // Returning early drops `rx`, which stops the producer at its next send.
        while let Some(item) = rx.recv().await {
            let key = item?;
            ctx.check(&key)?;
            visit(key).await?;
        }

        producer.await.map_err(|e| StorageError::from(format!("Local walk task failed: {e}")))
    }

    async fn url(&self, ctx: &Context, path: &str, _options: &SignedUrlOptions) -> Result<String> {
        let resolved = self.resolve(path)?;
        ctx.run(path, async {
            stat_file(&resolved, path).await?;
            Ok(format!("file://{}", resolved.display()))
        })
        .await
    }
}

fn stream_files(root: &Path, start: &Path, key: &str, tx: &mpsc::Sender<Result<String>>) {
    if !start.exists() {
        let _ = tx.blocking_send(Err(StorageError::not_found(key)));
        return;
    }

    let entries = WalkDir::new(start).sort_by_file_name().into_iter();
    for entry in entries {
        let item = match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let is_tmp = entry.file_name().to_str().is_none_or(maintenance::is_tmp_name);
                match sandbox::object_key(root, entry.path()) {
                    Some(object) if !is_tmp => Ok(object),
                    _ => continue,
                }
            },
            Ok(_) => continue,
            Err(err) => Err(StorageError::Io {
                source: err.into(),
                context: Some(format!("Walk failed below {key}").into()),
            }),
        };

        let failed = item.is_err();
        if tx.blocking_send(item).is_err() || failed {
            return;
        }
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("object");
    let tmp_name = format!("{file_name}{}{counter}", maintenance::TMP_MARKER);
    target.with_file_name(tmp_name)
}

/// Buffered write into a temporary file, renamed over the target on commit.
struct LocalWriter {
    file: Option<fs::File>,
    tmp: PathBuf,
    target: PathBuf,
    durable: bool,
    committed: bool,
}

impl LocalWriter {
    fn file(&mut self) -> Result<&mut fs::File> {
        self.file.as_mut().ok_or_else(|| StorageError::from("Write sink already closed"))
    }

    async fn swap(&self) -> Result<()> {
        let (tmp, target) = (&self.tmp, &self.target);
        match fs::rename(tmp, target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                fs::remove_file(target)
                    .await
                    .context(format!("Failed to replace existing file: {}", target.display()))?;
                fs::rename(tmp, target).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    tmp.display(),
                    target.display()
                ))
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", tmp.display(), target.display()).into(),
                ),
            }),
        }
    }
}

#[async_trait]
impl WriteSink for LocalWriter {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.file()?.write_all(buf).await.context("Write failed")
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        let mut file = this.file.take().ok_or_else(|| StorageError::from("Write sink already closed"))?;
        file.flush().await.context("Flush failed")?;
        if this.durable {
            file.sync_all().await.context("Hardware sync failed")?;
        }
        drop(file);

        this.swap().await?;
        this.committed = true;

        if this.durable
            && let Some(parent) = this.target.parent()
        {
            LocalStorage::sync_dir(parent).await;
        }
        debug!(path = %this.target.display(), "File saved atomically");
        Ok(())
    }
}

impl Drop for LocalWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            if let Err(err) = std::fs::remove_file(&self.tmp)
                && err.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %self.tmp.display(), error = %err, "Failed to discard uncommitted write");
            }
        }
    }
}
