//! Bounded-concurrency enumeration and convenience helpers over any [`Storage`].

use crate::attributes::{ReaderOptions, WriterOptions};
use crate::context::Context;
use crate::error::{Result, StorageError};
use crate::storage::{DynStorage, Storage, Visitor, visitor};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Worker count used when none is configured.
pub const DEFAULT_WALK_CONCURRENCY: usize = 8;

/// Holds the first error reported by any worker; later ones are discarded.
#[derive(Default)]
struct FirstError {
    slot: Mutex<Option<StorageError>>,
    tripped: AtomicBool,
}

impl FirstError {
    fn record(&self, err: StorageError) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(err);
            self.tripped.store(true, Ordering::Release);
        }
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<StorageError> {
        self.slot.lock().take()
    }
}

/// Visits everything below `path` with at most `concurrency` visits in flight.
///
/// The backend's own (sequential) walk feeds a bounded queue drained by the
/// worker pool. The first visit error stops dispatch, in-flight visits run to
/// completion, and that error is returned. On success every enumerated path
/// has been visited exactly once. Visit order across workers is unspecified.
/// A `concurrency` of zero is treated as one.
///
/// # Errors
/// The first visit error, otherwise any error from the native walk.
pub async fn walk_n(
    ctx: &Context,
    storage: &dyn Storage,
    path: &str,
    concurrency: usize,
    visit: Visitor,
) -> Result<()> {
    let workers = concurrency.max(1);
    let (tx, rx) = mpsc::channel::<String>(workers);
    let rx = Arc::new(AsyncMutex::new(rx));
    let failure = Arc::new(FirstError::default());

    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let rx = Arc::clone(&rx);
        let failure = Arc::clone(&failure);
        let visit = Arc::clone(&visit);
        pool.spawn(async move {
            loop {
                let next = rx.lock().await.recv().await;
                let Some(item) = next else { break };
                // Drain without visiting once a worker has failed.
                if failure.is_tripped() {
                    continue;
                }
                if let Err(err) = visit(item).await {
                    failure.record(err);
                }
            }
        });
    }

    let producer = {
        let failure = Arc::clone(&failure);
        visitor(move |item| {
            let tx = tx.clone();
            let failure = Arc::clone(&failure);
            async move {
                if failure.is_tripped() {
                    return Err(StorageError::cancelled(item));
                }
                tx.send(item).await.map_err(|e| StorageError::cancelled(e.0))
            }
        })
    };

    let walked = storage.walk(ctx, path, producer).await;

    while let Some(joined) = pool.join_next().await {
        if let Err(err) = joined {
            warn!(path, error = %err, "Walk worker aborted");
            failure.record(StorageError::Internal {
                message: format!("walk worker aborted: {err}").into(),
                context: None,
            });
        }
    }

    if let Some(err) = failure.take() {
        debug!(path, error = %err, "Bounded walk stopped early");
        return Err(err);
    }
    walked
}

/// Returns whether `path` exists. Expired entries count as absent.
///
/// # Errors
/// Any failure other than absence.
pub async fn exists(ctx: &Context, storage: &dyn Storage, path: &str) -> Result<bool> {
    match storage.attributes(ctx, path, &ReaderOptions::default()).await {
        Ok(_) => Ok(true),
        Err(err) if err.is_absent() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Reads the whole object at `path`.
///
/// # Errors
/// Open or read failures.
pub async fn read(ctx: &Context, storage: &dyn Storage, path: &str) -> Result<Vec<u8>> {
    storage.open(ctx, path, &ReaderOptions::default()).await?.read_to_end().await
}

/// Writes `data` to `path` and commits it.
///
/// # Errors
/// Create, write, or commit failures.
pub async fn write(
    ctx: &Context,
    storage: &dyn Storage,
    path: &str,
    data: &[u8],
    options: &WriterOptions,
) -> Result<()> {
    let mut sink = storage.create(ctx, path, options).await?;
    sink.write_all(data).await?;
    sink.commit().await
}

/// Lists everything below `path`, sorted.
///
/// # Errors
/// Any error from the native walk.
pub async fn list(ctx: &Context, storage: &dyn Storage, path: &str) -> Result<Vec<String>> {
    let found = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&found);
    storage
        .walk(
            ctx,
            path,
            visitor(move |item| {
                sink.lock().push(item);
                futures::future::ready(Ok(()))
            }),
        )
        .await?;

    let mut paths = std::mem::take(&mut *found.lock());
    paths.sort_unstable();
    Ok(paths)
}

/// Deletes everything below `path`.
///
/// # Errors
/// The first delete failure, or any error from the native walk.
pub async fn remove_all(ctx: &Context, storage: DynStorage, path: &str) -> Result<()> {
    let target = Arc::clone(&storage);
    let scope = ctx.clone();
    walk_n(
        ctx,
        storage.as_ref(),
        path,
        DEFAULT_WALK_CONCURRENCY,
        visitor(move |item| {
            let target = Arc::clone(&target);
            let ctx = scope.clone();
            async move { target.delete(&ctx, &item).await }
        }),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use std::collections::BTreeSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    async fn seeded(count: usize) -> MemoryStorage {
        let store = MemoryStorage::new();
        let ctx = Context::background();
        for i in 0..count {
            write(&ctx, &store, &format!("tree/{i:02}/leaf"), b"x", &WriterOptions::default())
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn visits_every_entry_once_for_any_width() {
        let store = seeded(37).await;
        let expected: BTreeSet<String> = (0..37).map(|i| format!("tree/{i:02}/leaf")).collect();

        for width in [1, 2, 3, 7, 37, 50] {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let active = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let visit = {
                let (seen, active, peak) = (Arc::clone(&seen), Arc::clone(&active), Arc::clone(&peak));
                visitor(move |p| {
                    let (seen, active, peak) = (Arc::clone(&seen), Arc::clone(&active), Arc::clone(&peak));
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        seen.lock().push(p);
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
            };

            walk_n(&Context::background(), &store, "tree/", width, visit).await.unwrap();

            let seen = seen.lock();
            assert_eq!(seen.len(), 37, "width {width} visited duplicates or dropped items");
            assert_eq!(seen.iter().cloned().collect::<BTreeSet<_>>(), expected);
            assert!(peak.load(Ordering::SeqCst) <= width, "width {width} exceeded");
        }
    }

    #[tokio::test]
    async fn first_error_stops_dispatch() {
        let store = seeded(20).await;
        let visited = Arc::new(AtomicUsize::new(0));

        let visit = {
            let visited = Arc::clone(&visited);
            visitor(move |p| {
                let visited = Arc::clone(&visited);
                async move {
                    visited.fetch_add(1, Ordering::SeqCst);
                    if p == "tree/04/leaf" {
                        return Err(StorageError::Backend { message: "boom".into(), context: None });
                    }
                    Ok(())
                }
            })
        };

        let err = walk_n(&Context::background(), &store, "tree/", 1, visit).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { ref message, .. } if message == "boom"));
        assert_eq!(visited.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn zero_width_behaves_like_one() {
        let store = seeded(3).await;
        let count = Arc::new(AtomicUsize::new(0));
        let visit = {
            let count = Arc::clone(&count);
            visitor(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                futures::future::ready(Ok(()))
            })
        };
        walk_n(&Context::background(), &store, "", 0, visit).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_context_surfaces_cancellation() {
        let store = seeded(3).await;
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();

        let err = walk_n(&ctx, &store, "", 2, visitor(|_| futures::future::ready(Ok(()))))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn helpers_cover_the_basic_lifecycle() {
        let store: Arc<dyn Storage> = Arc::new(seeded(4).await);
        let ctx = Context::background();

        assert!(exists(&ctx, store.as_ref(), "tree/00/leaf").await.unwrap());
        assert!(!exists(&ctx, store.as_ref(), "tree/99/leaf").await.unwrap());
        assert_eq!(read(&ctx, store.as_ref(), "tree/01/leaf").await.unwrap(), b"x");
        assert_eq!(list(&ctx, store.as_ref(), "tree/0").await.unwrap().len(), 4);

        remove_all(&ctx, Arc::clone(&store), "tree/").await.unwrap();
        assert!(list(&ctx, store.as_ref(), "").await.unwrap().is_empty());
    }
}
