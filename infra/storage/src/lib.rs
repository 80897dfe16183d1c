//! A composable file-object storage layer.
//!
//! Every backend and decorator implements the same [`Storage`] trait, so a
//! chain such as *local directory → prefix → cache-aside → timeout → log* is
//! just nested values behind a [`DynStorage`].
//!
//! # Core Features
//!
//! - **Capability scopes**: [`Scope`] is a bitmask of read/write/delete/sign
//!   permissions, widened to what a backend's native tier actually grants.
//! - **Scoped handle cache**: [`ScopedHandleCache`] builds one authenticated
//!   handle lazily and rebuilds it only when a wider scope is needed.
//! - **Cache-aside**: [`CacheWrapper`] serves reads from a fast store while
//!   fresh and refills it from the source otherwise.
//! - **Bounded walks**: [`walk_n`] fans enumeration out over a fixed number of
//!   workers with first-error short-circuit.
//! - **Pass-through decorators**: prefix, timeout, log, trace, stats, and slow.
//! - **URL dispatch**: [`Locator`] maps `gs://`, `s3://`, `file://`, `mem://`
//!   and bare paths onto backends; [`DepotBuilder`] assembles the chain.
//!
//! # Examples
//!
//! ```rust
//! use depot_storage::{
//!     CacheOptions, Context, DepotBuilder, Locator, StorageError, WriterOptions, read, write,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let storage = DepotBuilder::new()
//!         .locator(Locator::Local { root })
//!         .cache(Locator::Memory, CacheOptions::default())
//!         .connect()
//!         .await?;
//!
//!     let ctx = Context::background();
//!     write(&ctx, storage.as_ref(), "reports/q1.csv", b"a,b\n1,2\n", &WriterOptions::default()).await?;
//!
//!     // First read fills the cache; the second is served from memory.
//!     assert_eq!(read(&ctx, storage.as_ref(), "reports/q1.csv").await?, b"a,b\n1,2\n");
//!     assert_eq!(read(&ctx, storage.as_ref(), "reports/q1.csv").await?, b"a,b\n1,2\n");
//!     Ok(())
//! }
//! ```
//!
//! ```rust
//! use depot_storage::{Context, MemoryStorage, Storage, StorageError, is_not_exist};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryStorage::new();
//! let err = store.open(&Context::background(), "nope", &Default::default()).await.unwrap_err();
//! assert!(is_not_exist(&err));
//! assert!(matches!(err, StorageError::NotFound { .. }));
//! # }
//! ```

mod attributes;
pub mod backend;
mod builder;
mod cache;
mod context;
mod error;
mod file;
mod handle;
mod scope;
pub mod settings;
mod storage;
mod walk;
pub mod wrappers;

pub use attributes::{
    Attributes, DEFAULT_SIGN_EXPIRY, DEFAULT_SIGN_METHOD, ReaderOptions, SignedUrlOptions, WriterOptions,
};
pub use backend::{LocalStorage, MemoryStorage, RemoteStorage};
pub use builder::{DepotBuilder, Locator, NoUrl, WithUrl};
pub use cache::{CacheOptions, CacheWrapper};
pub use context::{CancelHandle, Context};
pub use error::{Result, StorageError, StorageErrorExt, is_not_exist};
pub use file::{ByteStream, File, WriteSink, Writer, copy_into};
pub use handle::ScopedHandleCache;
pub use scope::{CloudStorageTiers, FlatTiers, NativeTier, Scope, ScopeMapping};
pub use settings::{DepotConfig, load_config};
pub use storage::{DynStorage, Storage, Visitor, visitor};
pub use walk::{DEFAULT_WALK_CONCURRENCY, exists, list, read, remove_all, walk_n, write};
pub use wrappers::{
    LogWrapper, MetricSink, Observation, Op, OpStats, PrefixWrapper, SlowWrapper, StatsWrapper, TimeoutWrapper,
    Timeouts, TraceWrapper,
};
