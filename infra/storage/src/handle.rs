//! Lazily-built, scope-escalating cache of one backend handle.
//!
//! The cache is either empty or holds `(scope, handle)`. A request whose scope
//! is already covered is served from a shared read lock. Anything wider
//! serializes on a build mutex, re-checks, resolves
//! `existing ∪ requested` through the backend's [`ScopeMapping`], connects,
//! and only then replaces the entry. A failed or cancelled build leaves the
//! previous entry in place.

use crate::context::Context;
use crate::error::Result;
use crate::scope::{Scope, ScopeMapping};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct Entry<H: ?Sized> {
    scope: Scope,
    handle: Arc<H>,
}

pub struct ScopedHandleCache<H: ?Sized> {
    name: String,
    mapping: Arc<dyn ScopeMapping>,
    slot: RwLock<Option<Entry<H>>>,
    build: Mutex<()>,
}

impl<H: ?Sized> fmt::Debug for ScopedHandleCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedHandleCache")
            .field("name", &self.name)
            .field("mapping", &self.mapping)
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

impl<H: ?Sized> ScopedHandleCache<H> {
    /// Creates an empty cache. `name` labels errors and log events.
    pub fn new(name: impl Into<String>, mapping: Arc<dyn ScopeMapping>) -> Self {
        Self { name: name.into(), mapping, slot: RwLock::new(None), build: Mutex::new(()) }
    }

    /// Scope of the installed handle, if any.
    pub fn scope(&self) -> Option<Scope> {
        self.slot.read().as_ref().map(|entry| entry.scope)
    }

    fn lookup(&self, requested: Scope) -> Option<Arc<H>> {
        self.slot
            .read()
            .as_ref()
            .filter(|entry| entry.scope.has(requested))
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Returns a handle authorized for at least `requested`, building one if needed.
    ///
    /// `connect` receives the resolved scope to authenticate for. It runs under
    /// `ctx`, so a deadline or cancellation aborts it and installs nothing.
    ///
    /// # Errors
    /// Whatever `connect` fails with, or the context's deadline/cancellation error.
    pub async fn acquire<F, Fut>(&self, ctx: &Context, requested: Scope, connect: F) -> Result<Arc<H>>
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = Result<Arc<H>>>,
    {
        if let Some(handle) = self.lookup(requested) {
            return Ok(handle);
        }

        let _guard = ctx.run(&self.name, async { Ok(self.build.lock().await) }).await?;

        // Another caller may have upgraded while we waited.
        if let Some(handle) = self.lookup(requested) {
            return Ok(handle);
        }

        let existing = self.scope().unwrap_or_default();
        let target = (existing | requested).resolve(self.mapping.as_ref());
        debug!(name = %self.name, existing = %existing, requested = %requested, target = %target, "Building storage handle");

        let handle = ctx.run(&self.name, connect(target)).await?;
        *self.slot.write() = Some(Entry { scope: target, handle: Arc::clone(&handle) });

        info!(name = %self.name, scope = %target, "Installed storage handle");
        Ok(handle)
    }
}
