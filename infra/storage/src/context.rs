//! Operation context threaded through every storage call.
//!
//! A [`Context`] carries an optional deadline and a cancellation token
//! inherited from its parent. Backends race their network-bound futures
//! against it with [`Context::run`], which yields
//! [`StorageError::DeadlineExceeded`] or [`StorageError::Cancelled`].

use crate::error::{Result, StorageError};
use futures::future;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

/// Cancels every [`Context`] derived from the one that produced it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Context {
    /// A context that never expires and is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that expires after `timeout`, or earlier if the parent does.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = self.deadline.map_or(at, |current| current.min(at));
        Self { deadline: Some(deadline), token: self.token.clone() }
    }

    /// Derives a cancellable context. Cancelling the parent still cancels the child.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token =
            self.token.as_ref().map_or_else(CancellationToken::new, CancellationToken::child_token);
        (Self { deadline: self.deadline, token: Some(token.clone()) }, CancelHandle { token })
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    /// Fails fast if the context is already done.
    ///
    /// # Errors
    /// [`StorageError::Cancelled`] or [`StorageError::DeadlineExceeded`] for `path`.
    pub fn check(&self, path: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(StorageError::cancelled(path));
        }
        if self.is_expired() {
            return Err(StorageError::deadline(path));
        }
        Ok(())
    }

    /// Drives `fut` until it completes or the context is done, whichever comes first.
    ///
    /// The future is dropped when the context wins the race.
    ///
    /// # Errors
    /// Whatever `fut` yields, or [`StorageError::Cancelled`] /
    /// [`StorageError::DeadlineExceeded`] for `path`.
    pub async fn run<T, F>(&self, path: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(path)?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            res = fut => res,
            () = self.cancelled() => Err(StorageError::cancelled(path)),
            () = deadline => Err(StorageError::deadline(path)),
        }
    }

    /// Resolves once this context or any ancestor is cancelled.
    pub async fn cancelled(&self) {
        match &self.token {
            Some(token) => token.cancelled().await,
            None => future::pending().await,
        }
    }
}
