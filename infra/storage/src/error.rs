use std::borrow::Cow;

/// A specialized [`StorageError`] enum of this crate.
///
/// Every variant that concerns a stored object carries the offending `path`.
/// [`StorageError::NotFound`] and [`StorageError::Expired`] both satisfy
/// [`StorageError::is_absent`], but render differently so callers can tell
/// "never existed" from "existed but stale".
#[depot_derive::depot_error]
pub enum StorageError {
    #[absent]
    #[error("storage {path}: path does not exist{}", format_context(.context))]
    NotFound { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[absent]
    #[error("storage {path}: path exists, but is expired{}", format_context(.context))]
    Expired { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("storage {path}: deadline exceeded{}", format_context(.context))]
    DeadlineExceeded { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("storage {path}: operation cancelled{}", format_context(.context))]
    Cancelled { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("storage {path}: path traversal security violation{}", format_context(.context))]
    PathTraversal { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Credentials missing{}: {message}", format_context(.context))]
    CredentialsMissing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Not implemented{}: {message}", format_context(.context))]
    NotImplemented { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid storage url{}: {message}", format_context(.context))]
    InvalidUrl { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Backend failure{}: {message}", format_context(.context))]
    Backend { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Configuration failure{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Internal storage fault{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl StorageError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into().into(), context: None }
    }

    pub(crate) fn expired(path: impl Into<String>) -> Self {
        Self::Expired { path: path.into().into(), context: None }
    }

    pub(crate) fn deadline(path: impl Into<String>) -> Self {
        Self::DeadlineExceeded { path: path.into().into(), context: None }
    }

    pub(crate) fn cancelled(path: impl Into<String>) -> Self {
        Self::Cancelled { path: path.into().into(), context: None }
    }

    /// Rewrites the carried path from an inner storage's view back to the
    /// caller's, for decorators that prepend `prefix`.
    #[must_use]
    pub(crate) fn strip_path_prefix(mut self, prefix: &str) -> Self {
        if let Self::NotFound { path, .. }
        | Self::Expired { path, .. }
        | Self::DeadlineExceeded { path, .. }
        | Self::Cancelled { path, .. }
        | Self::PathTraversal { path, .. } = &mut self
            && let Some(rest) = path.strip_prefix(prefix).map(str::to_owned)
        {
            *path = rest.into();
        }
        self
    }

    /// Maps an I/O error for `path`, folding `NotFound` into the storage taxonomy.
    pub(crate) fn from_io(path: &str, err: std::io::Error, op: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::not_found(path);
        }
        Self::Io { source: err, context: Some(format!("{op} failed: {path}").into()) }
    }
}

/// Returns `true` if the error indicates the path is absent or expired.
#[must_use]
pub const fn is_not_exist(err: &StorageError) -> bool {
    err.is_absent()
}
