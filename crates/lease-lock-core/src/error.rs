//! Error types for lease lock operations.

use thiserror::Error;

/// Errors that can occur while acquiring, holding, or releasing a lock.
///
/// Contention is not an error: `try_lock` reports it as `Ok(false)` and
/// `lock` keeps retrying through it.
#[derive(Error, Debug)]
pub enum LockError {
    /// Manager configuration was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The lease store could not be reached or failed the operation.
    #[error("lease store unavailable: {0}")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The caller misused the lock API, e.g. released with nothing held.
    #[error("lock protocol violation: {0}")]
    ProtocolViolation(String),
}

impl LockError {
    /// Wraps a backend failure as [`LockError::StoreUnavailable`].
    pub fn store_unavailable(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StoreUnavailable(source.into())
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
