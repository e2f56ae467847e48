//! Core traits for lease-backed locks.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;
use crate::token::OwnerToken;
use crate::types::{ConsistencyLevel, DeleteOutcome, LeaseRecord, PutOutcome, ResourcePath};

/// A quorum-consistent key-value store acting as the arbiter of lease
/// ownership.
///
/// The locking algorithm never coordinates in-process; mutual exclusion is
/// delegated entirely to this contract. The store guarantees that at most one
/// non-expired [`LeaseRecord`] exists per path, enforced by the conditional
/// put below. Any store with compare-and-swap writes and per-entry expiry can
/// satisfy it.
///
/// # Example
///
/// ```rust,ignore
/// match store.conditional_put(&path, &token, ttl, ConsistencyLevel::Quorum).await? {
///     PutOutcome::Stored => { /* we own the lease */ }
///     PutOutcome::Conflict => { /* someone else holds it */ }
/// }
/// ```
pub trait LeaseStore: Send + Sync + 'static {
    /// Stores a fresh lease for `path` if it is free (absent or expired), or
    /// refreshes the expiry when the stored token equals `token` (renewal).
    ///
    /// A valid lease under a different token yields [`PutOutcome::Conflict`]
    /// and leaves the record untouched.
    fn conditional_put(
        &self,
        path: &ResourcePath,
        token: &OwnerToken,
        ttl: Duration,
        consistency: ConsistencyLevel,
    ) -> impl Future<Output = LockResult<PutOutcome>> + Send;

    /// Removes the lease for `path` only if the stored token equals `token`.
    ///
    /// Returns [`DeleteOutcome::Mismatch`] when the record is absent or owned
    /// by a different token, so a stale holder cannot delete a lease that was
    /// re-acquired after expiry.
    fn conditional_delete(
        &self,
        path: &ResourcePath,
        token: &OwnerToken,
        consistency: ConsistencyLevel,
    ) -> impl Future<Output = LockResult<DeleteOutcome>> + Send;

    /// Reads the current lease for `path`, if a non-expired one exists.
    fn get(
        &self,
        path: &ResourcePath,
        consistency: ConsistencyLevel,
    ) -> impl Future<Output = LockResult<Option<LeaseRecord>>> + Send;
}
