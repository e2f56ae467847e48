//! Reentrant lock handle over a shared lease store.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::timeout::Deadline;
use lease_lock_core::token::{HolderId, OwnerToken};
use lease_lock_core::traits::LeaseStore;
use lease_lock_core::types::{DeleteOutcome, PutOutcome, ResourcePath};
use tokio::sync::watch;
use tracing::{Span, instrument, warn};

use crate::backoff::Backoff;
use crate::manager::{HeldLease, ManagerShared};

/// What a release step resolved to under the registry mutex.
enum Release {
    Decremented,
    Final(OwnerToken),
}

/// Handle bound to one resource path.
///
/// The lock is reentrant per holder: while a `(path, holder)` pair already
/// holds the lease, further acquisitions increment a local count with no
/// remote call, and the lease is released only when an equal number of
/// [`unlock`](Self::unlock) calls have drained the count. Handles created
/// with [`LockManager::create_lock`](crate::LockManager::create_lock) each
/// get their own holder identity and therefore contend with each other.
///
/// Dropping the last live handle for a holder that still holds the lease
/// abandons it: renewal stops and the record expires server-side. Dropping
/// one of several sibling handles sharing a holder leaves the hold intact.
/// `unlock` is the prompt path either way.
pub struct Lock<S> {
    shared: Arc<ManagerShared<S>>,
    path: ResourcePath,
    holder: HolderId,
}

impl<S: LeaseStore> Lock<S> {
    pub(crate) fn new(
        shared: Arc<ManagerShared<S>>,
        path: ResourcePath,
        holder: HolderId,
    ) -> Self {
        *shared
            .handles
            .lock()
            .unwrap()
            .entry((path.clone(), holder.clone()))
            .or_insert(0) += 1;

        Self {
            shared,
            path,
            holder,
        }
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    /// Current reentrancy depth held by this handle's holder.
    pub fn hold_count(&self) -> u32 {
        self.shared
            .held
            .lock()
            .unwrap()
            .get(&self.registry_key())
            .map(|held| held.count)
            .unwrap_or(0)
    }

    /// Signal that flips to `true` if background renewal observes the lease
    /// lost while still held locally. `None` when nothing is held.
    ///
    /// Loss is never raised as an error through the lock API; a later
    /// `unlock` simply finds the stored token mismatched and skips the
    /// delete.
    pub fn loss_signal(&self) -> Option<watch::Receiver<bool>> {
        self.shared
            .held
            .lock()
            .unwrap()
            .get(&self.registry_key())
            .map(|held| held.lost.clone())
    }

    /// Blocking acquire.
    ///
    /// Returns immediately when this holder already holds the lease
    /// (incrementing the count). Otherwise races a conditional put against
    /// all other contenders, retrying with randomized backoff until it wins;
    /// there is no implicit deadline. First successful put wins, with no
    /// fairness ordering among waiters. Store failures abort the wait.
    #[instrument(skip(self), fields(lock.path = %self.path, holder = %self.holder, elapsed_ms = tracing::field::Empty))]
    pub async fn lock(&self) -> LockResult<()> {
        let start = Instant::now();
        let acquired = self.acquire(Deadline::Unbounded).await?;
        debug_assert!(acquired, "unbounded acquire cannot time out");
        Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);
        Ok(())
    }

    /// Bounded acquire.
    ///
    /// Same algorithm as [`lock`](Self::lock) but gives up once `timeout`
    /// elapses, returning `false` with no state mutated. A zero timeout
    /// makes exactly one attempt. Returns `true` only if the lease was
    /// acquired or this holder already held it.
    #[instrument(skip(self), fields(lock.path = %self.path, holder = %self.holder, timeout = ?timeout, acquired = tracing::field::Empty))]
    pub async fn try_lock(&self, timeout: Duration) -> LockResult<bool> {
        let acquired = self.acquire(Deadline::after(timeout)).await?;
        Span::current().record("acquired", acquired);
        Ok(acquired)
    }

    /// Releases one level of reentrancy.
    ///
    /// The final release deregisters renewal and then issues a token-guarded
    /// delete. A token mismatch (the lease expired and may have been
    /// re-acquired elsewhere) and store failures on this path are absorbed:
    /// the logical release already happened locally. Calling this with
    /// nothing held is a [`LockError::ProtocolViolation`] and leaves the
    /// store untouched.
    #[instrument(skip(self), fields(lock.path = %self.path, holder = %self.holder))]
    pub async fn unlock(&self) -> LockResult<()> {
        let release = {
            let mut held = self.shared.held.lock().unwrap();
            let key = self.registry_key();
            let Some(mut entry) = held.remove(&key) else {
                return Err(LockError::ProtocolViolation(format!(
                    "unlock of {} with no held lease",
                    self.path
                )));
            };

            if entry.count > 1 {
                entry.count -= 1;
                held.insert(key, entry);
                Release::Decremented
            } else {
                Release::Final(entry.token)
            }
        };

        let Release::Final(token) = release else {
            return Ok(());
        };

        // Stop renewing before touching the record.
        self.shared.heartbeat.deregister(&self.path);

        match self
            .shared
            .store
            .conditional_delete(&self.path, &token, self.shared.config.write_consistency)
            .await
        {
            Ok(DeleteOutcome::Deleted) => {}
            Ok(DeleteOutcome::Mismatch) => {
                warn!(path = %self.path, "release skipped: lease no longer owned by this holder");
            }
            Err(err) => {
                // Best-effort: the lease expires server-side on its own.
                warn!(path = %self.path, error = %err, "release delete failed");
            }
        }

        Ok(())
    }

    /// Shared acquire loop for `lock` and `try_lock`.
    async fn acquire(&self, deadline: Deadline) -> LockResult<bool> {
        let config = &self.shared.config;
        let mut backoff = Backoff::new(config.min_backoff, config.max_backoff);

        loop {
            // Reentrant fast path: no remote call when this holder already
            // holds the lease.
            if self.try_increment_held() {
                return Ok(true);
            }

            if let Some((token, lost)) = self.try_acquire_once().await? {
                self.shared.held.lock().unwrap().insert(
                    self.registry_key(),
                    HeldLease {
                        token,
                        count: 1,
                        lost,
                    },
                );
                return Ok(true);
            }

            if deadline.expired() {
                return Ok(false);
            }
            tokio::time::sleep(deadline.clamp(backoff.next_delay())).await;
        }
    }

    /// One acquisition attempt: observe the current lease at read
    /// consistency, then race a conditional put at write consistency.
    ///
    /// The read is an optimization only; the conditional put remains the
    /// arbiter when two contenders race past the read.
    async fn try_acquire_once(
        &self,
    ) -> LockResult<Option<(OwnerToken, watch::Receiver<bool>)>> {
        let config = &self.shared.config;

        if let Some(record) = self
            .shared
            .store
            .get(&self.path, config.read_consistency)
            .await?
            && !record.is_expired(SystemTime::now())
        {
            return Ok(None);
        }

        let token = OwnerToken::generate();
        match self
            .shared
            .store
            .conditional_put(&self.path, &token, config.ttl, config.write_consistency)
            .await?
        {
            PutOutcome::Stored => {
                let lost = self
                    .shared
                    .heartbeat
                    .register(self.path.clone(), token.clone());
                Ok(Some((token, lost)))
            }
            PutOutcome::Conflict => Ok(None),
        }
    }

    fn try_increment_held(&self) -> bool {
        let mut held = self.shared.held.lock().unwrap();
        if let Some(entry) = held.get_mut(&self.registry_key()) {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    fn registry_key(&self) -> (ResourcePath, HolderId) {
        (self.path.clone(), self.holder.clone())
    }
}

impl<S> Drop for Lock<S> {
    fn drop(&mut self) {
        let key = (self.path.clone(), self.holder.clone());

        // Sibling handles share the holder's hold; only the last live handle
        // may abandon it.
        {
            let mut handles = self.shared.handles.lock().unwrap();
            if let Some(count) = handles.get_mut(&key) {
                *count -= 1;
                if *count > 0 {
                    return;
                }
                handles.remove(&key);
            }
        }

        let abandoned = self.shared.held.lock().unwrap().remove(&key).is_some();
        if abandoned {
            self.shared.heartbeat.deregister(&self.path);
            warn!(path = %self.path, "last handle dropped while held; lease left to expire");
        }
    }
}
