//! In-memory lease store.
//!
//! A single-process [`LeaseStore`] backed by a mutexed map, serving the
//! zero-infrastructure role in tests, examples, and benchmarks. Expiry is
//! lazy: an expired record counts as free and is overwritten by the next
//! acquisition. There is only one copy, so consistency levels are accepted
//! and ignored.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::token::OwnerToken;
use lease_lock_core::traits::LeaseStore;
use lease_lock_core::types::{
    ConsistencyLevel, DeleteOutcome, LeaseRecord, PutOutcome, ResourcePath,
};

struct Inner {
    leases: HashMap<ResourcePath, LeaseRecord>,
    offline: bool,
}

/// Single-process lease store.
///
/// Cloning shares the underlying map, so clones model independent clients of
/// one store.
#[derive(Clone)]
pub struct MemoryLeaseStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                leases: HashMap::new(),
                offline: false,
            })),
        }
    }

    /// Makes every subsequent operation fail with
    /// [`LockError::StoreUnavailable`] until switched back, for exercising
    /// infrastructure-failure paths.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Force-expires the lease for `path`, as if its ttl had elapsed.
    /// Returns whether a lease was present. Collapses the expiry wait in
    /// tests.
    pub fn expire_now(&self, path: &ResourcePath) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.leases.get_mut(path) {
            Some(record) => {
                record.expires_at = SystemTime::now() - Duration::from_millis(1);
                true
            }
            None => false,
        }
    }

    /// Paths currently holding a non-expired lease.
    pub fn held_paths(&self) -> Vec<ResourcePath> {
        let now = SystemTime::now();
        self.inner
            .lock()
            .unwrap()
            .leases
            .iter()
            .filter(|(_, record)| !record.is_expired(now))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_online(inner: &Inner) -> LockResult<()> {
        if inner.offline {
            Err(LockError::store_unavailable(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory lease store is offline",
            )))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore for MemoryLeaseStore {
    async fn conditional_put(
        &self,
        path: &ResourcePath,
        token: &OwnerToken,
        ttl: Duration,
        _consistency: ConsistencyLevel,
    ) -> LockResult<PutOutcome> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_online(&inner)?;

        let now = SystemTime::now();
        match inner.leases.get(path) {
            Some(record) if !record.is_expired(now) && record.owner_token != *token => {
                Ok(PutOutcome::Conflict)
            }
            _ => {
                // Free (absent or expired) or a renewal by the same token.
                inner.leases.insert(
                    path.clone(),
                    LeaseRecord::new(path.clone(), token.clone(), ttl),
                );
                Ok(PutOutcome::Stored)
            }
        }
    }

    async fn conditional_delete(
        &self,
        path: &ResourcePath,
        token: &OwnerToken,
        _consistency: ConsistencyLevel,
    ) -> LockResult<DeleteOutcome> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_online(&inner)?;

        match inner.leases.get(path) {
            Some(record) if record.owner_token == *token => {
                inner.leases.remove(path);
                Ok(DeleteOutcome::Deleted)
            }
            _ => Ok(DeleteOutcome::Mismatch),
        }
    }

    async fn get(
        &self,
        path: &ResourcePath,
        _consistency: ConsistencyLevel,
    ) -> LockResult<Option<LeaseRecord>> {
        let inner = self.inner.lock().unwrap();
        Self::check_online(&inner)?;

        let now = SystemTime::now();
        Ok(inner
            .leases
            .get(path)
            .filter(|record| !record.is_expired(now))
            .cloned())
    }
}
