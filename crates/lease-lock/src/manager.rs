//! Lock factory and manager-wide state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lease_lock_core::error::LockResult;
use lease_lock_core::token::{HolderId, OwnerToken};
use lease_lock_core::traits::LeaseStore;
use lease_lock_core::types::{LeaseRecord, ResourcePath};
use tokio::sync::watch;

use crate::config::{LockConfig, LockManagerBuilder};
use crate::heartbeat::HeartbeatPool;
use crate::lock::Lock;

/// A lease held by some holder, tracked for reentrancy.
pub(crate) struct HeldLease {
    pub(crate) token: OwnerToken,
    pub(crate) count: u32,
    pub(crate) lost: watch::Receiver<bool>,
}

/// State shared by the manager and every lock it produces.
pub(crate) struct ManagerShared<S> {
    pub(crate) store: Arc<S>,
    pub(crate) config: LockConfig,
    pub(crate) heartbeat: HeartbeatPool,
    /// Explicit reentrancy registry: `(path, holder)` to held lease. Handles
    /// sharing a holder share one entry.
    pub(crate) held: Mutex<HashMap<(ResourcePath, HolderId), HeldLease>>,
    /// Live handle count per `(path, holder)`, so only the last handle for a
    /// holder abandons a still-held lease on drop.
    pub(crate) handles: Mutex<HashMap<(ResourcePath, HolderId), usize>>,
}

/// Factory for reentrant, lease-backed locks sharing one store binding.
///
/// Configuration is fixed at construction and immutable afterward. The
/// manager owns the renewal worker pool; dropping the last clone stops all
/// renewal.
///
/// # Example
///
/// ```rust,ignore
/// let manager = LockManager::new(store)?;
/// let lock = manager.create_lock("tenant-a", "entity-1");
/// lock.lock().await?;
/// // exclusive access to tenant-a/entity-1 across all processes
/// lock.unlock().await?;
/// ```
pub struct LockManager<S> {
    shared: Arc<ManagerShared<S>>,
}

impl<S: LeaseStore> LockManager<S> {
    /// Creates a manager with default configuration.
    ///
    /// Must be called within a Tokio runtime. See [`LockManagerBuilder`] for
    /// the tunable settings.
    pub fn new(store: S) -> LockResult<Self> {
        LockManagerBuilder::new().build(store)
    }

    pub(crate) fn from_parts(store: S, config: LockConfig) -> Self {
        let store = Arc::new(store);
        let heartbeat = HeartbeatPool::start(
            Arc::clone(&store),
            config.renewal_workers,
            config.renewal_interval,
            config.ttl,
            config.write_consistency,
        );

        Self {
            shared: Arc::new(ManagerShared {
                store,
                config,
                heartbeat,
                held: Mutex::new(HashMap::new()),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a handle bound to `tenant/resource` under a fresh holder
    /// identity.
    ///
    /// Pure and side-effect free; nothing touches the store until `lock` or
    /// `try_lock` is called. Distinct handles contend with each other like
    /// unrelated processes.
    pub fn create_lock(&self, tenant_id: &str, resource_id: &str) -> Lock<S> {
        self.create_lock_as(HolderId::generate(), tenant_id, resource_id)
    }

    /// Same as [`create_lock`](Self::create_lock) with a caller-chosen holder
    /// identity, so several handles can share one reentrancy scope.
    ///
    /// Any sibling handle can acquire and release the shared count. Dropping
    /// one sibling leaves the hold intact; only dropping the last handle for
    /// the holder abandons a still-held lease.
    pub fn create_lock_as(
        &self,
        holder: HolderId,
        tenant_id: &str,
        resource_id: &str,
    ) -> Lock<S> {
        Lock::new(
            Arc::clone(&self.shared),
            ResourcePath::new(tenant_id, resource_id),
            holder,
        )
    }

    /// Reads the current lease for a path at the configured read consistency.
    pub async fn lease_info(
        &self,
        tenant_id: &str,
        resource_id: &str,
    ) -> LockResult<Option<LeaseRecord>> {
        let path = ResourcePath::new(tenant_id, resource_id);
        self.shared
            .store
            .get(&path, self.shared.config.read_consistency)
            .await
    }

    pub fn config(&self) -> &LockConfig {
        &self.shared.config
    }
}

impl<S> Clone for LockManager<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
