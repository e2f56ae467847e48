//! Background lease renewal.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lease_lock_core::token::OwnerToken;
use lease_lock_core::traits::LeaseStore;
use lease_lock_core::types::{ConsistencyLevel, PutOutcome, ResourcePath};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// A lease currently kept alive by the pool.
struct Renewal {
    token: OwnerToken,
    lost: watch::Sender<bool>,
}

/// Fixed-size pool of background workers that periodically re-put every held
/// lease with its original token, refreshing the expiry.
///
/// Paths are partitioned across workers by stable hash. Renewal for a path
/// stops the moment it is deregistered; repeated renewal failures are logged
/// but not masked, so a lease can expire server-side while still believed
/// held locally.
pub(crate) struct HeartbeatPool {
    leases: Arc<Mutex<HashMap<ResourcePath, Renewal>>>,
    workers: Vec<JoinHandle<()>>,
}

impl HeartbeatPool {
    /// Spawns `worker_count` renewal workers ticking every `interval`.
    pub(crate) fn start<S: LeaseStore>(
        store: Arc<S>,
        worker_count: usize,
        interval: Duration,
        ttl: Duration,
        consistency: ConsistencyLevel,
    ) -> Self {
        let leases: Arc<Mutex<HashMap<ResourcePath, Renewal>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let mut workers = Vec::with_capacity(worker_count);

        for worker_idx in 0..worker_count {
            let store = Arc::clone(&store);
            let leases = Arc::clone(&leases);

            workers.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

                loop {
                    ticker.tick().await;
                    renew_shard(
                        store.as_ref(),
                        &leases,
                        worker_idx,
                        worker_count,
                        ttl,
                        consistency,
                    )
                    .await;
                }
            }));
        }

        Self { leases, workers }
    }

    /// Registers a lease for renewal, returning its loss signal.
    ///
    /// The receiver flips to `true` if a renewal ever observes the lease
    /// owned by a different token.
    pub(crate) fn register(
        &self,
        path: ResourcePath,
        token: OwnerToken,
    ) -> watch::Receiver<bool> {
        let (lost, receiver) = watch::channel(false);
        self.leases
            .lock()
            .unwrap()
            .insert(path, Renewal { token, lost });
        receiver
    }

    /// Stops renewing `path`. Called before the release delete is issued so
    /// renewal never outlives the hold.
    pub(crate) fn deregister(&self, path: &ResourcePath) {
        self.leases.lock().unwrap().remove(path);
    }
}

impl Drop for HeartbeatPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// Renews every registered lease belonging to this worker's shard.
async fn renew_shard<S: LeaseStore>(
    store: &S,
    leases: &Mutex<HashMap<ResourcePath, Renewal>>,
    worker_idx: usize,
    worker_count: usize,
    ttl: Duration,
    consistency: ConsistencyLevel,
) {
    // Snapshot the shard so the map is never held across an await.
    let due: Vec<(ResourcePath, OwnerToken)> = leases
        .lock()
        .unwrap()
        .iter()
        .filter(|(path, _)| shard_of(path, worker_count) == worker_idx)
        .map(|(path, renewal)| (path.clone(), renewal.token.clone()))
        .collect();

    for (path, token) in due {
        match store.conditional_put(&path, &token, ttl, consistency).await {
            Ok(PutOutcome::Stored) => {}
            Ok(PutOutcome::Conflict) => {
                // The lease expired and was taken over. Stop renewing and
                // flag the loss; the local count is reconciled at release.
                warn!(path = %path, "lease lost during renewal");
                if let Some(renewal) = leases.lock().unwrap().remove(&path) {
                    let _ = renewal.lost.send(true);
                }
            }
            Err(err) => {
                // Keep the registration and retry next tick. If the store
                // stays unreachable the lease expires server-side.
                warn!(path = %path, error = %err, "lease renewal failed");
            }
        }
    }
}

fn shard_of(path: &ResourcePath, worker_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() as usize) % worker_count
}
