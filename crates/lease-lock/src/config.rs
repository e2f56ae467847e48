//! Manager configuration.

use std::time::Duration;

use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::traits::LeaseStore;
use lease_lock_core::types::ConsistencyLevel;

use crate::manager::LockManager;

/// Immutable settings shared by every lock a [`LockManager`] produces.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Time-to-live stamped on each lease; the lease expires server-side
    /// this long after its last renewal.
    pub ttl: Duration,
    /// Advisory replication factor for the store binding. The memory binding
    /// ignores it; real bindings consult it when setting up their namespace.
    pub replication_factor: u32,
    /// Consistency level for lease reads.
    pub read_consistency: ConsistencyLevel,
    /// Consistency level for lease writes (acquire, renewal, release).
    pub write_consistency: ConsistencyLevel,
    /// Number of background renewal workers.
    pub renewal_workers: usize,
    /// Cadence at which held leases are renewed. Strictly less than `ttl`.
    pub renewal_interval: Duration,
    /// Lower bound of the contention backoff sleep.
    pub min_backoff: Duration,
    /// Upper bound of the contention backoff sleep.
    pub max_backoff: Duration,
}

/// Builder for [`LockManager`] configuration.
///
/// # Example
///
/// ```rust,ignore
/// let manager = LockManagerBuilder::new()
///     .ttl(Duration::from_secs(30))
///     .renewal_workers(2)
///     .write_consistency(ConsistencyLevel::Quorum)
///     .build(store)?;
/// ```
#[derive(Debug, Clone)]
pub struct LockManagerBuilder {
    ttl: Duration,
    replication_factor: u32,
    read_consistency: ConsistencyLevel,
    write_consistency: ConsistencyLevel,
    renewal_workers: usize,
    renewal_interval: Option<Duration>,
    min_backoff: Duration,
    max_backoff: Duration,
}

impl LockManagerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            replication_factor: 1,
            read_consistency: ConsistencyLevel::Quorum,
            write_consistency: ConsistencyLevel::Quorum,
            renewal_workers: 1,
            renewal_interval: None,
            min_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }

    /// Sets the lease time-to-live. Must be greater than zero.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the advisory replication factor.
    pub fn replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = factor;
        self
    }

    /// Sets the consistency level for lease reads.
    pub fn read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.read_consistency = level;
        self
    }

    /// Sets the consistency level for lease writes.
    pub fn write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.write_consistency = level;
        self
    }

    /// Sets the number of renewal workers. Must be at least one.
    pub fn renewal_workers(mut self, workers: usize) -> Self {
        self.renewal_workers = workers;
        self
    }

    /// Sets the renewal cadence. Defaults to half the ttl; must stay
    /// strictly below it or leases expire between renewals.
    pub fn renewal_interval(mut self, interval: Duration) -> Self {
        self.renewal_interval = Some(interval);
        self
    }

    /// Sets the contention backoff bounds.
    pub fn backoff(mut self, min: Duration, max: Duration) -> Self {
        self.min_backoff = min;
        self.max_backoff = max;
        self
    }

    /// Builds the manager, failing fast on invalid settings.
    ///
    /// Must be called within a Tokio runtime; the renewal workers are
    /// spawned here.
    pub fn build<S: LeaseStore>(self, store: S) -> LockResult<LockManager<S>> {
        if self.ttl.is_zero() {
            return Err(LockError::InvalidConfig(
                "ttl must be greater than zero".to_string(),
            ));
        }
        if self.renewal_workers == 0 {
            return Err(LockError::InvalidConfig(
                "at least one renewal worker is required".to_string(),
            ));
        }
        let renewal_interval = self.renewal_interval.unwrap_or(self.ttl / 2);
        if renewal_interval.is_zero() || renewal_interval >= self.ttl {
            return Err(LockError::InvalidConfig(format!(
                "renewal interval {:?} must be nonzero and strictly less than ttl {:?}",
                renewal_interval, self.ttl
            )));
        }
        if self.min_backoff > self.max_backoff {
            return Err(LockError::InvalidConfig(format!(
                "min backoff {:?} exceeds max backoff {:?}",
                self.min_backoff, self.max_backoff
            )));
        }

        let config = LockConfig {
            ttl: self.ttl,
            replication_factor: self.replication_factor,
            read_consistency: self.read_consistency,
            write_consistency: self.write_consistency,
            renewal_workers: self.renewal_workers,
            renewal_interval,
            min_backoff: self.min_backoff,
            max_backoff: self.max_backoff,
        };

        Ok(LockManager::from_parts(store, config))
    }
}

impl Default for LockManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
