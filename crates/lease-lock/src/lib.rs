//! Reentrant distributed locks arbitrated by a shared lease store.
//!
//! Many processes coordinate exclusive access to a named resource (a
//! tenant/resource pair) through a replicated key-value store that offers
//! conditional writes and per-entry expiry. The store is the only authority:
//! whoever wins the conditional put holds the lease, a background pool keeps
//! renewing it, and crash recovery is passive expiry.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lease_lock::LockManager;
//! use lease_lock_memory::MemoryLeaseStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = LockManager::new(MemoryLeaseStore::new())?;
//!
//!     // Create a lock by tenant/resource pair
//!     let lock = manager.create_lock("tenant-a", "entity-1");
//!
//!     // Blocking acquire; reentrant for the same holder
//!     lock.lock().await?;
//!     lock.lock().await?;
//!
//!     // Bounded acquire from elsewhere fails while held
//!     let other = manager.create_lock("tenant-a", "entity-1");
//!     assert!(!other.try_lock(Duration::ZERO).await?);
//!
//!     // Both levels must be released before the lease is freed
//!     lock.unlock().await?;
//!     lock.unlock().await?;
//!     Ok(())
//! }
//! ```

mod backoff;
mod heartbeat;

pub mod config;
pub mod lock;
pub mod manager;

pub use config::{LockConfig, LockManagerBuilder};
pub use lease_lock_core::prelude::*;
pub use lock::Lock;
pub use manager::LockManager;
