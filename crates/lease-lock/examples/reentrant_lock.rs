//! Example: reentrant locking over the in-memory lease store
//!
//! Run with: `cargo run --example reentrant_lock`

use std::time::Duration;

use lease_lock::{ConsistencyLevel, LockManagerBuilder};
use lease_lock_memory::MemoryLeaseStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manager = LockManagerBuilder::new()
        .ttl(Duration::from_secs(5))
        .renewal_workers(1)
        .read_consistency(ConsistencyLevel::One)
        .write_consistency(ConsistencyLevel::One)
        .build(MemoryLeaseStore::new())?;

    // Locks are named by tenant/resource pair.
    let lock = manager.create_lock("tenant-a", "order-42");
    println!("Created lock for {}", lock.path());

    // Acquire twice; the second acquisition is a local increment.
    lock.lock().await?;
    lock.lock().await?;
    println!("Held with reentrancy count {}", lock.hold_count());

    // A second handle is a different holder and must wait its turn.
    let contender = manager.create_lock("tenant-a", "order-42");
    let acquired = contender.try_lock(Duration::ZERO).await?;
    println!("Contender try_lock while held: {}", acquired);

    // Both levels must be released before the lease is freed.
    lock.unlock().await?;
    println!("Released once, count now {}", lock.hold_count());
    lock.unlock().await?;
    println!("Fully released");

    let acquired = contender.try_lock(Duration::from_millis(100)).await?;
    println!("Contender try_lock after release: {}", acquired);
    if acquired {
        contender.unlock().await?;
    }

    Ok(())
}
