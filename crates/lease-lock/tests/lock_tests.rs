//! Integration tests for reentrant lock semantics over the memory store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lease_lock::{LockError, LockManager, LockManagerBuilder};
use lease_lock_memory::MemoryLeaseStore;
use tokio::time::timeout;

fn manager(store: MemoryLeaseStore) -> LockManager<MemoryLeaseStore> {
    LockManagerBuilder::new()
        .ttl(Duration::from_secs(2))
        .backoff(Duration::from_millis(1), Duration::from_millis(20))
        .build(store)
        .unwrap()
}

#[tokio::test]
async fn exclusive_acquisition() {
    let manager = manager(MemoryLeaseStore::new());
    let lock = manager.create_lock("tenant", "entity");

    assert!(lock.try_lock(Duration::ZERO).await.unwrap());

    // A different handle contends like an unrelated process.
    let other = manager.create_lock("tenant", "entity");
    assert!(!other.try_lock(Duration::ZERO).await.unwrap());

    lock.unlock().await.unwrap();
    assert!(other.try_lock(Duration::ZERO).await.unwrap());
    other.unlock().await.unwrap();
}

/// Locks a path twice, then releases in stages while a second holder keeps
/// probing.
#[tokio::test]
async fn reentrant_staged_release() {
    let manager = manager(MemoryLeaseStore::new());
    let lock = manager.create_lock("tenant", "entity");

    lock.lock().await.unwrap();
    lock.lock().await.unwrap();
    assert_eq!(lock.hold_count(), 2);

    let contender = manager.create_lock("tenant", "entity");
    assert!(!contender.try_lock(Duration::ZERO).await.unwrap());

    // One release keeps one reentrant level held.
    lock.unlock().await.unwrap();
    assert_eq!(lock.hold_count(), 1);
    assert!(!contender.try_lock(Duration::ZERO).await.unwrap());

    // Full release frees the path.
    lock.unlock().await.unwrap();
    assert_eq!(lock.hold_count(), 0);
    assert!(contender.try_lock(Duration::ZERO).await.unwrap());
    contender.unlock().await.unwrap();
}

/// One holder locks two independent paths; releasing one does not affect the
/// other.
#[tokio::test]
async fn independent_paths() {
    let manager = manager(MemoryLeaseStore::new());
    let lock_x = manager.create_lock("tenant", "entity-x");
    let lock_y = manager.create_lock("tenant", "entity-y");

    lock_x.lock().await.unwrap();
    lock_x.lock().await.unwrap();
    lock_y.lock().await.unwrap();

    lock_x.unlock().await.unwrap();
    lock_x.unlock().await.unwrap();

    // X is free for others while Y stays held.
    let taker_x = manager.create_lock("tenant", "entity-x");
    assert!(taker_x.try_lock(Duration::ZERO).await.unwrap());
    let taker_y = manager.create_lock("tenant", "entity-y");
    assert!(!taker_y.try_lock(Duration::ZERO).await.unwrap());

    lock_y.unlock().await.unwrap();
    assert!(taker_y.try_lock(Duration::ZERO).await.unwrap());
    taker_x.unlock().await.unwrap();
    taker_y.unlock().await.unwrap();
}

#[tokio::test]
async fn blocking_lock_waits_for_release() {
    let manager = manager(MemoryLeaseStore::new());
    let lock = manager.create_lock("tenant", "entity");
    lock.lock().await.unwrap();

    let waiter = manager.create_lock("tenant", "entity");
    let acquire_task = tokio::spawn(async move {
        waiter.lock().await.unwrap();
        waiter.unlock().await.unwrap();
    });

    // Give the contender time to start backing off against the held lease.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!acquire_task.is_finished());

    lock.unlock().await.unwrap();
    timeout(Duration::from_secs(1), acquire_task)
        .await
        .expect("waiter should acquire after release")
        .unwrap();
}

#[tokio::test]
async fn try_lock_zero_is_immediate_when_uncontended() {
    let manager = manager(MemoryLeaseStore::new());
    let lock = manager.create_lock("tenant", "entity");

    let start = Instant::now();
    assert!(lock.try_lock(Duration::ZERO).await.unwrap());
    assert!(start.elapsed() < Duration::from_millis(100));
    lock.unlock().await.unwrap();
}

#[tokio::test]
async fn try_lock_returns_false_by_its_deadline() {
    let manager = manager(MemoryLeaseStore::new());
    let lock = manager.create_lock("tenant", "entity");
    lock.lock().await.unwrap();

    let contender = manager.create_lock("tenant", "entity");
    let start = Instant::now();
    assert!(!contender.try_lock(Duration::from_millis(100)).await.unwrap());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "gave up too early");
    assert!(elapsed < Duration::from_millis(500), "blocked past the deadline");

    lock.unlock().await.unwrap();
}

#[tokio::test]
async fn unlock_without_hold_is_a_protocol_violation() {
    let store = MemoryLeaseStore::new();
    let manager = manager(store.clone());
    let lock = manager.create_lock("tenant", "entity");

    let err = lock.unlock().await.unwrap_err();
    assert!(matches!(err, LockError::ProtocolViolation(_)));
    assert!(store.held_paths().is_empty(), "store must stay untouched");

    // Over-releasing a previously held lock fails the same way.
    lock.lock().await.unwrap();
    lock.unlock().await.unwrap();
    let err = lock.unlock().await.unwrap_err();
    assert!(matches!(err, LockError::ProtocolViolation(_)));
}

/// Handles created with an explicit holder identity share one reentrancy
/// scope.
#[tokio::test]
async fn shared_holder_handles_compose() {
    let manager = manager(MemoryLeaseStore::new());
    let holder = lease_lock::HolderId::generate();
    let first = manager.create_lock_as(holder.clone(), "tenant", "entity");
    let second = manager.create_lock_as(holder, "tenant", "entity");

    first.lock().await.unwrap();
    // Same holder: reentrant fast path, no contention.
    assert!(second.try_lock(Duration::ZERO).await.unwrap());
    assert_eq!(first.hold_count(), 2);
    assert_eq!(second.hold_count(), 2);

    let foreign = manager.create_lock("tenant", "entity");
    assert!(!foreign.try_lock(Duration::ZERO).await.unwrap());

    // Either handle can drain the shared count.
    second.unlock().await.unwrap();
    second.unlock().await.unwrap();
    assert_eq!(first.hold_count(), 0);
    assert!(foreign.try_lock(Duration::ZERO).await.unwrap());
    foreign.unlock().await.unwrap();
}

/// Dropping one of two sibling handles must not abandon the hold or poison
/// the survivor's release.
#[tokio::test]
async fn dropping_a_sibling_handle_keeps_the_hold() {
    let manager = manager(MemoryLeaseStore::new());
    let holder = lease_lock::HolderId::generate();
    let first = manager.create_lock_as(holder.clone(), "tenant", "entity");
    let second = manager.create_lock_as(holder, "tenant", "entity");

    first.lock().await.unwrap();
    drop(first);

    // The hold survives the sibling's drop.
    assert_eq!(second.hold_count(), 1);
    let foreign = manager.create_lock("tenant", "entity");
    assert!(!foreign.try_lock(Duration::ZERO).await.unwrap());

    // The surviving handle releases normally.
    second.unlock().await.unwrap();
    assert!(foreign.try_lock(Duration::ZERO).await.unwrap());
    foreign.unlock().await.unwrap();
}

/// Read-sleep-write over a shared cell; lost updates would betray broken
/// exclusion.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mutual_exclusion_under_contention() {
    const TASKS: usize = 4;
    const ITERATIONS: usize = 5;

    let store = MemoryLeaseStore::new();
    let manager = manager(store.clone());
    let cell = Arc::new(std::sync::Mutex::new(0u64));

    let mut tasks = Vec::new();
    for _ in 0..TASKS {
        let manager = manager.clone();
        let cell = Arc::clone(&cell);
        tasks.push(tokio::spawn(async move {
            let lock = manager.create_lock("tenant", "counter");
            for _ in 0..ITERATIONS {
                lock.lock().await.unwrap();

                let seen = *cell.lock().unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
                *cell.lock().unwrap() = seen + 1;

                lock.unlock().await.unwrap();
            }
        }));
    }

    for task in tasks {
        timeout(Duration::from_secs(30), task).await.unwrap().unwrap();
    }
    assert_eq!(*cell.lock().unwrap(), (TASKS * ITERATIONS) as u64);
    assert!(store.held_paths().is_empty());
}
