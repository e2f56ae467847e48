//! Opaque identifiers for acquisitions and holders.

use std::fmt;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format: `{process_id}_{counter}_{uuid}`. The counter disambiguates ids
/// minted within one process faster than the clock ticks.
fn next_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!(
        "{}_{}_{}",
        process::id(),
        counter,
        Uuid::new_v4().as_simple()
    )
}

/// Opaque identifier unique to one acquisition.
///
/// Stored alongside the lease and required to match before a renewal or
/// delete may touch the record, so a stale holder can never delete a lease
/// that was re-acquired by someone else after expiry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerToken(String);

impl OwnerToken {
    /// Mints a token for a fresh acquisition.
    pub fn generate() -> Self {
        Self(next_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a lock holder.
///
/// Reentrancy counts are scoped to one `(path, holder)` pair; handles that
/// share a `HolderId` share a reentrancy scope, handles that don't contend
/// with each other like unrelated processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(String);

impl HolderId {
    /// Mints a fresh holder identity.
    pub fn generate() -> Self {
        Self(next_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
