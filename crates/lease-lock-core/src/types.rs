//! Shared data model for lease-backed locks.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::token::OwnerToken;

/// Identifies a lockable resource as a tenant/resource pair.
///
/// The pair is globally unique; the `Display` form (`tenant/resource`) is
/// what store bindings use as the record key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePath {
    tenant_id: String,
    resource_id: String,
}

impl ResourcePath {
    pub fn new(tenant_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.resource_id)
    }
}

/// How many replicas a store operation must reach before it counts as done.
///
/// Weaker levels shorten latency at the cost of a wider window in which a
/// transiently-stale replica could observe incorrect lease state. Single-copy
/// bindings accept any level and ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    One,
    Two,
    Three,
    Quorum,
    LocalQuorum,
    All,
}

/// The stored, replicated ownership record for a resource path.
///
/// Presence of a non-expired record means the path is held; absence or
/// expiry means free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub path: ResourcePath,
    pub owner_token: OwnerToken,
    pub acquired_at: SystemTime,
    pub ttl: Duration,
    pub expires_at: SystemTime,
}

impl LeaseRecord {
    /// A record acquired now, expiring `ttl` from now.
    pub fn new(path: ResourcePath, owner_token: OwnerToken, ttl: Duration) -> Self {
        let acquired_at = SystemTime::now();
        Self {
            path,
            owner_token,
            acquired_at,
            ttl,
            expires_at: acquired_at + ttl,
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a conditional put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The lease was stored (fresh acquisition) or refreshed (renewal).
    Stored,
    /// A valid lease under a different token already exists.
    Conflict,
}

/// Outcome of a conditional delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record existed under the caller's token and was removed.
    Deleted,
    /// No record under the caller's token; nothing was removed.
    Mismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display_joins_tenant_and_resource() {
        let path = ResourcePath::new("tenant-a", "entity-1");
        assert_eq!(path.to_string(), "tenant-a/entity-1");
    }

    #[test]
    fn record_expires_after_ttl() {
        let record = LeaseRecord::new(
            ResourcePath::new("t", "r"),
            OwnerToken::generate(),
            Duration::from_secs(10),
        );
        let now = SystemTime::now();
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::from_secs(11)));
    }
}
