//! Convenience prelude for lease lock types.

pub use crate::error::{LockError, LockResult};
pub use crate::timeout::Deadline;
pub use crate::token::{HolderId, OwnerToken};
pub use crate::traits::LeaseStore;
pub use crate::types::{
    ConsistencyLevel, DeleteOutcome, LeaseRecord, PutOutcome, ResourcePath,
};
