//! Core contract and data model for lease-backed distributed locks.

pub mod error;
pub mod prelude;
pub mod timeout;
pub mod token;
pub mod traits;
pub mod types;

pub use error::{LockError, LockResult};
pub use prelude::*;
