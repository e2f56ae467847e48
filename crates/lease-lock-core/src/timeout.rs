//! Deadline bookkeeping for acquire loops.

use std::time::{Duration, Instant};

/// Bound on how long an acquire may keep retrying.
#[derive(Debug, Clone, Copy)]
pub enum Deadline {
    /// Retry until the lock is won.
    Unbounded,
    /// Give up once this instant passes.
    At(Instant),
}

impl Deadline {
    /// Deadline `timeout` from now.
    ///
    /// A zero timeout is expired immediately, which bounds the caller to a
    /// single acquisition attempt.
    pub fn after(timeout: Duration) -> Self {
        Self::At(Instant::now() + timeout)
    }

    pub fn expired(&self) -> bool {
        match self {
            Self::Unbounded => false,
            Self::At(at) => Instant::now() >= *at,
        }
    }

    /// Clamps a proposed sleep so it never overshoots the deadline.
    pub fn clamp(&self, delay: Duration) -> Duration {
        match self {
            Self::Unbounded => delay,
            Self::At(at) => delay.min(at.saturating_duration_since(Instant::now())),
        }
    }
}
