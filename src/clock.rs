//! Host clock abstraction
//!
//! Captured signals carry their own host instants; the coordinator and the
//! replay scheduler read the current time through [`Clock`] so that the
//! session start and the `replay_timestamp` of emitted notifications share
//! the host's time base.

use std::sync::Arc;
use tokio::time::Instant;

/// Source of the current host time in milliseconds
pub trait Clock: Send + Sync {
    /// Milliseconds on the host timeline
    fn now_ms(&self) -> f64;
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Monotonic clock measuring milliseconds since its creation
///
/// Built on `tokio::time::Instant`, so it follows paused time in tests.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}
