//! Injectable clock abstraction.
//!
//! The reassembly store measures elapsed time for staleness and the
//! eviction ticker sleeps between passes. Both go through this trait so
//! tests can drive a virtual clock instead of sleeping in real time.

use std::future::Future;
use std::ops::Sub;
use std::time::Duration;

/// Monotonic clock plus async sleep, injected into the reassembly store and
/// the eviction ticker.
pub trait Environment: Send + Sync + 'static {
    /// A point in time on this environment's clock. Subtracting two instants
    /// yields the elapsed `Duration` (used for staleness comparisons);
    /// subtracting a `Duration` from an instant steps it backwards (used by
    /// the eviction ticker to compute its cutoff).
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration> + Sub<Duration, Output = Self::Instant>;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Suspend for `duration` on this environment's notion of time.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production [`Environment`] backed by `std::time::Instant` and
/// `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
