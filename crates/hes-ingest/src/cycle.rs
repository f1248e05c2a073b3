//! `cycle_id` derivation.
//!
//! The exact bucketing function is owned by the persistence collaborator,
//! not the core's contract — `Dispatcher` only threads the resulting value
//! through for `Instantaneous` and `BlockLoad` completions. This module
//! supplies one concrete implementation (a 30-minute wall-clock bucket since
//! the Unix epoch) for the demo binary and tests to use.

use std::time::{SystemTime, UNIX_EPOCH};

/// Derives a `cycle_id` from wall time, for tagging completed
/// `Instantaneous` and `BlockLoad` assemblies.
pub trait CycleClock: Send + Sync {
    /// Maps `now` to the bucket identifier the persistence sink should tag
    /// this completion with.
    fn cycle_id(&self, now: SystemTime) -> u32;
}

/// 30-minute wall-clock bucket since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalfHourCycleClock;

impl CycleClock for HalfHourCycleClock {
    fn cycle_id(&self, now: SystemTime) -> u32 {
        const BUCKET_SECS: u64 = 30 * 60;
        let elapsed = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        (elapsed / BUCKET_SECS) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn buckets_into_thirty_minute_windows() {
        let clock = HalfHourCycleClock;
        let start = UNIX_EPOCH + Duration::from_secs(30 * 60 * 7);
        let still_in_bucket = start + Duration::from_secs(29 * 60);
        let next_bucket = start + Duration::from_secs(30 * 60);

        assert_eq!(clock.cycle_id(start), 7);
        assert_eq!(clock.cycle_id(still_in_bucket), 7);
        assert_eq!(clock.cycle_id(next_bucket), 8);
    }
}
