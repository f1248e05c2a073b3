//! Runtime configuration for the push ingestion dispatcher.
//!
//! Loading this struct from a file or service discovery is the excluded
//! "configuration loading" collaborator (see the crate's top-level docs);
//! this module only owns the struct shape and its defaults.

use std::time::Duration;

/// Configured options recognized by [`crate::dispatch::Dispatcher`] and
/// [`crate::ticker::EvictionTicker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HesConfig {
    /// Process-wide MAC prefix prepended to every pmesh `destination_addr`
    /// to form a [`hes_core::NodeMac`].
    pub mac_prefix: [u8; 4],
    /// Maximum inter-page gap before an incomplete assembly is dropped.
    pub stale_bound: Duration,
    /// Cadence at which the eviction ticker walks the reassembly store.
    pub eviction_period: Duration,
    /// Upper bound on accepted packet size, enforced by the ingress
    /// boundary before bytes ever reach [`crate::dispatch::Dispatcher::ingest`].
    /// Independent of, and in addition to, `hes_proto::frame::validate`'s own
    /// bounds checks.
    pub max_packet_bytes: usize,
}

impl Default for HesConfig {
    fn default() -> Self {
        Self {
            mac_prefix: [0, 0, 0, 0],
            stale_bound: Duration::from_secs(2 * 60),
            eviction_period: Duration::from_secs(30),
            max_packet_bytes: 2048,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = HesConfig::default();
        assert_eq!(config.stale_bound, Duration::from_secs(120));
        assert_eq!(config.eviction_period, Duration::from_secs(30));
        assert_eq!(config.max_packet_bytes, 2048);
    }
}
