//! The persistence boundary.
//!
//! The core never talks to a database directly. Completed assemblies are
//! handed to a `PersistenceSink` implementation: synchronous, `Send + Sync`,
//! with implementations owning their own internal synchronization.

use thiserror::Error;

use crate::node::NodeMac;
use hes_proto::RecordMap;

/// Error returned by a [`PersistenceSink`] method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("persistence sink rejected insert: {reason}")]
pub struct SinkError {
    /// Human-readable cause, logged by the caller. Never retried on.
    pub reason: String,
}

impl SinkError {
    /// Builds a [`SinkError`] from any displayable cause.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// The six insert operations a completed assembly can be routed to.
///
/// Implementations are expected to be cheap to clone (typically an `Arc`
/// wrapper) since the dispatcher holds one shared instance across all
/// concurrent `ingest` calls.
pub trait PersistenceSink: Send + Sync {
    /// Instantaneous parameters profile, tagged with a derived cycle id.
    fn insert_instantaneous(
        &self,
        node: NodeMac,
        gateway_id: &str,
        cycle_id: u32,
        records: RecordMap,
    ) -> Result<(), SinkError>;

    /// Daily load profile.
    fn insert_daily_load(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError>;

    /// Block load profile: a sequence of record maps, one per closed
    /// sentinel group, tagged with a derived cycle id.
    fn insert_block_load(
        &self,
        node: NodeMac,
        gateway_id: &str,
        cycle_id: u32,
        records: Vec<RecordMap>,
    ) -> Result<(), SinkError>;

    /// Billing history profile.
    fn insert_billing_history(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError>;

    /// Power-on event.
    fn insert_power_on_event(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError>;

    /// Power-off event.
    fn insert_power_off_event(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError>;
}
