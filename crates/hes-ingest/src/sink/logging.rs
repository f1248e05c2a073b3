//! A [`PersistenceSink`] that logs every insert and never fails.
//!
//! Stands in for "no real database configured" in the demo binary — the
//! excluded SQL persistence backend is the real collaborator this replaces.

use hes_core::{NodeMac, PersistenceSink, SinkError};
use hes_proto::RecordMap;

/// Logs every completed assembly at `tracing::info!` and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl PersistenceSink for LoggingSink {
    fn insert_instantaneous(
        &self,
        node: NodeMac,
        gateway_id: &str,
        cycle_id: u32,
        records: RecordMap,
    ) -> Result<(), SinkError> {
        tracing::info!(
            node = ?node.as_bytes(),
            gateway_id,
            cycle_id,
            record_count = records.len(),
            "insert_instantaneous"
        );
        Ok(())
    }

    fn insert_daily_load(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        tracing::info!(node = ?node.as_bytes(), gateway_id, record_count = records.len(), "insert_daily_load");
        Ok(())
    }

    fn insert_block_load(
        &self,
        node: NodeMac,
        gateway_id: &str,
        cycle_id: u32,
        records: Vec<RecordMap>,
    ) -> Result<(), SinkError> {
        tracing::info!(
            node = ?node.as_bytes(),
            gateway_id,
            cycle_id,
            group_count = records.len(),
            "insert_block_load"
        );
        Ok(())
    }

    fn insert_billing_history(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        tracing::info!(node = ?node.as_bytes(), gateway_id, record_count = records.len(), "insert_billing_history");
        Ok(())
    }

    fn insert_power_on_event(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        tracing::info!(node = ?node.as_bytes(), gateway_id, record_count = records.len(), "insert_power_on_event");
        Ok(())
    }

    fn insert_power_off_event(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        tracing::info!(node = ?node.as_bytes(), gateway_id, record_count = records.len(), "insert_power_off_event");
        Ok(())
    }
}
