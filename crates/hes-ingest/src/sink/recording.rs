//! A [`PersistenceSink`] that records every call for test assertions.

use std::sync::{Arc, Mutex};

use hes_core::{NodeMac, PersistenceSink, SinkError};
use hes_proto::RecordMap;

/// One recorded call to a [`RecordingSink`] method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedInsert {
    /// `insert_instantaneous` call.
    Instantaneous { node: NodeMac, gateway_id: String, cycle_id: u32, records: RecordMap },
    /// `insert_daily_load` call.
    DailyLoad { node: NodeMac, gateway_id: String, records: RecordMap },
    /// `insert_block_load` call.
    BlockLoad { node: NodeMac, gateway_id: String, cycle_id: u32, records: Vec<RecordMap> },
    /// `insert_billing_history` call.
    BillingHistory { node: NodeMac, gateway_id: String, records: RecordMap },
    /// `insert_power_on_event` call.
    PowerOnEvent { node: NodeMac, gateway_id: String, records: RecordMap },
    /// `insert_power_off_event` call.
    PowerOffEvent { node: NodeMac, gateway_id: String, records: RecordMap },
}

/// Records every insert into a shared, clonable, inspectable log, for
/// deterministic assertions in tests without a real database.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inserts: Arc<Mutex<Vec<RecordedInsert>>>,
}

impl RecordingSink {
    /// Builds an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every call recorded so far, in call order.
    #[allow(clippy::expect_used)]
    pub fn inserts(&self) -> Vec<RecordedInsert> {
        self.inserts.lock().expect("recording sink mutex poisoned").clone()
    }
}

impl PersistenceSink for RecordingSink {
    #[allow(clippy::expect_used)]
    fn insert_instantaneous(
        &self,
        node: NodeMac,
        gateway_id: &str,
        cycle_id: u32,
        records: RecordMap,
    ) -> Result<(), SinkError> {
        self.inserts.lock().expect("recording sink mutex poisoned").push(RecordedInsert::Instantaneous {
            node,
            gateway_id: gateway_id.to_string(),
            cycle_id,
            records,
        });
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn insert_daily_load(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        self.inserts.lock().expect("recording sink mutex poisoned").push(RecordedInsert::DailyLoad {
            node,
            gateway_id: gateway_id.to_string(),
            records,
        });
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn insert_block_load(
        &self,
        node: NodeMac,
        gateway_id: &str,
        cycle_id: u32,
        records: Vec<RecordMap>,
    ) -> Result<(), SinkError> {
        self.inserts.lock().expect("recording sink mutex poisoned").push(RecordedInsert::BlockLoad {
            node,
            gateway_id: gateway_id.to_string(),
            cycle_id,
            records,
        });
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn insert_billing_history(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        self.inserts.lock().expect("recording sink mutex poisoned").push(RecordedInsert::BillingHistory {
            node,
            gateway_id: gateway_id.to_string(),
            records,
        });
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn insert_power_on_event(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        self.inserts.lock().expect("recording sink mutex poisoned").push(RecordedInsert::PowerOnEvent {
            node,
            gateway_id: gateway_id.to_string(),
            records,
        });
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn insert_power_off_event(&self, node: NodeMac, gateway_id: &str, records: RecordMap) -> Result<(), SinkError> {
        self.inserts.lock().expect("recording sink mutex poisoned").push(RecordedInsert::PowerOffEvent {
            node,
            gateway_id: gateway_id.to_string(),
            records,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let sink = RecordingSink::new();
        let node = NodeMac::new([1, 2, 3, 4], [5, 6, 7, 8]);
        sink.insert_daily_load(node, "gw-1", RecordMap::new()).unwrap();
        sink.insert_instantaneous(node, "gw-1", 3, RecordMap::new()).unwrap();

        let inserts = sink.inserts();
        assert_eq!(inserts.len(), 2);
        assert!(matches!(inserts[0], RecordedInsert::DailyLoad { .. }));
        assert!(matches!(inserts[1], RecordedInsert::Instantaneous { cycle_id: 3, .. }));
    }
}
