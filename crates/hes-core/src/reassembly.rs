//! Per-(node, profile-kind) multi-packet reassembly.
//!
//! A push profile can span several pages; this module accumulates pages into
//! a slot keyed by `(NodeMac, ProfileKind)` and decides, on each fed page,
//! whether the slot should keep accumulating, complete, or be cleared.
//!
//! The record-stream parser writes directly into the slot's own buffer while
//! the store's lock is held — that's what lets a block-load triple that
//! doesn't reach the `0x06` sentinel on one page carry forward and close
//! together with triples from the next page. The store never calls the
//! persistence sink itself: on completion it hands the caller an owned,
//! extracted buffer (see [`FeedOutcome::Completed`]) so the sink call always
//! happens after the lock is released — the store must never be held across
//! a sink call.

use std::collections::HashMap;
use std::sync::Mutex;

use hes_proto::{BlockLoadAssembly, ParseOutcome, RecordMap, RecordSink, parse_records};

use crate::env::Environment;
use crate::node::NodeMac;
use crate::profile::ProfileKind;

/// `next_page_status` value marking the terminal page of a stream.
const END_OF_STREAM: u8 = 0x00;

/// The accumulator a slot holds, chosen once at slot creation by the
/// profile's parser mode and never changed for that slot's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotBuffer {
    /// Flat profiles: one record map shared across every page.
    Flat(RecordMap),
    /// Block-load profiles: a sentinel-delimited sequence of record maps.
    BlockLoad(BlockLoadAssembly),
}

impl SlotBuffer {
    /// Whether the buffer holds no accumulated records, matching invariant
    /// `packets_received == 0 ⇔ buffer empty`.
    fn is_empty(&self) -> bool {
        match self {
            SlotBuffer::Flat(map) => map.is_empty(),
            SlotBuffer::BlockLoad(assembly) => assembly.completed.is_empty() && assembly.partial.is_empty(),
        }
    }

    fn as_sink(&mut self) -> RecordSink<'_> {
        match self {
            SlotBuffer::Flat(map) => RecordSink::Flat(map),
            SlotBuffer::BlockLoad(assembly) => RecordSink::BlockLoad(assembly),
        }
    }
}

/// Per-(node, kind) accumulator state.
#[derive(Debug, Clone)]
struct Slot<I> {
    packets_received: u32,
    last_packet_ts: I,
    buffer: SlotBuffer,
}

impl<I> Slot<I> {
    fn new_empty(kind: ProfileKind, ts: I) -> Self {
        let buffer = if kind.uses_block_load_buffer() {
            SlotBuffer::BlockLoad(BlockLoadAssembly::default())
        } else {
            SlotBuffer::Flat(RecordMap::new())
        };
        Self { packets_received: 0, last_packet_ts: ts, buffer }
    }
}

/// Outcome of feeding one page to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Page accepted; the stream continues (not the terminal page).
    Accepted,
    /// Terminal page arrived and the running packet count matched the
    /// declared page count: the slot is extracted and cleared. The caller
    /// must hand `buffer` to the persistence sink.
    Completed {
        /// Final accumulated buffer for this assembly.
        buffer: SlotBuffer,
        /// Total pages received across the assembly's lifetime.
        packets_received: u32,
    },
    /// The record stream parser reported `Partial` for this page: the slot
    /// is cleared without emitting.
    ClearedOnPartial,
    /// Terminal page arrived but `packets_received != page_index + 1`: the
    /// slot is cleared without emitting.
    ClearedOnCountMismatch {
        /// Packets actually accepted before the terminator.
        received: u32,
        /// Packets implied by `current_page_index + 1` on the terminal page.
        expected: u32,
    },
}

/// Shared multi-packet reassembly state, one entry per `(node, profile
/// kind)`. Guarded by a single mutex over the whole map, which is
/// sufficient given expected push throughput; sharding by node is a
/// possible future refinement, not a requirement.
pub struct ReassemblyStore<E: Environment> {
    slots: Mutex<HashMap<(NodeMac, ProfileKind), Slot<E::Instant>>>,
}

impl<E: Environment> Default for ReassemblyStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> ReassemblyStore<E> {
    /// Builds an empty store.
    pub fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    /// Number of live slots. For diagnostics and tests.
    #[allow(clippy::expect_used)]
    pub fn slot_count(&self) -> usize {
        self.slots.lock().expect("reassembly store mutex poisoned").len()
    }

    /// Feed one page to the slot for `(node, kind)`, creating it lazily on
    /// first use, parsing `records_buffer[records_start_offset..]` directly
    /// into the slot's own accumulator.
    #[allow(clippy::expect_used)]
    #[allow(clippy::too_many_arguments)]
    pub fn feed(
        &self,
        node: NodeMac,
        kind: ProfileKind,
        current_page_index: u8,
        next_page_status: u8,
        records_buffer: &[u8],
        records_start_offset: usize,
        expected_count: u8,
        env: &E,
    ) -> FeedOutcome {
        let mut slots = self.slots.lock().expect("reassembly store mutex poisoned");

        let now = env.now();
        let key = (node, kind);
        let slot = slots.entry(key).or_insert_with(|| Slot::new_empty(kind, now));

        let parse_outcome =
            parse_records(records_buffer, records_start_offset, expected_count, slot.buffer.as_sink());

        if parse_outcome == ParseOutcome::Partial {
            slots.remove(&key);
            tracing::debug!(?kind, "reassembly slot cleared: page parse was partial");
            return FeedOutcome::ClearedOnPartial;
        }

        let slot = slots.get_mut(&key).expect("slot present: just inserted or matched above");
        slot.packets_received = slot.packets_received.saturating_add(1);
        slot.last_packet_ts = now;

        debug_assert!(slot.packets_received > 0);
        // A page declaring zero records (e.g. a Power-On/Off event frame
        // with `no_of_records == 0`) legitimately parses as `Complete`
        // without inserting anything, so the buffer stays empty even though
        // a packet was accepted. The `packets_received == 0 ⇔ buffer empty`
        // invariant only binds the *cleared* state; it doesn't forbid an
        // accepted, record-less page.
        debug_assert!(expected_count == 0 || !slot.buffer.is_empty());

        if next_page_status != END_OF_STREAM {
            tracing::trace!(?kind, current_page_index, "reassembly page accepted, stream continues");
            return FeedOutcome::Accepted;
        }

        let expected = u32::from(current_page_index) + 1;
        let received = slot.packets_received;

        if received == expected {
            let slot = slots.remove(&key).expect("slot present: just updated above");
            tracing::info!(?kind, received, "reassembly completed");
            FeedOutcome::Completed { buffer: slot.buffer, packets_received: received }
        } else {
            slots.remove(&key);
            tracing::debug!(?kind, received, expected, "reassembly cleared: count mismatch at terminator");
            FeedOutcome::ClearedOnCountMismatch { received, expected }
        }
    }

    /// Clear every slot whose last accepted packet predates `cutoff`.
    /// Returns the cleared `(node, kind)` keys for logging.
    #[allow(clippy::expect_used)]
    pub fn evict_stale(&self, cutoff: E::Instant) -> Vec<(NodeMac, ProfileKind)> {
        let mut slots = self.slots.lock().expect("reassembly store mutex poisoned");
        let stale: Vec<(NodeMac, ProfileKind)> = slots
            .iter()
            .filter(|(_, slot)| slot.packets_received > 0 && slot.last_packet_ts < cutoff)
            .map(|(key, _)| *key)
            .collect();

        for key in &stale {
            slots.remove(key);
        }
        stale
    }
}
