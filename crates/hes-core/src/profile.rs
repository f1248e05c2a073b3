//! Profile kinds carried over the push channel.

/// The telemetry profiles the dispatcher can route a frame to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// Instantaneous parameters, one page, flat record map.
    Instantaneous,
    /// Daily load profile, flat record map.
    DailyLoad,
    /// Block load profile: records packed as a sentinel-delimited sequence
    /// of sub-maps rather than one flat map.
    BlockLoad,
    /// Billing history profile, flat record map.
    BillingHistory,
    /// Power-on event.
    PowerOnEvent,
    /// Power-off event.
    PowerOffEvent,
}

impl ProfileKind {
    /// Whether this profile's reassembly buffer is a [`crate::SlotBuffer::BlockLoad`]
    /// rather than a flat record map.
    pub fn uses_block_load_buffer(self) -> bool {
        matches!(self, ProfileKind::BlockLoad)
    }
}
