//! Wire format for pmesh/DLMS push frames.
//!
//! This crate owns the byte-level concerns of the push ingestion path: the
//! stacked pmesh+DLMS header layout, the checksum, the self-describing value
//! codec, and the record-stream triple parser. It has no notion of node
//! identity, multi-packet reassembly, or persistence — those are domain
//! concerns layered on top in `hes-core`.

mod frame;
mod records;
mod value;

pub use frame::{DlmsHeader, FrameError, PmeshHeader, ValidatedFrame, validate};
pub use records::{BlockLoadAssembly, ParseOutcome, RecordMap, RecordSink, parse_records};
pub use value::{TypedValue, ValueError, decode};

/// Frame IDs recognized on the pmesh push channel.
pub mod frame_id {
    /// Instantaneous / daily-load / block-load / billing-history push.
    pub const INSTANT_DATA: u8 = 0x0E;
    /// Power-on event push.
    pub const INSTANT_EVENT_OBJECT_READ: u8 = 0x10;
    /// Power-off event push.
    pub const INSTANT_POWERFAIL_OBJECT_READ: u8 = 0x11;
}

/// DLMS profile commands carried under [`frame_id::INSTANT_DATA`].
pub mod command {
    /// Instantaneous parameters profile.
    pub const INSTANTANEOUS_PROFILE: u8 = 0x01;
    /// Billing history profile.
    pub const BILLING_PROFILE: u8 = 0x02;
    /// Daily load profile.
    pub const DAILY_LOAD_PROFILE: u8 = 0x03;
    /// Block load profile.
    pub const BLOCK_LOAD_PROFILE: u8 = 0x04;
}
