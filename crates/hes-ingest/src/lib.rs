//! Dispatch, eviction scheduling, configuration, and sink implementations
//! wiring the push ingestion core into a runnable process.
//!
//! `hes-proto` owns the wire format, `hes-core` owns the domain and
//! reassembly logic; this crate is the outermost layer, wiring both into a
//! runnable dispatcher and demo binary.

pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod sink;
pub mod ticker;

pub use config::HesConfig;
pub use cycle::{CycleClock, HalfHourCycleClock};
pub use dispatch::{Dispatcher, IngestOutcome};
pub use ticker::EvictionTicker;
