//! `PersistenceSink` implementations for the demo binary and tests.
//!
//! The core never talks to a real database; these two implementations stand
//! in for one — deterministic, inspectable, cheap to clone.

mod logging;
mod recording;

pub use logging::LoggingSink;
pub use recording::{RecordedInsert, RecordingSink};
