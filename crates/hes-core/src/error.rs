//! Domain-level error taxonomy.
//!
//! Wraps the byte-parsing errors from `hes-proto` so that callers one layer
//! up (`hes-ingest`'s dispatcher) see a single error type at the core
//! boundary.

use thiserror::Error;

use hes_proto::{FrameError, ValueError};

/// Errors surfaced at the `hes-core` boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Frame header validation failed; see [`FrameError`] for the reason.
    #[error("frame validation failed: {0}")]
    Frame(#[from] FrameError),

    /// A value in the record stream could not be decoded.
    #[error("value decode failed: {0}")]
    Value(#[from] ValueError),

    /// A multi-page assembly's terminal packet arrived but the running
    /// packet count didn't match the declared page count.
    #[error("assembly count mismatch: received {received}, expected {expected}")]
    CountMismatch {
        /// Packets actually accepted for this assembly.
        received: u32,
        /// Packets implied by `current_page_index + 1` on the terminal page.
        expected: u32,
    },

    /// A slot was cleared by the eviction ticker before it completed.
    #[error("assembly went stale and was evicted")]
    StaleExpiry,
}

impl CoreError {
    /// Whether this error reflects a condition that is expected to recur
    /// under normal operation (malformed input, a lost page) rather than a
    /// programming bug — useful for deciding log severity.
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            CoreError::Frame(_) | CoreError::Value(_) | CoreError::CountMismatch { .. } | CoreError::StaleExpiry
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hes_proto::FrameError;

    #[test]
    fn frame_error_converts_via_from() {
        let frame_err = FrameError::Bounds { reason: "test" };
        let core_err: CoreError = frame_err.into();
        assert!(core_err.is_routine());
    }
}
