//! pmesh/DLMS stacked header parsing and checksum validation.
//!
//! Wire layout (see crate-level docs for the authoritative byte table):
//!
//! ```text
//! pmesh (17 bytes, fixed) -> dlms (9 bytes, fixed) -> records (variable) -> checksum (1 byte)
//! ```
//!
//! The pmesh header's `total_length` field names the offset of the trailing
//! checksum byte; the DLMS header's `payload_length` field covers the DLMS
//! header itself plus the record bytes, starting at the DLMS header's own
//! start byte.

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed size of the pmesh header, in bytes.
pub const PMESH_HEADER_LEN: usize = 17;
/// Fixed size of the DLMS header, in bytes.
pub const DLMS_HEADER_LEN: usize = 9;
/// Expected first byte of the pmesh header.
pub const PMESH_START_BYTE: u8 = 0x2E;
/// Expected first byte of the DLMS header (push data).
pub const DLMS_START_BYTE: u8 = 0x2C;

/// Errors from frame validation. Both variants share the same disposition:
/// drop the packet, no reassembly state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer is too short for its declared lengths, or a fixed start
    /// byte doesn't match, making the declared lengths untrustworthy.
    #[error("frame bounds error: {reason}")]
    Bounds {
        /// Human-readable cause, for logs.
        reason: &'static str,
    },

    /// The trailing checksum byte doesn't match the computed sum.
    #[error("checksum mismatch: expected {expected:#04x}, computed {computed:#04x}")]
    Checksum {
        /// Checksum byte read from the wire.
        expected: u8,
        /// Checksum computed over the DLMS header + records span.
        computed: u8,
    },
}

// zerocopy's derives emit `unsafe impl` blocks for these plain-old-data
// layouts; allowed locally rather than lifting the workspace-wide deny.
#[allow(unsafe_code)]
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawPmeshHeader {
    start_byte: u8,
    total_length: u8,
    packet_type: u8,
    pan_id: [u8; 4],
    gateway_addr: [u8; 4],
    destination_addr: [u8; 4],
    remaining_pkt_count: u8,
    current_pkt_count: u8,
}

#[allow(unsafe_code)]
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawDlmsHeader {
    start_byte: u8,
    payload_length: [u8; 2],
    current_page_index: u8,
    frame_id: u8,
    command: u8,
    sub_command: u8,
    next_page_status: u8,
    no_of_records: u8,
}

/// Parsed pmesh (mesh-routing) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmeshHeader {
    /// Offset of the trailing checksum byte within the packet.
    pub total_length: u8,
    /// Packet type, opaque to the core.
    pub packet_type: u8,
    /// PAN identifier, opaque to the core.
    pub pan_id: [u8; 4],
    /// Gateway address that relayed this packet.
    pub gateway_addr: [u8; 4],
    /// Destination (meter) address — the variable half of the node MAC.
    pub destination_addr: [u8; 4],
    /// Remaining page count as reported by the mesh layer.
    pub remaining_pkt_count: u8,
    /// Current page count as reported by the mesh layer.
    pub current_pkt_count: u8,
}

/// Parsed DLMS push header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlmsHeader {
    /// Length, in bytes, of the DLMS header plus the record stream that
    /// follows it (covers `[dlms_start, dlms_start + payload_length)`).
    pub payload_length: u16,
    /// 0-based index of this page within its multi-page stream.
    pub current_page_index: u8,
    /// Frame identifier, selects the broad category of push.
    pub frame_id: u8,
    /// Command, selects the profile kind within a frame identifier.
    pub command: u8,
    /// Sub-command, unused by dispatch but carried through for callers.
    pub sub_command: u8,
    /// `0x00` marks this as the terminal page of the stream.
    pub next_page_status: u8,
    /// Number of `(record_id, 0x00, type_tag, value)` triples in this page.
    pub no_of_records: u8,
}

/// A structurally valid, checksum-verified push frame.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedFrame<'a> {
    /// Parsed pmesh header.
    pub pmesh: PmeshHeader,
    /// Parsed DLMS header.
    pub dlms: DlmsHeader,
    /// Slice starting at the first record triple and running through the
    /// trailing checksum byte (inclusive). The checksum byte is included
    /// deliberately: `RecordStreamParser` stops one byte short of the end
    /// of whatever buffer it's given, the same way it stops one byte short
    /// of the end of the original packet, so this slice's length must
    /// still count that trailing byte for the bound to land in the same
    /// place.
    pub records: &'a [u8],
}

/// Sum `buffer[range]` modulo 256.
fn checksum_of(buffer: &[u8]) -> u8 {
    buffer.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Parse and validate a pmesh/DLMS push frame.
///
/// # Errors
///
/// Returns [`FrameError::Bounds`] if any declared length would read past the
/// end of `buffer`, or if either header's start byte is wrong. Returns
/// [`FrameError::Checksum`] if the trailing checksum byte doesn't match the
/// computed sum over the DLMS header + record span.
pub fn validate(buffer: &[u8]) -> Result<ValidatedFrame<'_>, FrameError> {
    if buffer.len() < PMESH_HEADER_LEN + DLMS_HEADER_LEN {
        return Err(FrameError::Bounds { reason: "buffer shorter than fixed header region" });
    }

    let (raw_pmesh, _) = RawPmeshHeader::ref_from_prefix(buffer)
        .map_err(|_| FrameError::Bounds { reason: "pmesh header does not fit buffer" })?;

    if raw_pmesh.start_byte != PMESH_START_BYTE {
        return Err(FrameError::Bounds { reason: "unexpected pmesh start byte" });
    }

    let total_length = raw_pmesh.total_length;
    if buffer.len() < total_length as usize + 1 {
        return Err(FrameError::Bounds { reason: "buffer shorter than declared total_length" });
    }

    let (raw_dlms, _) = RawDlmsHeader::ref_from_prefix(&buffer[PMESH_HEADER_LEN..])
        .map_err(|_| FrameError::Bounds { reason: "dlms header does not fit buffer" })?;

    if raw_dlms.start_byte != DLMS_START_BYTE {
        return Err(FrameError::Bounds { reason: "unexpected dlms start byte" });
    }

    let payload_length = u16::from_be_bytes(raw_dlms.payload_length);
    let dlms_start = PMESH_HEADER_LEN;
    let payload_end = dlms_start
        .checked_add(payload_length as usize)
        .ok_or(FrameError::Bounds { reason: "payload_length overflows offset" })?;

    if payload_end > buffer.len() {
        return Err(FrameError::Bounds { reason: "dlms payload extends past buffer" });
    }

    let expected_checksum = buffer[total_length as usize];
    let computed_checksum = checksum_of(&buffer[dlms_start..payload_end]);
    if expected_checksum != computed_checksum {
        tracing::debug!(
            expected = expected_checksum,
            computed = computed_checksum,
            "push frame checksum mismatch"
        );
        return Err(FrameError::Checksum { expected: expected_checksum, computed: computed_checksum });
    }

    let pmesh = PmeshHeader {
        total_length,
        packet_type: raw_pmesh.packet_type,
        pan_id: raw_pmesh.pan_id,
        gateway_addr: raw_pmesh.gateway_addr,
        destination_addr: raw_pmesh.destination_addr,
        remaining_pkt_count: raw_pmesh.remaining_pkt_count,
        current_pkt_count: raw_pmesh.current_pkt_count,
    };

    let dlms = DlmsHeader {
        payload_length,
        current_page_index: raw_dlms.current_page_index,
        frame_id: raw_dlms.frame_id,
        command: raw_dlms.command,
        sub_command: raw_dlms.sub_command,
        next_page_status: raw_dlms.next_page_status,
        no_of_records: raw_dlms.no_of_records,
    };

    let records_offset = PMESH_HEADER_LEN + DLMS_HEADER_LEN;
    if (total_length as usize) + 1 < records_offset {
        return Err(FrameError::Bounds { reason: "total_length precedes the record region" });
    }

    Ok(ValidatedFrame { pmesh, dlms, records: &buffer[records_offset..=total_length as usize] })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal well-formed frame with no records, for header-level
    /// tests that don't care about the record stream.
    pub(crate) fn build_empty_frame(destination_addr: [u8; 4], frame_id: u8, command: u8) -> Vec<u8> {
        build_frame(destination_addr, frame_id, command, 0, 0x00, &[])
    }

    /// Builds a well-formed pmesh+dlms+records+checksum frame.
    ///
    /// `records` is the already-encoded triple stream
    /// (`record_id, 0x00, type_tag, value...`).
    pub(crate) fn build_frame(
        destination_addr: [u8; 4],
        frame_id: u8,
        command: u8,
        current_page_index: u8,
        next_page_status: u8,
        records: &[u8],
    ) -> Vec<u8> {
        let dlms_payload_len = DLMS_HEADER_LEN + records.len();
        let total_length = PMESH_HEADER_LEN + dlms_payload_len;

        let mut buf = Vec::with_capacity(total_length + 1);
        buf.push(PMESH_START_BYTE);
        buf.push(total_length as u8);
        buf.push(0x01); // packet_type
        buf.extend_from_slice(&[0xAA, 0xAA, 0xAA, 0xAA]); // pan_id
        buf.extend_from_slice(&[0xBB, 0xBB, 0xBB, 0xBB]); // gateway_addr
        buf.extend_from_slice(&destination_addr);
        buf.push(0x00); // remaining_pkt_count
        buf.push(0x00); // current_pkt_count

        buf.push(DLMS_START_BYTE);
        buf.extend_from_slice(&(dlms_payload_len as u16).to_be_bytes());
        buf.push(current_page_index);
        buf.push(frame_id);
        buf.push(command);
        buf.push(0x00); // sub_command
        buf.push(next_page_status);
        buf.push((records.len() / 4) as u8); // no_of_records, caller may overwrite via slice layout

        buf.extend_from_slice(records);

        let checksum = checksum_of(&buf[PMESH_HEADER_LEN..]);
        buf.push(checksum);
        buf
    }

    #[test]
    fn validates_well_formed_empty_frame() {
        let frame = build_empty_frame([0xDE, 0xAD, 0xBE, 0xEF], 0x0E, 0x01);
        let validated = validate(&frame).expect("valid frame");
        assert_eq!(validated.pmesh.destination_addr, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(validated.dlms.frame_id, 0x0E);
        assert_eq!(validated.dlms.command, 0x01);
        assert_eq!(validated.dlms.no_of_records, 0);
    }

    #[test]
    fn records_slice_spans_from_first_triple_through_checksum_byte() {
        let records = {
            let mut r = Vec::new();
            r.extend_from_slice(&[0x01, 0x00, 0x11, 0x2A]); // one UINT8 triple
            r
        };
        let frame = build_frame([0, 0, 0, 0], 0x0E, 0x01, 0, 0x00, &records);
        let validated = validate(&frame).expect("valid frame");
        // The checksum byte is the last byte of both the packet and the
        // records slice; everything before it is the triple stream.
        assert_eq!(validated.records.len(), records.len() + 1);
        assert_eq!(&validated.records[..records.len()], &records[..]);
        assert_eq!(validated.records.last(), frame.last());
    }

    #[test]
    fn rejects_short_buffer() {
        let frame = build_empty_frame([0, 0, 0, 0], 0x0E, 0x01);
        let truncated = &frame[..frame.len() - 5];
        assert!(matches!(validate(truncated), Err(FrameError::Bounds { .. })));
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let mut frame = build_empty_frame([0, 0, 0, 0], 0x0E, 0x01);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert!(matches!(validate(&frame), Err(FrameError::Checksum { .. })));
    }

    #[test]
    fn rejects_payload_length_past_buffer() {
        let mut frame = build_empty_frame([0, 0, 0, 0], 0x0E, 0x01);
        // Corrupt the dlms payload_length to claim more bytes than exist.
        frame[PMESH_HEADER_LEN + 1] = 0xFF;
        frame[PMESH_HEADER_LEN + 2] = 0xFF;
        assert!(matches!(validate(&frame), Err(FrameError::Bounds { .. })));
    }

    proptest::proptest! {
        #[test]
        fn any_single_byte_flip_in_payload_span_is_detected(
            idx in 0usize..9,
            flip in 1u8..=255,
        ) {
            let frame = build_empty_frame([1, 2, 3, 4], 0x0E, 0x01);
            let mut corrupted = frame.clone();
            let span_start = PMESH_HEADER_LEN;
            corrupted[span_start + idx] ^= flip;
            if corrupted[span_start + idx] != frame[span_start + idx] {
                let result = validate(&corrupted);
                // Either it's still a valid frame (extremely unlikely given a
                // byte flip changes the checksum input) or it must be a
                // checksum/bounds error — never a panic.
                if let Ok(validated) = result {
                    proptest::prop_assert_eq!(validated.pmesh.destination_addr, [1, 2, 3, 4]);
                }
            }
        }
    }
}
