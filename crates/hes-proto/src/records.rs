//! The record-stream parser.
//!
//! A DLMS push payload is a flat stream of `(record_id, 0x00, type_tag,
//! value)` triples. In `BlockLoad` mode a sentinel `record_id == 0x06`
//! closes out one logical record and starts the next, instead of each
//! triple landing directly in a single flat map.

use std::collections::HashMap;

use crate::value::{self, TypedValue};

/// Record id reserved as the "close this record, start the next" sentinel
/// in block-load streams.
const BLOCK_LOAD_CLOSE_RECORD_ID: u8 = 0x06;

/// A flat record_id -> value map, the shape used by every profile except
/// block-load.
pub type RecordMap = HashMap<u8, TypedValue>;

/// Accumulator for a block-load page or multi-page stream: zero or more
/// already-closed records, plus the record currently being filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockLoadAssembly {
    /// Records closed by a prior `BLOCK_LOAD_CLOSE_RECORD_ID` sentinel.
    pub completed: Vec<RecordMap>,
    /// The record currently accumulating triples.
    pub partial: RecordMap,
}

/// Where decoded triples land. The two spellings of "what output shape do
/// I produce" and "do I treat 0x06 as a sentinel" always travel together in
/// this protocol, so they're one parameter rather than two.
pub enum RecordSink<'a> {
    /// Plain profiles: every triple lands directly in one map.
    Flat(&'a mut RecordMap),
    /// Block-load profiles: triples accumulate into `partial` until a
    /// sentinel record id closes it into `completed`.
    BlockLoad(&'a mut BlockLoadAssembly),
}

/// Result of parsing one page's worth of record triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Decoded exactly `expected_count` triples before running out of
    /// input.
    Complete,
    /// Stopped early: ran out of bytes for a full triple, hit a malformed
    /// delimiter, or hit a value this core can't decode. Whatever was
    /// already accumulated in `sink` is kept.
    Partial,
}

/// Parse `(record_id, 0x00, type_tag, value)` triples from `buffer` starting
/// at `start_offset`, stopping once `expected_count` triples have been
/// decoded or the stream can no longer yield a full triple.
pub fn parse_records(
    buffer: &[u8],
    start_offset: usize,
    expected_count: u8,
    mut sink: RecordSink<'_>,
) -> ParseOutcome {
    let mut offset = start_offset;
    let mut decoded = 0u8;

    // Mirrors the original triple-loop bound: never read the very last
    // byte of the buffer as the start of a new triple.
    let limit = buffer.len().saturating_sub(1);

    while decoded < expected_count && offset < limit {
        if buffer.len() - offset < 3 {
            tracing::debug!(offset, "record stream halted: not enough bytes for a triple header");
            return ParseOutcome::Partial;
        }

        let record_id = buffer[offset];
        let delimiter = buffer[offset + 1];
        let type_tag = buffer[offset + 2];

        if delimiter != 0x00 {
            tracing::debug!(offset, delimiter, "record stream halted: bad delimiter byte");
            return ParseOutcome::Partial;
        }

        let mut value_offset = offset + 3;
        let decoded_value = match value::decode(buffer, &mut value_offset, type_tag) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!(offset, %err, "record stream halted: value decode failed");
                return ParseOutcome::Partial;
            }
        };

        if let TypedValue::Unsupported(tag) = decoded_value {
            tracing::debug!(offset, tag, "record stream halted: unsupported type tag");
            return ParseOutcome::Partial;
        }

        tracing::trace!(record_id, type_tag, offset, "decoded record triple");

        match &mut sink {
            RecordSink::Flat(map) => {
                map.insert(record_id, decoded_value);
            }
            RecordSink::BlockLoad(assembly) => {
                assembly.partial.insert(record_id, decoded_value);
                if record_id == BLOCK_LOAD_CLOSE_RECORD_ID {
                    let closed = std::mem::take(&mut assembly.partial);
                    assembly.completed.push(closed);
                }
            }
        }

        offset = value_offset;
        decoded += 1;
    }

    if decoded == expected_count {
        ParseOutcome::Complete
    } else {
        ParseOutcome::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(record_id: u8, type_tag: u8, value: &[u8]) -> Vec<u8> {
        let mut buf = vec![record_id, 0x00, type_tag];
        buf.extend_from_slice(value);
        buf
    }

    #[test]
    fn flat_sink_decodes_all_expected_triples() {
        let mut buf = Vec::new();
        buf.extend(triple(0x01, 0x11, &[0x2A])); // UINT8
        buf.extend(triple(0x02, 0x16, &[0x03])); // ENUM
        buf.push(0x00); // trailing checksum-like byte, never read as a triple start

        let mut map = RecordMap::new();
        let outcome = parse_records(&buf, 0, 2, RecordSink::Flat(&mut map));

        assert_eq!(outcome, ParseOutcome::Complete);
        assert_eq!(map.get(&0x01), Some(&TypedValue::Uint8(0x2A)));
        assert_eq!(map.get(&0x02), Some(&TypedValue::Enum(0x03)));
    }

    #[test]
    fn halts_partial_on_bad_delimiter() {
        let buf = vec![0x01, 0xFF, 0x11, 0x2A, 0x00];
        let mut map = RecordMap::new();
        let outcome = parse_records(&buf, 0, 1, RecordSink::Flat(&mut map));
        assert_eq!(outcome, ParseOutcome::Partial);
        assert!(map.is_empty());
    }

    #[test]
    fn halts_partial_on_truncated_value() {
        let buf = vec![0x01, 0x00, 0x06, 0x00, 0x01]; // UINT32 needs 4 bytes, only 2 present
        let mut map = RecordMap::new();
        let outcome = parse_records(&buf, 0, 1, RecordSink::Flat(&mut map));
        assert_eq!(outcome, ParseOutcome::Partial);
        assert!(map.is_empty());
    }

    #[test]
    fn halts_partial_on_unsupported_type_tag() {
        let buf = vec![0x01, 0x00, 0x02, 0x00]; // reserved tag 0x02
        let mut map = RecordMap::new();
        let outcome = parse_records(&buf, 0, 1, RecordSink::Flat(&mut map));
        assert_eq!(outcome, ParseOutcome::Partial);
        assert!(map.is_empty());
    }

    #[test]
    fn block_load_sink_closes_on_sentinel_record_id() {
        let mut buf = Vec::new();
        buf.extend(triple(0x01, 0x11, &[0x01])); // UINT8 into partial
        buf.extend(triple(0x02, 0x11, &[0x02])); // UINT8 into partial
        buf.extend(triple(0x06, 0x11, &[0xFF])); // sentinel: inserted into partial, then closes it
        buf.push(0x00);

        let mut assembly = BlockLoadAssembly::default();
        let outcome = parse_records(&buf, 0, 3, RecordSink::BlockLoad(&mut assembly));

        assert_eq!(outcome, ParseOutcome::Complete);
        assert_eq!(assembly.completed.len(), 1);
        assert!(assembly.partial.is_empty());
        assert_eq!(assembly.completed[0].get(&0x01), Some(&TypedValue::Uint8(0x01)));
        assert_eq!(assembly.completed[0].get(&0x02), Some(&TypedValue::Uint8(0x02)));
        assert_eq!(assembly.completed[0].get(&0x06), Some(&TypedValue::Uint8(0xFF)));
    }

    #[test]
    fn block_load_assembly_can_span_multiple_parse_calls() {
        let mut assembly = BlockLoadAssembly::default();

        let page_one = triple(0x01, 0x11, &[0x01]);
        let outcome_one = parse_records(&page_one, 0, 1, RecordSink::BlockLoad(&mut assembly));
        assert_eq!(outcome_one, ParseOutcome::Complete);
        assert_eq!(assembly.partial.len(), 1);

        let mut page_two = Vec::new();
        page_two.extend(triple(0x06, 0x11, &[0xFF]));
        page_two.push(0x00);
        let outcome_two = parse_records(&page_two, 0, 1, RecordSink::BlockLoad(&mut assembly));
        assert_eq!(outcome_two, ParseOutcome::Complete);
        assert_eq!(assembly.completed.len(), 1);
        assert!(assembly.partial.is_empty());
        assert_eq!(assembly.completed[0].get(&0x01), Some(&TypedValue::Uint8(0x01)));
        assert_eq!(assembly.completed[0].get(&0x06), Some(&TypedValue::Uint8(0xFF)));
    }

    #[test]
    fn stops_at_expected_count_even_if_more_bytes_remain() {
        let mut buf = Vec::new();
        buf.extend(triple(0x01, 0x11, &[0x01]));
        buf.extend(triple(0x02, 0x11, &[0x02]));
        buf.push(0x00);

        let mut map = RecordMap::new();
        let outcome = parse_records(&buf, 0, 1, RecordSink::Flat(&mut map));
        assert_eq!(outcome, ParseOutcome::Complete);
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&0x02));
    }
}
