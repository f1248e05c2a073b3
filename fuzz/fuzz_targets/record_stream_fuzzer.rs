//! Fuzz target for `hes_proto::records::parse_records`.
//!
//! Exercises both `Flat` and `BlockLoad` sinks against arbitrary byte
//! streams and record counts. Should never panic regardless of input.

#![no_main]

use arbitrary::Arbitrary;
use hes_proto::{BlockLoadAssembly, RecordMap, RecordSink, parse_records};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    block_load: bool,
    start_offset: u8,
    expected_count: u8,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let start_offset = (input.start_offset as usize) % (input.bytes.len() + 1);

    if input.block_load {
        let mut assembly = BlockLoadAssembly::default();
        let _ = parse_records(&input.bytes, start_offset, input.expected_count, RecordSink::BlockLoad(&mut assembly));
    } else {
        let mut map = RecordMap::new();
        let _ = parse_records(&input.bytes, start_offset, input.expected_count, RecordSink::Flat(&mut map));
    }
});
