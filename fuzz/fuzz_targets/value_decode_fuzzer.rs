//! Fuzz target for `hes_proto::value::decode`.
//!
//! Exercises every type tag against arbitrary buffers and offsets; the
//! codec must never panic and must leave `offset` untouched on error.

#![no_main]

use arbitrary::Arbitrary;
use hes_proto::decode;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    type_tag: u8,
    start_offset: u8,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let mut offset = (input.start_offset as usize) % (input.bytes.len() + 1);
    let before = offset;
    if decode(&input.bytes, &mut offset, input.type_tag).is_err() {
        assert_eq!(offset, before, "offset must be unchanged on decode error");
    }
});
