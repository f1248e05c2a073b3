//! Fuzz target for `hes_proto::frame::validate`.
//!
//! The pmesh+dlms header parser reads attacker-controlled lengths and
//! offsets directly off the wire; this should never panic, only return
//! `Err` for malformed input.

#![no_main]

use hes_proto::validate;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = validate(data);
});
