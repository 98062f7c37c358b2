//! Fuzz target for Frame::decode
//!
//! This fuzzer tests frame decoding with arbitrary text to find:
//! - Parser crashes or panics
//! - Slicing errors at the header/body boundary
//! - Escape sequences that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wirechat_proto::Frame;

fuzz_target!(|data: &[u8]| {
    // The transport only feeds the decoder valid UTF-8
    if let Ok(raw) = std::str::from_utf8(data) {
        // This should never panic, only return Err for invalid data
        let _ = Frame::decode(raw);
    }
});
