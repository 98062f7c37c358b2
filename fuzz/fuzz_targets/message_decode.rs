//! Fuzz target for ChatMessage::from_json
//!
//! Message bodies arrive from the network; decoding must reject malformed
//! payloads with an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wirechat_proto::ChatMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = ChatMessage::from_json(raw);
    }
});
