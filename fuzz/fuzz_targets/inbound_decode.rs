//! Fuzz target for Inbound::decode
//!
//! This fuzzer feeds arbitrary text to the inbound frame decoder to find:
//! - Parser crashes or panics
//! - Timestamps that overflow when truncated to whole seconds
//! - Tagged frames that decode as chats without a chat body
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_proto::Inbound;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(frame) = Inbound::decode(text) {
        // Only chat frames carry a chat body
        assert_eq!(frame.as_chat().is_some(), matches!(frame, Inbound::Chat(_)));
    }
});
