//! Fuzz target for IPC JSON message decoding.
//!
//! Arbitrary bytes must decode to `Ok` or `Err`, never panic. Anything that
//! decodes must survive a re-encode.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sysupdate_mock::ipc::{decode_message, encode_message};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = decode_message(data) {
        let _ = encode_message(&message);
    }
});
