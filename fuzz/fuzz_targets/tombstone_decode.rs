//! Fuzz harness for the tombstone decoder.
//!
//! Exercises the decode boundary with arbitrary byte sequences: the decoder
//! ingests reports from crashed, possibly compromised processes, so it must
//! return a result for every input — truncated, corrupted, or adversarial —
//! without panicking or hanging.

#![no_main]
use faultline_core::report::{decode_tombstone, extract_from_envelope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_tombstone(data);
    let _ = extract_from_envelope(data);
});
