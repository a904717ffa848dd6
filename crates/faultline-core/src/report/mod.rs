//! Tombstone decoding and rendering.
//!
//! The decoder is the trust boundary of the pipeline: its input is produced
//! by a crashed, possibly compromised process and may be truncated, corrupted,
//! or adversarially malformed. [`decode_tombstone`] is therefore total — it
//! returns either a fully-populated [`Tombstone`] or a [`DecodeError`], never
//! partial state, and never panics regardless of where the input is cut off.
//!
//! Unknown field numbers are skipped, not rejected. Producers are free to add
//! fields; older consumers keep working.

mod render;
mod wire;

use prost::Message;
use thiserror::Error;

pub use self::render::render_report;
pub use self::wire::{BacktraceFrame, Cause, Signal, Thread, Tombstone, TombstoneEnvelope};

/// Maximum accepted raw report size (4 MiB).
///
/// Checked before decoding so a hostile length prefix cannot drive
/// allocation.
pub const MAX_REPORT_SIZE: usize = 4 * 1024 * 1024;

/// Errors produced at the decode boundary.
///
/// Every variant is recoverable: the caller logs and drops the event.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not a well-formed tombstone record.
    #[error("malformed tombstone: {source}")]
    Malformed {
        /// Underlying wire-format error.
        #[from]
        source: prost::DecodeError,
    },

    /// The input exceeds [`MAX_REPORT_SIZE`].
    #[error("report too large: {size} bytes exceeds maximum {max} bytes")]
    TooLarge {
        /// Actual input size.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },

    /// A queue entry carried no tombstone payload.
    #[error("queue entry has no tombstone payload")]
    MissingPayload,
}

/// Decodes a raw tombstone record.
///
/// Applies the one wire quirk that must be normalized exactly once: the
/// SELinux label usually includes its terminating NUL byte, which is
/// stripped here so that downstream rendering never sees it.
///
/// # Errors
///
/// Returns [`DecodeError::TooLarge`] for oversized input and
/// [`DecodeError::Malformed`] for anything the wire decoder rejects.
pub fn decode_tombstone(bytes: &[u8]) -> Result<Tombstone, DecodeError> {
    if bytes.len() > MAX_REPORT_SIZE {
        return Err(DecodeError::TooLarge {
            size: bytes.len(),
            max: MAX_REPORT_SIZE,
        });
    }

    let mut tombstone = Tombstone::decode(bytes)?;

    if tombstone.selinux_label.ends_with('\u{0}') {
        tombstone.selinux_label.pop();
    }

    Ok(tombstone)
}

/// Extracts the embedded tombstone bytes from a queue envelope.
///
/// All envelope header fields other than the payload are skipped.
///
/// # Errors
///
/// Returns [`DecodeError::MissingPayload`] when the envelope decodes but
/// carries no tombstone, and [`DecodeError::Malformed`] when the envelope
/// itself is not well-formed.
pub fn extract_from_envelope(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if bytes.len() > MAX_REPORT_SIZE {
        return Err(DecodeError::TooLarge {
            size: bytes.len(),
            max: MAX_REPORT_SIZE,
        });
    }

    let envelope = TombstoneEnvelope::decode(bytes)?;
    if envelope.tombstone.is_empty() {
        return Err(DecodeError::MissingPayload);
    }
    Ok(envelope.tombstone)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample_tombstone() -> Tombstone {
        let mut t = Tombstone {
            build_fingerprint: "acme/raven:15/AQ3A.250605.001".to_string(),
            uid: 10_123,
            pid: 4321,
            tid: 4321,
            selinux_label: "u:r:untrusted_app:s0\u{0}".to_string(),
            command_line: vec!["/system/bin/app_process".to_string()],
            process_uptime: 42,
            abort_message: String::new(),
            signal_info: Some(Signal {
                number: 11,
                name: "SIGSEGV".to_string(),
                code: 8,
                code_name: "SEGV_MTEAERR".to_string(),
                has_sender: false,
                sender_uid: 0,
                has_fault_address: true,
                fault_address: 0xdead_beef,
            }),
            causes: vec![Cause {
                human_readable: "[MTE]: Use After Free, 0 bytes into allocation".to_string(),
            }],
            threads: Default::default(),
        };
        t.threads.insert(
            4321,
            Thread {
                name: "main".to_string(),
                tagged_addr_ctrl: 1 << 2,
                current_backtrace: vec![BacktraceFrame {
                    file_name: "/apex/com.android.runtime/lib64/bionic/libc.so".to_string(),
                    function_name: "abort".to_string(),
                    function_offset: 167,
                    rel_pc: 0x5_f00,
                }],
            },
        );
        t
    }

    #[test]
    fn test_roundtrip_strips_selinux_nul() {
        let encoded = sample_tombstone().encode_to_vec();
        let decoded = decode_tombstone(&encoded).expect("decode failed");
        assert_eq!(decoded.selinux_label, "u:r:untrusted_app:s0");
    }

    #[test]
    fn test_selinux_label_without_nul_unchanged() {
        let t = Tombstone {
            selinux_label: "u:r:system_server:s0".to_string(),
            ..Default::default()
        };
        let decoded = decode_tombstone(&t.encode_to_vec()).expect("decode failed");
        assert_eq!(decoded.selinux_label, "u:r:system_server:s0");
    }

    #[test]
    fn test_empty_input_decodes_to_defaults() {
        let decoded = decode_tombstone(&[]).expect("decode failed");
        assert_eq!(decoded.uid, 0);
        assert!(decoded.command_line.is_empty());
        assert!(decoded.signal_info.is_none());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let mut encoded = sample_tombstone().encode_to_vec();
        // Field 200, varint wire type: tag key 1600 encodes as [0xc0, 0x0c].
        encoded.extend_from_slice(&[0xc0, 0x0c, 0x2a]);
        let decoded = decode_tombstone(&encoded).expect("decode failed");
        assert_eq!(decoded.uid, 10_123);
        assert_eq!(decoded.causes.len(), 1);
    }

    #[test]
    fn test_truncated_input_is_malformed_not_panic() {
        let encoded = sample_tombstone().encode_to_vec();
        // Cutting inside the trailing length-delimited field leaves a declared
        // length that the remaining bytes cannot satisfy.
        let truncated = &encoded[..encoded.len() - 1];
        assert!(matches!(
            decode_tombstone(truncated),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_oversized_input_rejected_before_decode() {
        let bytes = vec![0u8; MAX_REPORT_SIZE + 1];
        assert!(matches!(
            decode_tombstone(&bytes),
            Err(DecodeError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_threads_keyed_by_tid_not_order() {
        let mut t = sample_tombstone();
        t.tid = 7;
        t.threads.insert(
            7,
            Thread {
                name: "worker".to_string(),
                ..Default::default()
            },
        );
        let decoded = decode_tombstone(&t.encode_to_vec()).expect("decode failed");
        let faulting = decoded.threads.get(&decoded.tid).expect("missing thread");
        assert_eq!(faulting.name, "worker");
    }

    #[test]
    fn test_envelope_extraction_skips_headers() {
        let payload = sample_tombstone().encode_to_vec();
        let mut entry = Vec::new();
        // Unrelated header fields: field 1 (varint) and field 2 (string).
        entry.extend_from_slice(&[0x08, 0x2a]);
        entry.extend_from_slice(&[0x12, 0x03]);
        entry.extend_from_slice(b"hdr");
        entry.extend_from_slice(
            &TombstoneEnvelope {
                tombstone: payload.clone(),
            }
            .encode_to_vec(),
        );

        let extracted = extract_from_envelope(&entry).expect("extract failed");
        assert_eq!(extracted, payload);
    }

    #[test]
    fn test_envelope_without_payload_is_missing() {
        // Envelope consisting only of an unrelated header field.
        let entry = [0x08, 0x2a];
        assert!(matches!(
            extract_from_envelope(&entry),
            Err(DecodeError::MissingPayload)
        ));
    }

    proptest! {
        /// Decode is total: arbitrary bytes either decode or fail with an
        /// error, and never partially apply or panic.
        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let _ = decode_tombstone(&bytes);
            let _ = extract_from_envelope(&bytes);
        }

        /// Every well-formed encoding decodes back to the message it came
        /// from (modulo the NUL normalization, which is idempotent).
        #[test]
        fn prop_wellformed_roundtrip(uid in any::<u32>(), uptime in any::<u32>()) {
            let t = Tombstone { uid, process_uptime: uptime, ..Default::default() };
            let decoded = decode_tombstone(&t.encode_to_vec()).expect("decode failed");
            prop_assert_eq!(decoded.uid, uid);
            prop_assert_eq!(decoded.process_uptime, uptime);
        }
    }
}
