//! Deterministic text rendering of a decoded tombstone.
//!
//! The rendered block is used verbatim as the notification body and as the
//! attached diagnostic text, so its content and ordering are part of the
//! stable surface: rendering the same tombstone twice must produce
//! byte-identical output.

use std::fmt::Write;

use super::wire::Tombstone;

// PR_GET_TAGGED_ADDR_CTRL fault-check bits.
const PR_MTE_TCF_SYNC: u64 = 1 << 1;
const PR_MTE_TCF_ASYNC: u64 = 1 << 2;

/// Formats a tombstone into a multi-line human-readable report.
///
/// The memory-tagging status line is rendered only when the platform
/// supports the feature; the async control bit takes priority when both
/// fault-check bits are set.
#[must_use]
pub fn render_report(t: &Tombstone, mte_supported: bool) -> String {
    let mut out = String::new();

    out.push_str("osVersion: ");
    out.push_str(&t.build_fingerprint);
    let _ = write!(out, "\nuid: {} (", t.uid);
    out.push_str(&t.selinux_label);
    out.push_str(")\ncmdline:");
    for arg in &t.command_line {
        out.push(' ');
        out.push_str(arg);
    }
    let _ = write!(out, "\nprocessUptime: {}s", t.process_uptime);

    if !t.abort_message.is_empty() {
        out.push_str("\n\nabortMessage: ");
        out.push_str(&t.abort_message);
    }

    if let Some(signal) = &t.signal_info {
        let _ = write!(
            out,
            "\n\nsignal: {} ({}), code {} ({})",
            signal.number, signal.name, signal.code, signal.code_name
        );
        if signal.has_sender {
            let _ = write!(out, ", senderUid {}", signal.sender_uid);
        }
        if signal.has_fault_address {
            let _ = write!(out, ", faultAddr {:x}", signal.fault_address);
        }
    }

    for cause in &t.causes {
        out.push_str("\ncause: ");
        out.push_str(&cause.human_readable);
    }

    match t.threads.get(&t.tid) {
        None => out.push_str("\n\nno thread info"),
        Some(thread) => {
            out.push_str("\nthreadName: ");
            out.push_str(&thread.name);

            if mte_supported {
                out.push_str("\nMTE: ");
                let tac = thread.tagged_addr_ctrl;
                if tac & (PR_MTE_TCF_SYNC | PR_MTE_TCF_ASYNC) != 0 {
                    if tac & PR_MTE_TCF_ASYNC != 0 {
                        out.push_str("enabled");
                    } else {
                        out.push_str("enabled; sync");
                    }
                } else {
                    out.push_str("not enabled");
                }
            }

            out.push_str("\n\nbacktrace:");
            for frame in &thread.current_backtrace {
                out.push_str("\n    ");
                out.push_str(&frame.file_name);
                out.push_str(" (");
                if !frame.function_name.is_empty() {
                    let _ = write!(out, "{}+{}, ", frame.function_name, frame.function_offset);
                }
                let _ = write!(out, "pc {:x})", frame.rel_pc);
            }
        },
    }

    out
}
