//! Wire message types for the tombstone format.
//!
//! A tombstone is a tagged, length-delimited binary record. The field layout
//! below is the stable wire contract; unknown field numbers are skipped by
//! the decoder rather than rejected, so producers may add fields without
//! breaking older consumers.

use std::collections::BTreeMap;

use prost::Message;

/// A decoded crash tombstone.
///
/// All scalar fields default to zero/empty when absent from the wire;
/// `signal_info` is the only truly optional sub-object. The faulting thread
/// is identified by looking up [`Tombstone::tid`] in [`Tombstone::threads`],
/// never by map order.
#[derive(Clone, PartialEq, Message)]
pub struct Tombstone {
    /// OS build fingerprint of the device the process crashed on.
    #[prost(string, tag = "1")]
    pub build_fingerprint: String,

    /// Owner id of the crashed process (UNIX uid).
    #[prost(uint32, tag = "2")]
    pub uid: u32,

    /// Process id.
    #[prost(uint32, tag = "3")]
    pub pid: u32,

    /// Id of the faulting thread.
    #[prost(uint32, tag = "4")]
    pub tid: u32,

    /// SELinux label of the process. Producers usually include the
    /// terminating NUL byte; [`super::decode_tombstone`] strips it.
    #[prost(string, tag = "5")]
    pub selinux_label: String,

    /// argv of the crashed process. May be empty.
    #[prost(string, repeated, tag = "6")]
    pub command_line: Vec<String>,

    /// Seconds the process had been alive when it crashed.
    #[prost(uint32, tag = "7")]
    pub process_uptime: u32,

    /// Message passed to abort(), if any.
    #[prost(string, tag = "8")]
    pub abort_message: String,

    /// The fatal signal, absent for aborts without signal info.
    #[prost(message, optional, tag = "9")]
    pub signal_info: Option<Signal>,

    /// Human-readable fault causes, in declaration order.
    #[prost(message, repeated, tag = "10")]
    pub causes: Vec<Cause>,

    /// All threads of the process at crash time, keyed by thread id.
    #[prost(btree_map = "uint32, message", tag = "11")]
    pub threads: BTreeMap<u32, Thread>,
}

/// The signal that terminated the process.
#[derive(Clone, PartialEq, Message)]
pub struct Signal {
    /// Signal number (e.g. 11 for SIGSEGV).
    #[prost(int32, tag = "1")]
    pub number: i32,

    /// Symbolic signal name.
    #[prost(string, tag = "2")]
    pub name: String,

    /// si_code value.
    #[prost(int32, tag = "3")]
    pub code: i32,

    /// Symbolic si_code name.
    #[prost(string, tag = "4")]
    pub code_name: String,

    /// Whether the sending process is known.
    #[prost(bool, tag = "5")]
    pub has_sender: bool,

    /// Owner id of the sender, meaningful only when `has_sender` is set.
    #[prost(int32, tag = "6")]
    pub sender_uid: i32,

    /// Whether a fault address was recorded.
    #[prost(bool, tag = "7")]
    pub has_fault_address: bool,

    /// Faulting address, meaningful only when `has_fault_address` is set.
    #[prost(uint64, tag = "8")]
    pub fault_address: u64,
}

/// One human-readable cause line.
#[derive(Clone, PartialEq, Message)]
pub struct Cause {
    #[prost(string, tag = "1")]
    pub human_readable: String,
}

/// Per-thread state captured at crash time.
#[derive(Clone, PartialEq, Message)]
pub struct Thread {
    /// Thread name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Raw PR_GET_TAGGED_ADDR_CTRL value for this thread.
    #[prost(uint64, tag = "2")]
    pub tagged_addr_ctrl: u64,

    /// Unwound stack, innermost frame first.
    #[prost(message, repeated, tag = "3")]
    pub current_backtrace: Vec<BacktraceFrame>,
}

/// One frame of an unwound backtrace.
#[derive(Clone, PartialEq, Message)]
pub struct BacktraceFrame {
    /// Mapped file the pc falls into.
    #[prost(string, tag = "1")]
    pub file_name: String,

    /// Demangled function name; empty when symbolization failed.
    #[prost(string, tag = "2")]
    pub function_name: String,

    /// Offset of the pc from the function start.
    #[prost(uint64, tag = "3")]
    pub function_offset: u64,

    /// pc relative to the start of the mapping.
    #[prost(uint64, tag = "4")]
    pub rel_pc: u64,
}

/// Envelope wrapping a tombstone in the historical-event queue.
///
/// Queue entries carry several header fields alongside the payload; only the
/// embedded tombstone bytes are of interest here, everything else is skipped
/// by the decoder.
#[derive(Clone, PartialEq, Message)]
pub struct TombstoneEnvelope {
    /// Serialized [`Tombstone`] bytes.
    #[prost(bytes = "vec", tag = "4")]
    pub tombstone: Vec<u8>,
}
