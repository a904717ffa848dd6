//! Pure fault and owner classification predicates.
//!
//! Everything here is a stateless function of the decoded tombstone (plus
//! the platform capability flag). Predicates are order-independent and
//! side-effect-free so policy decisions can be tested against them directly.

use serde::{Deserialize, Serialize};

use crate::report::Tombstone;

/// Signal number of a segmentation fault.
pub const SIGSEGV: i32 = 11;

/// si_code for an asynchronous memory-tagging check failure.
pub const SEGV_MTEAERR: i32 = 8;

/// si_code for a synchronous memory-tagging check failure.
pub const SEGV_MTESERR: i32 = 9;

/// Abort-message prefix emitted by the hardened allocator on a fatal
/// heap-corruption check. Matched exactly; near-misses do not count.
pub const HARDENED_MALLOC_PREFIX: &str = "hardened_malloc: fatal allocator error: ";

/// Placeholder program name for a tombstone with an empty argv.
pub const NO_PROGRAM_NAME: &str = "//no progName//";

/// Size of one per-user id band.
pub const PER_USER_RANGE: u32 = 100_000;

/// First application id within a user band.
pub const FIRST_APPLICATION_ID: u32 = 10_000;

/// Last application id within a user band.
pub const LAST_APPLICATION_ID: u32 = 19_999;

/// First isolated-process id within a user band.
pub const FIRST_ISOLATED_ID: u32 = 90_000;

/// Last isolated-process id within a user band.
pub const LAST_ISOLATED_ID: u32 = 99_999;

/// Classification of a process owner id by its numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKind {
    /// An installed application.
    Application,
    /// A sandboxed isolated process.
    Isolated,
    /// A platform-internal process (native daemons, system ids).
    Platform,
}

/// Strips the user band from an owner id, leaving the per-user app id.
#[must_use]
pub const fn app_id(uid: u32) -> u32 {
    uid % PER_USER_RANGE
}

/// Extracts the user id an owner id belongs to.
#[must_use]
pub const fn user_id(uid: u32) -> u32 {
    uid / PER_USER_RANGE
}

/// Classifies an owner id into its numeric-range kind.
#[must_use]
pub const fn owner_kind(uid: u32) -> OwnerKind {
    let id = app_id(uid);
    if id >= FIRST_APPLICATION_ID && id <= LAST_APPLICATION_ID {
        OwnerKind::Application
    } else if id >= FIRST_ISOLATED_ID && id <= LAST_ISOLATED_ID {
        OwnerKind::Isolated
    } else {
        OwnerKind::Platform
    }
}

/// Returns whether the tombstone records a hardware memory-tagging fault.
///
/// True iff the platform supports memory tagging and the fatal signal is
/// SIGSEGV with an MTE si_code (sync or async).
#[must_use]
pub fn is_memtag_fault(t: &Tombstone, mte_supported: bool) -> bool {
    let Some(signal) = &t.signal_info else {
        return false;
    };
    mte_supported
        && signal.number == SIGSEGV
        && (signal.code == SEGV_MTEAERR || signal.code == SEGV_MTESERR)
}

/// Returns whether the tombstone records a fatal hardened-allocator error.
#[must_use]
pub fn is_allocator_fatal(t: &Tombstone) -> bool {
    t.abort_message.starts_with(HARDENED_MALLOC_PREFIX)
}

/// Derives the program name from the tombstone's argv.
///
/// The name is the basename of `command_line[0]`;
/// [`NO_PROGRAM_NAME`] stands in when the argv is empty.
#[must_use]
pub fn program_name(t: &Tombstone) -> String {
    match t.command_line.first() {
        Some(path) => path.rsplit('/').next().unwrap_or(path).to_string(),
        None => NO_PROGRAM_NAME.to_string(),
    }
}
