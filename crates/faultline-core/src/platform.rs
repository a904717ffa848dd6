//! Platform capability probing.

/// Capabilities of the host platform that affect classification and
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCaps {
    /// Whether the hardware supports memory tagging (MTE).
    pub memory_tagging: bool,
}

impl PlatformCaps {
    /// Probes the running host.
    ///
    /// Memory tagging is an aarch64 feature advertised through the auxiliary
    /// vector; every other platform reports it unsupported.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            memory_tagging: detect_memory_tagging(),
        }
    }

    /// Constructs capabilities explicitly. Intended for tests and for hosts
    /// that gate the feature themselves.
    #[must_use]
    pub const fn with_memory_tagging(memory_tagging: bool) -> Self {
        Self { memory_tagging }
    }
}

#[cfg(all(target_os = "linux", target_arch = "aarch64"))]
fn detect_memory_tagging() -> bool {
    use nix::libc;

    // HWCAP2 bit advertising MTE support.
    const HWCAP2_MTE: libc::c_ulong = 1 << 18;

    // getauxval does not fail; it returns 0 for unknown types.
    let hwcap2 = unsafe { libc::getauxval(libc::AT_HWCAP2) };
    hwcap2 & HWCAP2_MTE != 0
}

#[cfg(not(all(target_os = "linux", target_arch = "aarch64")))]
fn detect_memory_tagging() -> bool {
    false
}
