//! Global settings boundary.
//!
//! The pipeline reads exactly one global setting; it never writes settings.
//! Persistent storage is owned by the host.

use std::sync::atomic::{AtomicBool, Ordering};

/// Read-only view of the global crash-surfacing settings.
pub trait Settings: Send + Sync {
    /// Whether crashes of trusted system processes raise notifications.
    ///
    /// Live memory-tagging faults bypass this setting; nothing else does.
    fn show_system_crash_notifications(&self) -> bool;
}

/// In-memory settings backed by an atomic flag.
///
/// The daemon seeds it from config; tests flip it directly.
#[derive(Debug, Default)]
pub struct StaticSettings {
    show_system_crash_notifications: AtomicBool,
}

impl StaticSettings {
    /// Creates settings with the given initial value.
    #[must_use]
    pub fn new(show_system_crash_notifications: bool) -> Self {
        Self {
            show_system_crash_notifications: AtomicBool::new(show_system_crash_notifications),
        }
    }

    /// Updates the flag. Used by the host's settings observer.
    pub fn set_show_system_crash_notifications(&self, value: bool) {
        self.show_system_crash_notifications
            .store(value, Ordering::Relaxed);
    }
}

impl Settings for StaticSettings {
    fn show_system_crash_notifications(&self) -> bool {
        self.show_system_crash_notifications.load(Ordering::Relaxed)
    }
}
