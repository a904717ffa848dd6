//! Crash surfacing policy.
//!
//! [`PolicyEngine::decide`] is the suppression/dedup state machine: given a
//! decoded tombstone, its delivery origin, and the resolved owner identity,
//! it produces exactly one [`Verdict`] — drop the event, raise an
//! app-specific advisory, or raise the primary system-crash report. An
//! advisory and a primary report are mutually exclusive by construction.
//!
//! Decision order, each step either terminal or falling through:
//!
//! 1. app/isolated owner with no resolvable identity — drop;
//! 2. trusted package — continue to the primary branch under the package's
//!    own name; packageless platform process — consult the literal skip
//!    list (some native processes terminate themselves by design);
//! 3. untrusted app — on live events only, raise a memory-tagging or
//!    allocator advisory gated by the package's suppression state, then
//!    stop either way (the generic crash surface owns app crashes);
//! 4. primary branch — `system_server` always surfaces with the report
//!    attachment; otherwise live memory-tagging faults force surfacing past
//!    the global setting, and everything else is gated on the skip flag and
//!    that setting.

mod skip_store;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use self::skip_store::{SkipListStore, SKIP_LIST_CAPACITY};
use crate::classify::{self, OwnerKind};
use crate::identity::{
    OwnerIdentity, OwnerResolver, PackageRegistry, ProcessRegistry, ResolveError,
};
use crate::platform::PlatformCaps;
use crate::report::Tombstone;
use crate::settings::Settings;

/// Program name of the core system process; its crashes always surface.
pub const SYSTEM_SERVER: &str = "system_server";

/// Packageless platform programs whose crashes are dropped by name.
/// bootanimation intentionally crashes in some conditions.
const SKIPPED_PROGRAMS: &[&str] = &["bootanimation"];

/// Delivery origin of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Observed at the moment of capture.
    Live,
    /// Replayed later from a persisted log.
    Historical,
}

impl Origin {
    /// Returns `true` for live delivery.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Kind of an app-specific advisory notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// A hardware memory-tagging fault in the app's process.
    MemoryTagFault,
    /// A fatal hardened-allocator error in the app's process.
    AllocatorFault,
}

impl AdvisoryKind {
    /// Stable machine-readable name, used as the skip-list key.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MemoryTagFault => "memory_tag_fault",
            Self::AllocatorFault => "allocator_fault",
        }
    }

    /// Key of the localized notification title.
    #[must_use]
    pub const fn title_key(&self) -> &'static str {
        match self {
            Self::MemoryTagFault => "advisory_memtag_crash_title",
            Self::AllocatorFault => "advisory_hmalloc_crash_title",
        }
    }

    /// Settings action the notification deep-links to.
    #[must_use]
    pub const fn target_action(&self) -> &'static str {
        match self {
            Self::MemoryTagFault => "app.settings.MEMORY_TAGGING",
            Self::AllocatorFault => "app.settings.HARDENED_ALLOCATOR",
        }
    }

    /// Whether packages may suppress this advisory individually.
    ///
    /// Memory-tagging advisories are per-package suppressible; allocator
    /// advisories are not.
    #[must_use]
    pub const fn is_package_suppressible(&self) -> bool {
        matches!(self, Self::MemoryTagFault)
    }
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An app-specific advisory, consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryIntent {
    /// Advisory kind.
    pub kind: AdvisoryKind,
    /// Package the advisory targets.
    pub package_name: String,
    /// Owner id of the package.
    pub uid: u32,
    /// Key of the localized title.
    pub title_key: &'static str,
    /// Settings action for the notification tap target.
    pub target_action: &'static str,
    /// Rendered report text attached as diagnostic payload.
    pub report_text: String,
}

/// The primary system-crash report, consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReportNotice {
    /// Name the crash is reported under.
    pub program_name: String,
    /// Rendered report text used as the notification body.
    pub report_text: String,
    /// Arrival timestamp of the report, milliseconds since epoch.
    pub timestamp_ms: i64,
    /// Whether the report-attachment action is offered.
    pub show_report_action: bool,
}

/// Why a report produced no user-visible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// No identity could be resolved for an app/isolated owner id.
    UnresolvedIdentity {
        /// Owner id of the report.
        uid: u32,
        /// Process id of the report.
        pid: u32,
    },
    /// Several (or zero) packages share the owner's app id.
    AmbiguousIdentity {
        /// The contested app id.
        app_id: u32,
        /// Number of candidate packages.
        count: usize,
    },
    /// Untrusted app crash with no advisory to raise; the generic crash
    /// surface owns it.
    AppCrashDelegated {
        /// The owning package.
        package_name: String,
    },
    /// The advisory was gated off by the package's suppression state.
    AdvisorySuppressed {
        /// The owning package.
        package_name: String,
        /// The suppressed advisory kind.
        kind: AdvisoryKind,
    },
    /// The program is on the literal skip list.
    SkipListed {
        /// Program name.
        program_name: String,
    },
    /// System-crash notifications are disabled and nothing forced this one.
    NotificationsDisabled {
        /// Program name.
        program_name: String,
    },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedIdentity { uid, pid } => {
                write!(f, "no package for uid {uid} (pid {pid})")
            },
            Self::AmbiguousIdentity { app_id, count } => {
                write!(f, "app id {app_id} shared by {count} packages")
            },
            Self::AppCrashDelegated { package_name } => {
                write!(f, "app crash for {package_name} delegated to generic surface")
            },
            Self::AdvisorySuppressed { package_name, kind } => {
                write!(f, "{kind} advisory suppressed for {package_name}")
            },
            Self::SkipListed { program_name } => {
                write!(f, "{program_name} is skip-listed")
            },
            Self::NotificationsDisabled { program_name } => {
                write!(f, "system crash notifications disabled for {program_name}")
            },
        }
    }
}

/// Outcome of the policy machine for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No user-visible action; the reason is logged.
    Drop(DropReason),
    /// Raise an app-specific advisory.
    Advisory(AdvisoryIntent),
    /// Raise the primary system-crash report.
    CrashReport(CrashReportNotice),
}

/// The suppression/dedup decision machine.
pub struct PolicyEngine {
    package_registry: Arc<dyn PackageRegistry>,
    settings: Arc<dyn Settings>,
    resolver: OwnerResolver,
    skip_store: SkipListStore,
    caps: PlatformCaps,
}

impl PolicyEngine {
    /// Builds the engine over the external registry and settings boundaries.
    #[must_use]
    pub fn new(
        process_registry: Arc<dyn ProcessRegistry>,
        package_registry: Arc<dyn PackageRegistry>,
        settings: Arc<dyn Settings>,
        caps: PlatformCaps,
    ) -> Self {
        let resolver = OwnerResolver::new(process_registry, Arc::clone(&package_registry));
        Self {
            package_registry,
            settings,
            resolver,
            skip_store: SkipListStore::new(),
            caps,
        }
    }

    /// Decides the outcome for one report.
    ///
    /// Pure apart from registry/settings reads; evaluates each classifier
    /// predicate at most once and holds no lock across the call.
    #[must_use]
    pub fn decide(
        &self,
        t: &Tombstone,
        origin: Origin,
        timestamp_ms: i64,
        report_text: &str,
    ) -> Verdict {
        let mut program_name = classify::program_name(t);
        let mut should_skip = false;

        match classify::owner_kind(t.uid) {
            OwnerKind::Application | OwnerKind::Isolated => {
                let identity = match self.resolver.resolve(t.uid, t.pid) {
                    Ok(identity) => identity,
                    Err(ResolveError::Ambiguous { app_id, count }) => {
                        return Verdict::Drop(DropReason::AmbiguousIdentity { app_id, count });
                    },
                    Err(ResolveError::Absent { uid, pid }) => {
                        return Verdict::Drop(DropReason::UnresolvedIdentity { uid, pid });
                    },
                };

                if !identity.is_system {
                    return self.decide_app_crash(t, origin, &identity, report_text);
                }

                // Trusted packages are reported under their own name.
                program_name = identity.package_name;
            },
            OwnerKind::Platform => {
                if SKIPPED_PROGRAMS.contains(&program_name.as_str()) {
                    should_skip = true;
                }
            },
        }

        self.decide_primary(t, origin, program_name, should_skip, timestamp_ms, report_text)
    }

    /// Untrusted-app branch: at most a supplementary advisory, never the
    /// primary report.
    fn decide_app_crash(
        &self,
        t: &Tombstone,
        origin: Origin,
        identity: &OwnerIdentity,
        report_text: &str,
    ) -> Verdict {
        if origin.is_live() {
            let kind = if classify::is_memtag_fault(t, self.caps.memory_tagging) {
                Some(AdvisoryKind::MemoryTagFault)
            } else if classify::is_allocator_fatal(t) {
                Some(AdvisoryKind::AllocatorFault)
            } else {
                None
            };

            if let Some(kind) = kind {
                if self.is_advisory_suppressed(identity.uid, &identity.package_name, kind) {
                    return Verdict::Drop(DropReason::AdvisorySuppressed {
                        package_name: identity.package_name.clone(),
                        kind,
                    });
                }
                return Verdict::Advisory(AdvisoryIntent {
                    kind,
                    package_name: identity.package_name.clone(),
                    uid: identity.uid,
                    title_key: kind.title_key(),
                    target_action: kind.target_action(),
                    report_text: report_text.to_owned(),
                });
            }
        }

        Verdict::Drop(DropReason::AppCrashDelegated {
            package_name: identity.package_name.clone(),
        })
    }

    /// Primary-report branch for trusted and platform processes.
    fn decide_primary(
        &self,
        t: &Tombstone,
        origin: Origin,
        program_name: String,
        should_skip: bool,
        timestamp_ms: i64,
        report_text: &str,
    ) -> Verdict {
        let show_report_action;

        if program_name == SYSTEM_SERVER {
            show_report_action = true;
        } else {
            // Live memory-tagging faults are never silently dropped;
            // historical replays of the same fault do not get the bypass.
            let ignore_setting =
                origin.is_live() && classify::is_memtag_fault(t, self.caps.memory_tagging);
            show_report_action = ignore_setting && !should_skip;

            if should_skip {
                return Verdict::Drop(DropReason::SkipListed { program_name });
            }
            if !ignore_setting && !self.settings.show_system_crash_notifications() {
                return Verdict::Drop(DropReason::NotificationsDisabled { program_name });
            }
        }

        Verdict::CrashReport(CrashReportNotice {
            program_name,
            report_text: report_text.to_owned(),
            timestamp_ms,
            show_report_action,
        })
    }

    fn is_advisory_suppressed(&self, uid: u32, package_name: &str, kind: AdvisoryKind) -> bool {
        if !kind.is_package_suppressible() {
            return false;
        }
        if self
            .package_registry
            .is_advisory_suppressed(package_name, kind)
        {
            return true;
        }
        self.skip_store
            .is_skipped(classify::user_id(uid), package_name, kind.name())
    }

    /// Records externally-managed advisory skips for a package.
    ///
    /// System packages never get entries; their advisories are not
    /// suppressible through this path.
    pub fn record_skips(&self, user_id: u32, package_name: &str, kinds: Vec<String>) {
        if let Some(package) = self.package_registry.package_by_name(package_name) {
            if package.is_system {
                return;
            }
        }
        self.skip_store.record_skips(user_id, package_name, kinds);
    }

    /// The skip-list store, exposed for external package-state management.
    #[must_use]
    pub const fn skip_store(&self) -> &SkipListStore {
        &self.skip_store
    }
}
