//! Owner identity resolution.
//!
//! A tombstone carries only numeric ids; the owning package identity is
//! resolved against two external registries, tried in fixed priority order:
//!
//! 1. the live-process registry — authoritative, because a live record
//!    reflects the process's actual runtime identity, which can differ from
//!    a purely numeric guess (isolated processes in particular);
//! 2. the static package registry keyed by app id — used only when no live
//!    record exists, and only when exactly one package owns the app id.
//!    Zero or several candidates make the resolution ambiguous, and an
//!    ambiguous resolution drops the event rather than guessing.
//!
//! Identities are computed fresh per report and never cached across reports.

use std::sync::Arc;

use thiserror::Error;

use crate::classify::{self, OwnerKind};
use crate::policy::AdvisoryKind;

/// Resolved owning identity of a crashed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentity {
    /// Name of the owning package.
    pub package_name: String,
    /// Authoritative owner id for the package.
    pub uid: u32,
    /// Whether the package is a trusted (system-tier) package.
    pub is_system: bool,
}

/// Snapshot of a live process record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// Name of the package the process is running as.
    pub package_name: String,
    /// Owner id the process is actually running under.
    pub uid: u32,
    /// Whether the owning package is a system package.
    pub is_system: bool,
}

/// A package known to the static registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package name.
    pub package_name: String,
    /// Whether the package is a system package.
    pub is_system: bool,
}

/// Live-process registry boundary.
pub trait ProcessRegistry: Send + Sync {
    /// Looks up a live process record by pid.
    fn snapshot_by_pid(&self, pid: u32) -> Option<ProcessSnapshot>;
}

/// Static package registry boundary.
///
/// Also exposes the per-package advisory suppression flag, which is owned by
/// external package state and read-only here.
pub trait PackageRegistry: Send + Sync {
    /// Returns every package sharing the given app id.
    fn packages_for_app_id(&self, app_id: u32) -> Vec<PackageRecord>;

    /// Looks up a package by name.
    fn package_by_name(&self, package_name: &str) -> Option<PackageRecord>;

    /// Returns whether the package has suppressed the given advisory kind.
    fn is_advisory_suppressed(&self, package_name: &str, kind: AdvisoryKind) -> bool;
}

/// Errors produced by owner resolution. Both variants drop the event.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// More than one (or zero) packages share the app id.
    #[error("ambiguous owner for app id {app_id}: {count} candidate packages")]
    Ambiguous {
        /// The contested app id.
        app_id: u32,
        /// Number of candidate packages.
        count: usize,
    },

    /// No strategy produced an identity.
    #[error("no identity for uid {uid} (pid {pid})")]
    Absent {
        /// Owner id of the report.
        uid: u32,
        /// Process id of the report.
        pid: u32,
    },
}

/// Outcome of a single resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The strategy produced an authoritative identity.
    Resolved(OwnerIdentity),
    /// The strategy applies but the lookup was ambiguous; resolution stops.
    Ambiguous {
        /// The contested app id.
        app_id: u32,
        /// Number of candidate packages.
        count: usize,
    },
    /// The strategy does not apply; the next one is tried.
    NotFound,
}

/// One resolution path, tried in chain order by [`OwnerResolver`].
pub trait ResolveStrategy: Send + Sync {
    /// Attempts to resolve the owner of a report.
    fn try_resolve(&self, uid: u32, pid: u32) -> Resolution;
}

/// Authoritative path: the live process record, when one exists.
pub struct LiveProcessStrategy {
    registry: Arc<dyn ProcessRegistry>,
}

impl LiveProcessStrategy {
    /// Creates the strategy over a process registry.
    #[must_use]
    pub fn new(registry: Arc<dyn ProcessRegistry>) -> Self {
        Self { registry }
    }
}

impl ResolveStrategy for LiveProcessStrategy {
    fn try_resolve(&self, _uid: u32, pid: u32) -> Resolution {
        match self.registry.snapshot_by_pid(pid) {
            Some(snapshot) => Resolution::Resolved(OwnerIdentity {
                package_name: snapshot.package_name,
                uid: snapshot.uid,
                is_system: snapshot.is_system,
            }),
            None => Resolution::NotFound,
        }
    }
}

/// Fallback path: the static app-id mapping.
///
/// Only applies to application ids, and only when exactly one package shares
/// the id; for that lookup the report's own uid is authoritative.
pub struct AppIdStrategy {
    registry: Arc<dyn PackageRegistry>,
}

impl AppIdStrategy {
    /// Creates the strategy over a package registry.
    #[must_use]
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self { registry }
    }
}

impl ResolveStrategy for AppIdStrategy {
    fn try_resolve(&self, uid: u32, _pid: u32) -> Resolution {
        if classify::owner_kind(uid) != OwnerKind::Application {
            return Resolution::NotFound;
        }

        let app_id = classify::app_id(uid);
        let mut candidates = self.registry.packages_for_app_id(app_id);
        if candidates.len() == 1 {
            let package = candidates.remove(0);
            Resolution::Resolved(OwnerIdentity {
                package_name: package.package_name,
                uid,
                is_system: package.is_system,
            })
        } else {
            Resolution::Ambiguous {
                app_id,
                count: candidates.len(),
            }
        }
    }
}

/// Fixed-priority chain of resolution strategies.
pub struct OwnerResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl OwnerResolver {
    /// Builds the standard chain: live process record first, app-id fallback
    /// second.
    #[must_use]
    pub fn new(
        process_registry: Arc<dyn ProcessRegistry>,
        package_registry: Arc<dyn PackageRegistry>,
    ) -> Self {
        Self {
            strategies: vec![
                Box::new(LiveProcessStrategy::new(process_registry)),
                Box::new(AppIdStrategy::new(package_registry)),
            ],
        }
    }

    /// Resolves the owning identity of a report.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Ambiguous`] when a strategy found several candidate
    /// packages, [`ResolveError::Absent`] when every strategy came up empty.
    pub fn resolve(&self, uid: u32, pid: u32) -> Result<OwnerIdentity, ResolveError> {
        for strategy in &self.strategies {
            match strategy.try_resolve(uid, pid) {
                Resolution::Resolved(identity) => return Ok(identity),
                Resolution::Ambiguous { app_id, count } => {
                    return Err(ResolveError::Ambiguous { app_id, count });
                },
                Resolution::NotFound => {},
            }
        }
        Err(ResolveError::Absent { uid, pid })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapProcessRegistry(HashMap<u32, ProcessSnapshot>);

    impl ProcessRegistry for MapProcessRegistry {
        fn snapshot_by_pid(&self, pid: u32) -> Option<ProcessSnapshot> {
            self.0.get(&pid).cloned()
        }
    }

    struct MapPackageRegistry(Vec<(u32, PackageRecord)>);

    impl PackageRegistry for MapPackageRegistry {
        fn packages_for_app_id(&self, app_id: u32) -> Vec<PackageRecord> {
            self.0
                .iter()
                .filter(|(id, _)| *id == app_id)
                .map(|(_, record)| record.clone())
                .collect()
        }

        fn package_by_name(&self, package_name: &str) -> Option<PackageRecord> {
            self.0
                .iter()
                .map(|(_, record)| record)
                .find(|record| record.package_name == package_name)
                .cloned()
        }

        fn is_advisory_suppressed(&self, _package_name: &str, _kind: AdvisoryKind) -> bool {
            false
        }
    }

    fn record(name: &str, system: bool) -> PackageRecord {
        PackageRecord {
            package_name: name.to_string(),
            is_system: system,
        }
    }

    #[test]
    fn test_live_record_wins_over_app_id_mapping() {
        let process = Arc::new(MapProcessRegistry(HashMap::from([(
            77,
            ProcessSnapshot {
                package_name: "com.example.isolated".to_string(),
                uid: 10_200,
                is_system: false,
            },
        )])));
        let packages = Arc::new(MapPackageRegistry(vec![(
            10_123,
            record("com.example.other", false),
        )]));

        let resolver = OwnerResolver::new(process, packages);
        let identity = resolver.resolve(10_123, 77).expect("resolve failed");
        assert_eq!(identity.package_name, "com.example.isolated");
        assert_eq!(identity.uid, 10_200);
    }

    #[test]
    fn test_app_id_fallback_single_match() {
        let process = Arc::new(MapProcessRegistry(HashMap::new()));
        let packages = Arc::new(MapPackageRegistry(vec![(
            10_123,
            record("com.example.app", false),
        )]));

        let resolver = OwnerResolver::new(process, packages);
        let identity = resolver.resolve(10_123, 77).expect("resolve failed");
        assert_eq!(identity.package_name, "com.example.app");
        // The report uid is authoritative on this path.
        assert_eq!(identity.uid, 10_123);
    }

    #[test]
    fn test_shared_app_id_is_ambiguous() {
        let process = Arc::new(MapProcessRegistry(HashMap::new()));
        let packages = Arc::new(MapPackageRegistry(vec![
            (10_123, record("com.example.a", false)),
            (10_123, record("com.example.b", false)),
        ]));

        let resolver = OwnerResolver::new(process, packages);
        assert!(matches!(
            resolver.resolve(10_123, 77),
            Err(ResolveError::Ambiguous { app_id: 10_123, count: 2 })
        ));
    }

    #[test]
    fn test_unknown_app_id_is_ambiguous_with_zero_candidates() {
        let process = Arc::new(MapProcessRegistry(HashMap::new()));
        let packages = Arc::new(MapPackageRegistry(Vec::new()));

        let resolver = OwnerResolver::new(process, packages);
        assert!(matches!(
            resolver.resolve(10_123, 77),
            Err(ResolveError::Ambiguous { count: 0, .. })
        ));
    }

    #[test]
    fn test_isolated_uid_without_live_record_is_absent() {
        let process = Arc::new(MapProcessRegistry(HashMap::new()));
        let packages = Arc::new(MapPackageRegistry(vec![(
            10_123,
            record("com.example.app", false),
        )]));

        let resolver = OwnerResolver::new(process, packages);
        assert!(matches!(
            resolver.resolve(90_001, 77),
            Err(ResolveError::Absent { uid: 90_001, pid: 77 })
        ));
    }
}
