//! Config-backed implementations of the external registry boundaries.
//!
//! The core pipeline resolves identities through the [`ProcessRegistry`] and
//! [`PackageRegistry`] traits; on a full platform those are the live process
//! manager and the package manager. The daemon ships a static package table
//! loaded from config and an in-memory process registry the embedding host
//! updates as processes come and go.

use std::collections::HashMap;
use std::sync::RwLock;

use faultline_core::identity::{PackageRecord, PackageRegistry, ProcessRegistry, ProcessSnapshot};
use faultline_core::policy::AdvisoryKind;

use crate::config::PackageEntry;

/// Package registry backed by the static config table.
#[derive(Debug, Default)]
pub struct TablePackageRegistry {
    by_app_id: HashMap<u32, Vec<PackageRecord>>,
    by_name: HashMap<String, TableEntry>,
}

#[derive(Debug, Clone)]
struct TableEntry {
    record: PackageRecord,
    suppress_memtag_advisory: bool,
}

impl TablePackageRegistry {
    /// Builds the registry from config entries.
    #[must_use]
    pub fn from_entries(entries: &[PackageEntry]) -> Self {
        let mut by_app_id: HashMap<u32, Vec<PackageRecord>> = HashMap::new();
        let mut by_name = HashMap::new();

        for entry in entries {
            let record = PackageRecord {
                package_name: entry.name.clone(),
                is_system: entry.system,
            };
            by_app_id.entry(entry.app_id).or_default().push(record.clone());
            by_name.insert(
                entry.name.clone(),
                TableEntry {
                    record,
                    suppress_memtag_advisory: entry.suppress_memtag_advisory,
                },
            );
        }

        Self { by_app_id, by_name }
    }
}

impl PackageRegistry for TablePackageRegistry {
    fn packages_for_app_id(&self, app_id: u32) -> Vec<PackageRecord> {
        self.by_app_id.get(&app_id).cloned().unwrap_or_default()
    }

    fn package_by_name(&self, package_name: &str) -> Option<PackageRecord> {
        self.by_name
            .get(package_name)
            .map(|entry| entry.record.clone())
    }

    fn is_advisory_suppressed(&self, package_name: &str, kind: AdvisoryKind) -> bool {
        if kind != AdvisoryKind::MemoryTagFault {
            return false;
        }
        self.by_name
            .get(package_name)
            .is_some_and(|entry| entry.suppress_memtag_advisory)
    }
}

/// In-memory live-process registry.
///
/// The embedding host registers processes as they start and deregisters them
/// on exit; lookups reflect whatever is currently registered.
#[derive(Debug, Default)]
pub struct InMemoryProcessRegistry {
    inner: RwLock<HashMap<u32, ProcessSnapshot>>,
}

impl InMemoryProcessRegistry {
    /// Registers (or replaces) the record for a pid.
    pub fn register(&self, pid: u32, snapshot: ProcessSnapshot) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.insert(pid, snapshot);
    }

    /// Removes the record for a pid.
    pub fn deregister(&self, pid: u32) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.remove(&pid);
    }
}

impl ProcessRegistry for InMemoryProcessRegistry {
    fn snapshot_by_pid(&self, pid: u32) -> Option<ProcessSnapshot> {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.get(&pid).cloned()
    }
}
