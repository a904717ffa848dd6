//! Bounded per-user skip-list bookkeeping.
//!
//! External package-state management records, per user, which advisory kinds
//! a package has opted out of; the policy engine reads those lists when it
//! gates an advisory. The store is the one piece of shared mutable state in
//! the pipeline: a single mutex guards it, held only for the duration of one
//! entry operation and never across an external call.
//!
//! Capacity is bounded per user with least-recently-used eviction. In
//! practice at most one package needs an entry at a time, so the cap mainly
//! protects against unbounded growth from a misbehaving writer.

use std::collections::HashMap;
use std::sync::Mutex;

/// Default per-user entry cap.
pub const SKIP_LIST_CAPACITY: usize = 50;

/// One package's skip entry.
#[derive(Debug, Clone)]
struct SkipEntry {
    package_name: String,
    kinds: Vec<String>,
}

/// Per-user bounded list, most recently used last.
#[derive(Debug, Default)]
struct UserSkipLists {
    entries: Vec<SkipEntry>,
}

impl UserSkipLists {
    fn position(&self, package_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.package_name == package_name)
    }

    fn touch(&mut self, index: usize) {
        let entry = self.entries.remove(index);
        self.entries.push(entry);
    }
}

/// Process-wide skip-list store, keyed by user id then package name.
#[derive(Debug)]
pub struct SkipListStore {
    capacity: usize,
    users: Mutex<HashMap<u32, UserSkipLists>>,
}

impl Default for SkipListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipListStore {
    /// Creates a store with the default per-user capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(SKIP_LIST_CAPACITY)
    }

    /// Creates a store with an explicit per-user capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Records the advisory kinds a package skips for one user, replacing
    /// any previous entry for the package and refreshing its recency.
    pub fn record_skips(&self, user_id: u32, package_name: &str, kinds: Vec<String>) {
        let mut users = match self.users.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let user = users.entry(user_id).or_default();

        if let Some(index) = user.position(package_name) {
            user.entries.remove(index);
        } else if user.entries.len() >= self.capacity {
            // Least recently used entry sits at the front.
            user.entries.remove(0);
        }
        user.entries.push(SkipEntry {
            package_name: package_name.to_string(),
            kinds,
        });
    }

    /// Clears a package's entry, if any. Called when external package state
    /// is reset.
    pub fn clear_package(&self, user_id: u32, package_name: &str) {
        let mut users = match self.users.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(user) = users.get_mut(&user_id) {
            if let Some(index) = user.position(package_name) {
                user.entries.remove(index);
            }
        }
    }

    /// Returns whether the package skips the given advisory kind, refreshing
    /// the entry's recency on a hit.
    #[must_use]
    pub fn is_skipped(&self, user_id: u32, package_name: &str, kind: &str) -> bool {
        let mut users = match self.users.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(user) = users.get_mut(&user_id) else {
            return false;
        };
        let Some(index) = user.position(package_name) else {
            return false;
        };
        let skipped = user.entries[index].kinds.iter().any(|k| k == kind);
        user.touch(index);
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_entries_are_not_skipped() {
        let store = SkipListStore::new();
        assert!(!store.is_skipped(0, "com.example.app", "memory_tag_fault"));
    }

    #[test]
    fn test_record_and_query() {
        let store = SkipListStore::new();
        store.record_skips(0, "com.example.app", vec!["memory_tag_fault".to_string()]);
        assert!(store.is_skipped(0, "com.example.app", "memory_tag_fault"));
        assert!(!store.is_skipped(0, "com.example.app", "allocator_fault"));
        // Scoped per user.
        assert!(!store.is_skipped(10, "com.example.app", "memory_tag_fault"));
    }

    #[test]
    fn test_rerecord_replaces_entry() {
        let store = SkipListStore::new();
        store.record_skips(0, "com.example.app", vec!["memory_tag_fault".to_string()]);
        store.record_skips(0, "com.example.app", vec!["allocator_fault".to_string()]);
        assert!(!store.is_skipped(0, "com.example.app", "memory_tag_fault"));
        assert!(store.is_skipped(0, "com.example.app", "allocator_fault"));
    }

    #[test]
    fn test_clear_package() {
        let store = SkipListStore::new();
        store.record_skips(0, "com.example.app", vec!["memory_tag_fault".to_string()]);
        store.clear_package(0, "com.example.app");
        assert!(!store.is_skipped(0, "com.example.app", "memory_tag_fault"));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let store = SkipListStore::with_capacity(2);
        store.record_skips(0, "pkg.a", vec!["memory_tag_fault".to_string()]);
        store.record_skips(0, "pkg.b", vec!["memory_tag_fault".to_string()]);

        // Reading pkg.a refreshes it, making pkg.b the eviction candidate.
        assert!(store.is_skipped(0, "pkg.a", "memory_tag_fault"));
        store.record_skips(0, "pkg.c", vec!["memory_tag_fault".to_string()]);

        assert!(store.is_skipped(0, "pkg.a", "memory_tag_fault"));
        assert!(!store.is_skipped(0, "pkg.b", "memory_tag_fault"));
        assert!(store.is_skipped(0, "pkg.c", "memory_tag_fault"));
    }

    #[test]
    fn test_capacity_is_per_user() {
        let store = SkipListStore::with_capacity(1);
        store.record_skips(0, "pkg.a", vec!["memory_tag_fault".to_string()]);
        store.record_skips(1, "pkg.b", vec!["memory_tag_fault".to_string()]);
        assert!(store.is_skipped(0, "pkg.a", "memory_tag_fault"));
        assert!(store.is_skipped(1, "pkg.b", "memory_tag_fault"));
    }
}
