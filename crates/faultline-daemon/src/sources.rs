//! Event-source adapters.
//!
//! Two independent sources feed the handler with no ordering guarantee
//! between them: a directory poller that picks up newly written tombstone
//! files (live events) and a queue drainer that replays spooled envelope
//! entries (historical events). Each report is handed off on its own
//! blocking task; the sources themselves never decode anything.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::handler::TombstoneHandler;

/// Polls a directory for new tombstone files, forever.
///
/// Files present at startup are considered already delivered (the queue
/// drainer owns historical replay) and are only marked as seen. Every file
/// appearing afterwards is dispatched to the handler as a live event on its
/// own blocking task.
pub async fn poll_tombstone_dir(
    handler: Arc<TombstoneHandler>,
    dir: PathBuf,
    poll_interval: Duration,
) {
    let mut seen = scan_dir(&dir).into_iter().collect::<HashSet<_>>();
    debug!(dir = %dir.display(), preexisting = seen.len(), "watching tombstone directory");

    loop {
        tokio::time::sleep(poll_interval).await;

        let current = scan_dir(&dir);
        for path in &current {
            if seen.insert(path.clone()) {
                let handler = Arc::clone(&handler);
                let path = path.clone();
                tokio::task::spawn_blocking(move || handler.handle_report_file(&path));
            }
        }

        // Files removed from the directory are forgotten so the seen set
        // stays bounded by the directory's own size.
        let current: HashSet<_> = current.into_iter().collect();
        seen.retain(|path| current.contains(path));
    }
}

/// Replays every spooled queue entry in the directory, oldest first.
///
/// Each entry's recorded time is its file modification time. Unreadable
/// entries are logged and skipped; the drain itself never fails.
pub fn drain_queue(handler: &TombstoneHandler, dir: &Path) {
    let mut entries: Vec<(i64, PathBuf)> = scan_dir(dir)
        .into_iter()
        .filter_map(|path| entry_timestamp_ms(&path).map(|ts| (ts, path)))
        .collect();
    entries.sort();

    debug!(dir = %dir.display(), count = entries.len(), "draining queue");
    for (timestamp_ms, path) in entries {
        match std::fs::read(&path) {
            Ok(bytes) => handler.handle_queue_entry(&bytes, timestamp_ms),
            Err(error) => warn!(path = %path.display(), %error, "unreadable queue entry"),
        }
    }
}

/// Lists the regular files in a directory, sorted by name.
///
/// A missing or unreadable directory is treated as empty; the next poll
/// retries.
fn scan_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(dir = %dir.display(), %error, "failed to scan directory");
            return Vec::new();
        },
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    paths
}

fn entry_timestamp_ms(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified).timestamp_millis())
}
