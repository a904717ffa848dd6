//! Tombstone entry points.
//!
//! Both event sources funnel into [`TombstoneHandler`]: new tombstone files
//! are live events stamped with the current time, replayed queue entries are
//! historical events carrying their own recorded time.
//!
//! The handler runs inside a privileged, long-lived process, so availability
//! dominates completeness: every public entry point catches every failure
//! from decode through presentation and converts it to a diagnostic log
//! line. A failure surfaces as "event dropped, diagnostic logged" — nothing
//! else.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use faultline_core::platform::PlatformCaps;
use faultline_core::policy::{Origin, PolicyEngine, Verdict};
use faultline_core::presenter::Presenter;
use faultline_core::report::{self, DecodeError};
use thiserror::Error;
use tracing::{debug, warn};

/// Internal ingestion failure, caught at the entry-point boundary.
#[derive(Debug, Error)]
enum IngestError {
    /// Reading the raw bytes failed.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The raw bytes did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The crash-report ingestion funnel.
pub struct TombstoneHandler {
    policy: PolicyEngine,
    presenter: Arc<dyn Presenter>,
    caps: PlatformCaps,
}

impl TombstoneHandler {
    /// Builds a handler over the policy engine and the presentation
    /// boundary.
    #[must_use]
    pub fn new(policy: PolicyEngine, presenter: Arc<dyn Presenter>, caps: PlatformCaps) -> Self {
        Self {
            policy,
            presenter,
            caps,
        }
    }

    /// Entry point A: a new tombstone file appeared.
    ///
    /// The file is read fully into memory and treated as a live event with
    /// the current time as its timestamp. Never propagates a failure.
    pub fn handle_report_file(&self, path: &Path) {
        let timestamp_ms = Utc::now().timestamp_millis();
        let result = std::fs::read(path)
            .map_err(IngestError::from)
            .and_then(|bytes| self.handle_tombstone_bytes(&bytes, timestamp_ms, Origin::Live));

        if let Err(error) = result {
            warn!(path = %path.display(), %error, "dropped tombstone file");
        }
    }

    /// Entry point B: a spooled queue entry was replayed.
    ///
    /// The tombstone is extracted from its envelope (all other envelope
    /// fields are skipped) and treated as a historical event with the
    /// entry's own recorded timestamp. Never propagates a failure.
    pub fn handle_queue_entry(&self, entry: &[u8], entry_timestamp_ms: i64) {
        let result = report::extract_from_envelope(entry)
            .map_err(IngestError::from)
            .and_then(|payload| {
                self.handle_tombstone_bytes(&payload, entry_timestamp_ms, Origin::Historical)
            });

        match result {
            Ok(()) => {},
            Err(IngestError::Decode(DecodeError::MissingPayload)) => {
                debug!("queue entry has no tombstone payload");
            },
            Err(error) => warn!(%error, "dropped queue entry"),
        }
    }

    /// The single classification funnel both entry points feed.
    fn handle_tombstone_bytes(
        &self,
        bytes: &[u8],
        timestamp_ms: i64,
        origin: Origin,
    ) -> Result<(), IngestError> {
        let tombstone = report::decode_tombstone(bytes)?;
        let text = report::render_report(&tombstone, self.caps.memory_tagging);

        match self.policy.decide(&tombstone, origin, timestamp_ms, &text) {
            Verdict::Drop(reason) => {
                debug!(%reason, "crash report not surfaced");
            },
            Verdict::Advisory(intent) => {
                // Fire-and-forget: a rejected notification is logged, never
                // retried.
                if let Err(error) = self.presenter.show_advisory(&intent) {
                    warn!(package = %intent.package_name, %error, "advisory not shown");
                }
            },
            Verdict::CrashReport(notice) => {
                if let Err(error) = self.presenter.show_crash_report(&notice) {
                    warn!(program = %notice.program_name, %error, "crash report not shown");
                }
            },
        }

        Ok(())
    }
}
