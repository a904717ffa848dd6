//! Outbound notification boundary.
//!
//! The pipeline never renders UI. Verdicts that surface something are handed
//! to a [`Presenter`] implementation owned by the host's presentation layer.
//! Presentation is fire-and-forget: a rejected request is logged and never
//! retried or requeued.

use thiserror::Error;

use crate::policy::{AdvisoryIntent, CrashReportNotice};

/// Errors from the presentation layer.
#[derive(Debug, Error)]
pub enum PresentError {
    /// The presentation layer rejected or could not accept the request.
    #[error("presentation layer unavailable: {reason}")]
    Unavailable {
        /// Description of the rejection.
        reason: String,
    },
}

/// Presentation-layer boundary.
pub trait Presenter: Send + Sync {
    /// Shows an app-specific advisory notification.
    ///
    /// # Errors
    ///
    /// [`PresentError`] when the presentation layer rejects the request; the
    /// caller logs and drops.
    fn show_advisory(&self, intent: &AdvisoryIntent) -> Result<(), PresentError>;

    /// Shows the primary system-crash report notification.
    ///
    /// # Errors
    ///
    /// [`PresentError`] when the presentation layer rejects the request; the
    /// caller logs and drops.
    fn show_crash_report(&self, notice: &CrashReportNotice) -> Result<(), PresentError>;
}
