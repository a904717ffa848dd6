//! Tracing-backed presenter.
//!
//! The daemon does not render UI; it hands fully-formed intents to the
//! platform notification surface. This implementation emits them as
//! structured log events, which is the handoff point the host's
//! presentation layer subscribes to.

use faultline_core::policy::{AdvisoryIntent, CrashReportNotice};
use faultline_core::presenter::{PresentError, Presenter};
use tracing::info;

/// Presenter that publishes intents as structured tracing events.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_advisory(&self, intent: &AdvisoryIntent) -> Result<(), PresentError> {
        info!(
            kind = %intent.kind,
            package = %intent.package_name,
            uid = intent.uid,
            title_key = intent.title_key,
            target_action = intent.target_action,
            "advisory notification\n{}",
            intent.report_text,
        );
        Ok(())
    }

    fn show_crash_report(&self, notice: &CrashReportNotice) -> Result<(), PresentError> {
        info!(
            program = %notice.program_name,
            timestamp_ms = notice.timestamp_ms,
            report_action = notice.show_report_action,
            "system crash notification\n{}",
            notice.report_text,
        );
        Ok(())
    }
}
