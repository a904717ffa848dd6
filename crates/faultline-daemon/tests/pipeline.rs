//! End-to-end pipeline tests: raw bytes through decode, classification,
//! policy, and presentation, wired with the daemon's own config-backed
//! collaborator implementations.

use std::io::Write;
use std::sync::{Arc, Mutex};

use faultline_core::platform::PlatformCaps;
use faultline_core::policy::{AdvisoryIntent, AdvisoryKind, CrashReportNotice, PolicyEngine};
use faultline_core::presenter::{PresentError, Presenter};
use faultline_core::report::{Signal, Tombstone, TombstoneEnvelope};
use faultline_core::settings::StaticSettings;
use faultline_daemon::config::FaultlineConfig;
use faultline_daemon::handler::TombstoneHandler;
use faultline_daemon::registries::{InMemoryProcessRegistry, TablePackageRegistry};
use prost::Message;

#[derive(Default)]
struct RecordingPresenter {
    advisories: Mutex<Vec<AdvisoryIntent>>,
    reports: Mutex<Vec<CrashReportNotice>>,
}

impl Presenter for RecordingPresenter {
    fn show_advisory(&self, intent: &AdvisoryIntent) -> Result<(), PresentError> {
        self.advisories.lock().expect("lock").push(intent.clone());
        Ok(())
    }

    fn show_crash_report(&self, notice: &CrashReportNotice) -> Result<(), PresentError> {
        self.reports.lock().expect("lock").push(notice.clone());
        Ok(())
    }
}

const CONFIG: &str = r#"
    [daemon]
    show_system_crash_notifications = false

    [[packages]]
    name = "com.example.app"
    app_id = 10123

    [[packages]]
    name = "com.vendor.diag"
    app_id = 10050
    system = true

    [[packages]]
    name = "com.example.optout"
    app_id = 10222
    suppress_memtag_advisory = true
"#;

fn build(
    show_system_crashes: bool,
) -> (Arc<TombstoneHandler>, Arc<RecordingPresenter>) {
    let config = FaultlineConfig::from_toml(CONFIG).expect("config");
    let caps = PlatformCaps::with_memory_tagging(true);
    let presenter = Arc::new(RecordingPresenter::default());

    let policy = PolicyEngine::new(
        Arc::new(InMemoryProcessRegistry::default()),
        Arc::new(TablePackageRegistry::from_entries(&config.packages)),
        Arc::new(StaticSettings::new(show_system_crashes)),
        caps,
    );
    let handler = Arc::new(TombstoneHandler::new(
        policy,
        Arc::clone(&presenter) as Arc<dyn Presenter>,
        caps,
    ));
    (handler, presenter)
}

fn memtag_tombstone(uid: u32, argv0: &str) -> Tombstone {
    Tombstone {
        uid,
        pid: 4321,
        tid: 4321,
        command_line: vec![argv0.to_string()],
        signal_info: Some(Signal {
            number: 11,
            name: "SIGSEGV".to_string(),
            code: 8,
            code_name: "SEGV_MTEAERR".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn as_file(t: &Tombstone) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&t.encode_to_vec()).expect("write");
    file
}

fn as_queue_entry(t: &Tombstone) -> Vec<u8> {
    TombstoneEnvelope {
        tombstone: t.encode_to_vec(),
    }
    .encode_to_vec()
}

#[test]
fn live_memtag_app_crash_raises_exactly_one_advisory() {
    let (handler, presenter) = build(false);

    let file = as_file(&memtag_tombstone(10_123, "/system/bin/app_process"));
    handler.handle_report_file(file.path());

    let advisories = presenter.advisories.lock().expect("lock");
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::MemoryTagFault);
    assert_eq!(advisories[0].package_name, "com.example.app");
    assert!(presenter.reports.lock().expect("lock").is_empty());
}

#[test]
fn suppressed_package_gets_no_advisory() {
    let (handler, presenter) = build(false);

    let file = as_file(&memtag_tombstone(10_222, "/system/bin/app_process"));
    handler.handle_report_file(file.path());

    assert!(presenter.advisories.lock().expect("lock").is_empty());
    assert!(presenter.reports.lock().expect("lock").is_empty());
}

#[test]
fn system_server_surfaces_regardless_of_setting() {
    let (handler, presenter) = build(false);

    handler.handle_queue_entry(&as_queue_entry(&memtag_tombstone(1000, "system_server")), 99);

    let reports = presenter.reports.lock().expect("lock");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].show_report_action);
    assert_eq!(reports[0].timestamp_ms, 99);
}

#[test]
fn historical_trusted_memtag_respects_disabled_setting() {
    let (handler, presenter) = build(false);

    // com.vendor.diag is a trusted package but not system_server; on the
    // historical path the live-memtag bypass does not apply.
    handler.handle_queue_entry(
        &as_queue_entry(&memtag_tombstone(10_050, "/system/bin/app_process")),
        99,
    );

    assert!(presenter.advisories.lock().expect("lock").is_empty());
    assert!(presenter.reports.lock().expect("lock").is_empty());
}

#[test]
fn skip_listed_platform_program_drops_with_setting_enabled() {
    let (handler, presenter) = build(true);

    handler.handle_queue_entry(
        &as_queue_entry(&Tombstone {
            uid: 1003,
            command_line: vec!["/system/bin/bootanimation".to_string()],
            ..Default::default()
        }),
        99,
    );

    assert!(presenter.reports.lock().expect("lock").is_empty());
}

#[test]
fn platform_crash_surfaces_when_setting_enabled() {
    let (handler, presenter) = build(true);

    handler.handle_queue_entry(
        &as_queue_entry(&Tombstone {
            uid: 1000,
            command_line: vec!["/system/bin/netd".to_string()],
            ..Default::default()
        }),
        99,
    );

    let reports = presenter.reports.lock().expect("lock");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].program_name, "netd");
    assert!(!reports[0].show_report_action);
    assert!(reports[0].report_text.contains("cmdline: /system/bin/netd"));
}
