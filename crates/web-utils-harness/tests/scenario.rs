use web_utils_harness::mock::{MockHost, MockResponse};
use web_utils_harness::{Check, CheckStatus, Harness, HarnessConfig};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_file_lifecycle_in_order() {
    init();
    let mut harness = Harness::new(MockHost::new());

    assert_eq!(harness.run(Check::FileOpen), CheckStatus::Success);
    assert_eq!(harness.host().files["test_path"], Vec::<u8>::new());

    assert_eq!(harness.run(Check::FileWrite), CheckStatus::Success);
    assert_eq!(harness.host().files["test_path"], b"content\0".to_vec());

    assert_eq!(harness.run(Check::FileTell), CheckStatus::Success);
    assert_eq!(harness.run(Check::FileSeek), CheckStatus::Success);
    assert_eq!(harness.run(Check::FileRead), CheckStatus::Success);

    assert_eq!(harness.run(Check::FileClose), CheckStatus::Success);
    assert_eq!(harness.host().open_count(), 0);

    assert_eq!(harness.run(Check::FileRemove), CheckStatus::Success);
    assert!(!harness.host().files.contains_key("test_path"));
    assert!(harness.file_handle().is_some());
}

#[test]
fn test_full_scenario_passes() {
    init();
    let mut harness = Harness::new(MockHost::new());
    let report = harness.run_scenario();

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.outcomes.len(), Check::ALL.len());
    for (outcome, check) in report.outcomes.iter().zip(Check::ALL) {
        assert_eq!(outcome.check, check.export_name());
    }

    let host = harness.into_host();
    assert_eq!(host.console, vec!["testing console log", "test data"]);
    assert_eq!(host.assertions.len(), 1);
    assert_eq!(host.requests.len(), 1);
}

#[test]
fn test_host_strings_available() {
    init();
    let mut harness = Harness::new(MockHost::new());
    assert_eq!(harness.run(Check::BrowserInfo), CheckStatus::Success);
    assert_eq!(harness.run(Check::OriginInfo), CheckStatus::Success);
}

#[test]
fn test_not_found_response_fails_scenario() {
    init();
    let mut host = MockHost::new();
    host.response = MockResponse::new(404, b"test data");
    let mut harness = Harness::new(host);

    let report = harness.run_scenario();
    assert!(!report.is_success());
    assert_eq!(report.failed, 1);
    assert_eq!(report.status_of(Check::HttpsRequest), Some(CheckStatus::Failure));
    assert_eq!(report.status_of(Check::FileRemove), Some(CheckStatus::Success));

    let json = report.to_json().unwrap();
    assert!(json.contains("unexpected response code: got 404, expected 200"));
}

#[test]
fn test_checks_out_of_order() {
    init();
    let mut harness = Harness::new(MockHost::new());

    // read before anything was opened
    assert_eq!(harness.run(Check::FileRead), CheckStatus::Failure);

    assert_eq!(harness.run(Check::FileOpen), CheckStatus::Success);
    // tell before write sees offset 0
    assert_eq!(harness.run(Check::FileTell), CheckStatus::Failure);
    // remove before close also drops the open handle in the shim
    assert_eq!(harness.run(Check::FileRemove), CheckStatus::Success);
    assert_eq!(harness.run(Check::FileClose), CheckStatus::Failure);
}

#[test]
fn test_repeated_scenario_is_consistent_on_fresh_state() {
    init();
    let mut harness = Harness::new(MockHost::new());
    assert!(harness.run_scenario().is_success());
    // the file was removed and the handle replaced on open, so a rerun sees
    // the same state as the first run
    assert!(harness.run_scenario().is_success());
}

#[test]
fn test_failed_open_cascades() {
    init();
    let mut host = MockHost::new();
    host.fail_open = true;
    let mut harness = Harness::new(host);

    let report = harness.run_scenario();
    for check in [
        Check::FileOpen,
        Check::FileWrite,
        Check::FileTell,
        Check::FileSeek,
        Check::FileRead,
        Check::FileClose,
    ] {
        assert_eq!(report.status_of(check), Some(CheckStatus::Failure), "{check:?}");
    }
    // nothing to remove
    assert_eq!(report.status_of(Check::FileRemove), Some(CheckStatus::Failure));
    assert_eq!(report.status_of(Check::ConsoleLog), Some(CheckStatus::Success));
}

#[test]
fn test_custom_config() {
    init();
    let config = HarnessConfig::from_json(
        r#"{"test_path": "other/path", "test_content": "hello world", "expected_response": "ok"}"#,
    )
    .unwrap();
    let mut host = MockHost::new();
    host.response = MockResponse::new(200, b"ok");
    let mut harness = Harness::with_config(host, config);

    let report = harness.run_scenario();
    assert!(report.is_success(), "{report:?}");
}
