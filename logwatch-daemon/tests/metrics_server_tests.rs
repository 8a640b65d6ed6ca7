//! Integration tests for metrics server functionality.

use logwatch_core::config::MetricsConfig;
use logwatch_daemon::metrics_server;
use serial_test::serial;

#[test]
#[serial]
fn test_install_metrics_recorder_once_per_process() {
    // Given: A valid metrics configuration on an ephemeral port
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 0,
    };

    // When: Installing the recorder twice
    let first = metrics_server::install_metrics_recorder(&config);
    let second = metrics_server::install_metrics_recorder(&config);

    // Then: Only the first install succeeds
    assert!(
        first.is_ok(),
        "install_metrics_recorder should succeed with valid config: {:?}",
        first.err()
    );
    assert!(
        second.is_err(),
        "a second global recorder must be rejected"
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_fails_with_invalid_address() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_owned(),
        port: 9100,
    };

    let result = metrics_server::install_metrics_recorder(&config);

    let err = result.expect_err("invalid IP should be rejected");
    assert!(
        err.to_string().contains("invalid metrics listen address"),
        "got: {}",
        err
    );
}

#[tokio::test]
#[serial]
async fn test_orchestrator_builds_with_metrics_disabled() {
    use logwatch_core::config::LogwatchConfig;

    let dir = tempfile::tempdir().expect("should create temp dir");
    let rules_path = dir.path().join("rules.yaml");
    std::fs::write(&rules_path, "rules: []\nlog_files: []\n").expect("should write rules");

    let mut config = LogwatchConfig::default();
    config.metrics.enabled = false;
    config.tailer.rules_path = rules_path.display().to_string();

    let result = logwatch_daemon::orchestrator::Orchestrator::build_from_config(config).await;

    assert!(
        result.is_ok(),
        "orchestrator should build without a metrics endpoint: {:?}",
        result.err()
    );
}
