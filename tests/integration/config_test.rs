//! Configuration Integration Tests

use std::fs;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use incident_lens::models::AnalysisConfig;
use incident_lens::services::orchestrator::{run_pipeline, EventSink, PipelineInputs};
use incident_lens::storage::{load_config, load_or_default, to_toml};
use incident_lens::AppError;
use incident_lens_llm::ScriptedProvider;

const FULL_CONFIG: &str = r#"
[limits]
max_log_lines = 40
max_code_chars = 5000
max_tool_result_chars = 800

[pipeline]
min_rounds = 1
max_rounds = 4

[agents]
max_attempts = 1

[scoring]
error_weight = 5.0
warn_weight = 0.5
age_penalty_cap_hours = 2.0
cluster_radius = 3

[thresholds]
critical_confidence = 0.7

[pricing]
input_per_1k_tokens = 0.00025
output_per_1k_tokens = 0.0005
currency = "EUR"
note = "list price"

[output]
dir = "reports"

[debug]
include_full_logs = true
"#;

#[test]
fn test_every_section_is_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("incident-lens.toml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.limits.max_log_lines, 40);
    assert_eq!(config.limits.max_tool_result_chars, 800);
    assert_eq!(config.pipeline.max_rounds, 4);
    assert_eq!(config.agents.max_attempts, 1);
    assert_eq!(config.scoring.error_weight, 5.0);
    assert_eq!(config.scoring.cluster_radius, 3);
    assert_eq!(config.thresholds.critical_confidence, 0.7);
    assert_eq!(config.pricing.currency, "EUR");
    assert_eq!(config.output.dir, "reports");
    assert!(config.debug.include_full_logs);

    // Round-trips through the starter-file writer
    let reloaded_path = dir.path().join("copy.toml");
    fs::write(&reloaded_path, to_toml(&config).unwrap()).unwrap();
    assert_eq!(load_config(&reloaded_path).unwrap(), config);
}

#[test]
fn test_defaults_without_file() {
    let config = load_or_default(None).unwrap();
    assert_eq!(config.limits.max_log_lines, 120);
    assert_eq!(config.limits.max_code_chars, 20_000);
    assert_eq!(config.limits.max_tool_result_chars, 1500);
    assert_eq!(config.pipeline.min_rounds, 2);
    assert_eq!(config.pipeline.max_rounds, 3);
    assert_eq!(config.agents.max_attempts, 2);
    assert_eq!(config.output.dir, "output");
}

#[test]
fn test_negative_weight_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[scoring]\nerror_weight = -1.0\n").unwrap();
    assert!(matches!(load_config(&path), Err(AppError::Config(_))));
}

#[tokio::test]
async fn test_attempt_budget_and_full_logs_come_from_config() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("app.log");
    fs::write(&log_path, "2024-01-01T00:00:00Z ERROR disk full on /var/data\n").unwrap();

    let mut config = AnalysisConfig::default();
    config.agents.max_attempts = 1;
    config.debug.include_full_logs = true;
    config.output.dir = dir.path().join("out").display().to_string();

    // A single malformed reply is fatal with a one-attempt budget
    let analyzer = Arc::new(ScriptedProvider::with_texts(
        "analyzer",
        vec!["not json", "{\"unused\": true}"],
    ));
    let err = run_pipeline(
        &PipelineInputs::new(&log_path, vec![]),
        &config,
        analyzer.clone(),
        Arc::new(ScriptedProvider::new("critic", vec![])),
        &EventSink::none(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Agent(_)));
    assert_eq!(analyzer.remaining().await, 1);

    // The first prompt carried the full redacted chunk
    let calls = analyzer.recorded_calls().await;
    let first_user = calls[0]
        .iter()
        .rev()
        .find(|m| m.content.contains("log_summary"))
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&first_user.content).unwrap();
    assert_eq!(payload["log_summary"]["full_logs"]["source"]["method"], "cluster");
    assert_eq!(payload["log_summary"]["error_count"], json!(1));
}
