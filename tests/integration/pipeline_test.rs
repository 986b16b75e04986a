//! Pipeline Integration Tests
//!
//! Full runs over a sample log and source file with both roles driven by
//! scripted providers, plus the provider-free tools-only run.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use incident_lens::models::{AnalysisConfig, Verdict, DEGRADED_REPORT};
use incident_lens::services::{write_sample_files, ReplayScript};
use incident_lens::services::orchestrator::{
    run_pipeline, run_tools_only, EventSink, PipelineInputs,
};
use incident_lens::AppError;
use incident_lens_core::PipelineEvent;
use incident_lens_llm::{LlmProvider, LlmResponse, LlmResult, ScriptedProvider, UsageStats};

const SAMPLE_LOG: &str = "\
2024-03-14T10:00:00Z INFO [request-id: abc-123] Processing login for alice@example.com
2024-03-14T10:00:01Z ERROR [request-id: abc-123] NullPointerException at UserService.java:42
    at com.example.UserService.getUserDetails(UserService.java:42)
    at com.example.LoginController.handleLogin(LoginController.java:28)
2024-03-14T10:00:02Z INFO [request-id: xyz-999] Health check ok
2024-03-14T10:00:03Z WARN Cache miss rate above threshold
";

const SAMPLE_CODE: &str = "\
public class UserService {
    public UserDetails getUserDetails(String id) {
        Session session = cache.get(id);
        // session can be null after eviction
        return session.getUser().getDetails();
    }
}
";

struct Fixture {
    dir: TempDir,
    inputs: PipelineInputs,
    config: AnalysisConfig,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("app.log");
        let code_path = dir.path().join("UserService.java");
        fs::write(&log_path, SAMPLE_LOG).unwrap();
        fs::write(&code_path, SAMPLE_CODE).unwrap();

        let mut config = AnalysisConfig::default();
        config.output.dir = dir.path().join("output").display().to_string();
        config.pipeline.min_rounds = 1;
        config.pipeline.max_rounds = 2;

        Self {
            inputs: PipelineInputs::new(log_path, vec![code_path]),
            dir,
            config,
        }
    }

    fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.output.dir)
    }

    fn code_path(&self) -> String {
        self.inputs.code_paths[0].display().to_string()
    }
}

fn analyzer_reply(confidence: f64, tool_calls: Value) -> String {
    json!({
        "hypothesis": "UserService dereferences a null session after cache eviction",
        "evidence": ["NullPointerException at UserService.java:42"],
        "suspect_files": ["UserService.java"],
        "fix_suggestion": "Check the session for null and reload it from the store",
        "confidence": confidence,
        "assumptions": ["cache eviction happened before the request"],
        "tool_calls": tool_calls,
    })
    .to_string()
}

fn critic_reply(verdict: &str, open_issues: Value) -> String {
    json!({
        "verdict": verdict,
        "issues_found": [],
        "open_issues": open_issues,
        "assumptions_challenged": [],
        "final_report": "# Incident Report\n\nA null session returned by the cache caused the login failure in UserService.",
        "remaining_risks": ["Other callers of cache.get may share the bug"],
        "confidence_score": 0.82,
    })
    .to_string()
}

fn with_usage(text: String, input: u64, output: u64) -> LlmResult<LlmResponse> {
    Ok(LlmResponse {
        usage: UsageStats::new(input, output),
        ..LlmResponse::text(text)
    })
}

fn scripted(name: &str, responses: Vec<LlmResult<LlmResponse>>) -> Arc<dyn LlmProvider> {
    Arc::new(ScriptedProvider::new(name, responses))
}

fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_full_pipeline_writes_artifacts() {
    let mut fixture = Fixture::new();
    fixture.config.pricing.input_per_1k_tokens = 0.5;
    fixture.config.pricing.output_per_1k_tokens = 1.5;
    let grep = json!([{"name": "grep_error", "args": {"pattern": "session", "files": [fixture.code_path()]}}]);

    let analyzer = scripted(
        "analyzer",
        vec![with_usage(analyzer_reply(0.8, grep), 1000, 200)],
    );
    let critic = scripted(
        "critic",
        vec![with_usage(critic_reply("confirmed", json!([])), 1200, 300)],
    );

    let (events, rx) = EventSink::channel();
    let outcome = run_pipeline(&fixture.inputs, &fixture.config, analyzer, critic, &events)
        .await
        .unwrap();

    // Report combines both roles
    let report = &outcome.report;
    assert!(report.title.starts_with("Incident Analysis - "));
    assert_eq!(report.verdict, Verdict::Confirmed);
    assert_eq!(report.confidence, 0.8);
    assert_eq!(report.remaining_risks, vec!["Other callers of cache.get may share the bug"]);
    assert!(report.narrative.starts_with("# Incident Report"));

    // Metrics
    let metrics = &outcome.metrics;
    assert_eq!(metrics.conversation_rounds, 1);
    assert!(metrics.converged);
    assert_eq!(metrics.token_usage.analyzer.total, 1200);
    assert_eq!(metrics.token_usage.critic.total, 1500);
    assert_eq!(metrics.token_usage.total.total, 2700);
    // 2.2 * 0.5 + 0.5 * 1.5
    assert_eq!(metrics.estimated_cost.amount, 1.85);
    assert_eq!(metrics.confidence_scores.critic, 0.82);
    assert_eq!(metrics.chunking_info.original_lines, 4);
    assert_eq!(metrics.chunking_info.chunked_lines, 2);
    assert_eq!(metrics.chunking_info.method, "abc-123");
    assert!(metrics.warning.is_none());
    for stage in [
        "read_logs",
        "parse_logs",
        "chunk_and_redact",
        "read_code",
        "analyzer_round_1",
        "tool_execution_round_1",
        "critic_round_1",
        "multi_round_analysis",
        "generate_report",
    ] {
        assert!(metrics.timings.contains_key(stage), "missing timing {}", stage);
    }

    // Artifacts on disk
    let artifacts = &outcome.artifacts;
    assert!(artifacts.report.starts_with(fixture.output_dir()));
    assert_eq!(fs::read_to_string(&artifacts.report).unwrap(), report.narrative);
    let written: Value =
        serde_json::from_str(&fs::read_to_string(&artifacts.metrics).unwrap()).unwrap();
    assert_eq!(written["conversation_rounds"], 1);
    assert_eq!(written["chunking_info"]["method"], "abc-123");
    assert!(written.get("warning").is_none());

    // Conversation export never carries raw PII
    let conversation = fs::read_to_string(&artifacts.conversation).unwrap();
    assert!(!conversation.contains("alice@example.com"));
    assert!(conversation.contains("[EMAIL_REDACTED]"));
    let conversation: Value = serde_json::from_str(&conversation).unwrap();
    let agents: Vec<&str> = conversation["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["metadata"]["agent"].as_str())
        .collect();
    assert_eq!(agents, vec!["analyzer_round_1", "critic_round_1"]);
    assert_eq!(conversation["tool_results"]["grep_error"]["total_matches"], 3);
    assert!(conversation["context"]["code_files"]
        .as_object()
        .unwrap()
        .contains_key(&fixture.code_path()));

    // Event stream
    let kinds: Vec<&str> = drain(rx).iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "tool_result",
            "log_chunk_selected",
            "agent_message",
            "tool_result",
            "agent_message",
            "round_complete",
            "pipeline_complete",
        ]
    );
}

#[tokio::test]
async fn test_confirmed_first_round_waits_for_min_rounds() {
    let mut fixture = Fixture::new();
    fixture.config.pipeline.min_rounds = 2;
    fixture.config.pipeline.max_rounds = 3;

    let analyzer = scripted(
        "analyzer",
        vec![
            Ok(LlmResponse::text(analyzer_reply(0.7, json!([])))),
            Ok(LlmResponse::text(analyzer_reply(0.9, json!([])))),
        ],
    );
    let critic = scripted(
        "critic",
        vec![
            Ok(LlmResponse::text(critic_reply("confirmed", json!([])))),
            Ok(LlmResponse::text(critic_reply("confirmed", json!([])))),
        ],
    );

    let outcome = run_pipeline(&fixture.inputs, &fixture.config, analyzer, critic, &EventSink::none())
        .await
        .unwrap();

    assert_eq!(outcome.metrics.conversation_rounds, 2);
    assert!(outcome.metrics.converged);
    assert_eq!(outcome.report.confidence, 0.9);
}

#[tokio::test]
async fn test_degraded_critic_still_produces_report() {
    let mut fixture = Fixture::new();
    fixture.config.pipeline.max_rounds = 1;

    let analyzer = scripted("analyzer", vec![Ok(LlmResponse::text(analyzer_reply(0.3, json!([]))))]);
    let critic = scripted(
        "critic",
        vec![
            Ok(LlmResponse::text("I agree with the analyzer.")),
            Ok(LlmResponse::text("Yes, I agree.")),
        ],
    );

    let outcome = run_pipeline(&fixture.inputs, &fixture.config, analyzer, critic, &EventSink::none())
        .await
        .unwrap();

    assert_eq!(outcome.report.verdict, Verdict::Error);
    assert_eq!(outcome.report.narrative, DEGRADED_REPORT);
    assert!(!outcome.metrics.converged);
    assert_eq!(
        outcome.metrics.warning.as_deref(),
        Some("Low confidence score: 0.3")
    );
    assert!(outcome.artifacts.metrics.exists());
}

#[tokio::test]
async fn test_analyzer_failure_aborts_before_persisting() {
    let fixture = Fixture::new();
    let analyzer = scripted(
        "analyzer",
        vec![
            Ok(LlmResponse::text("no idea")),
            Ok(LlmResponse::text("still no idea")),
        ],
    );
    let critic = scripted("critic", vec![]);

    let err = run_pipeline(&fixture.inputs, &fixture.config, analyzer, critic, &EventSink::none())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Agent(_)));
    assert!(!fixture.output_dir().exists());
}

#[tokio::test]
async fn test_missing_inputs_fail_before_any_call() {
    let fixture = Fixture::new();
    let inputs = PipelineInputs::new(
        fixture.inputs.log_path.clone(),
        vec![fixture.dir.path().join("Missing.java")],
    );
    let provider = Arc::new(ScriptedProvider::new("analyzer", vec![]));

    let err = run_pipeline(
        &inputs,
        &fixture.config,
        provider.clone(),
        scripted("critic", vec![]),
        &EventSink::none(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(provider.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let mut fixture = Fixture::new();
    fixture.config.pipeline.min_rounds = 5;
    let err = run_pipeline(
        &fixture.inputs,
        &fixture.config,
        scripted("analyzer", vec![]),
        scripted("critic", vec![]),
        &EventSink::none(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_tools_only_run() {
    let fixture = Fixture::new();
    let report = run_tools_only(&fixture.inputs, &fixture.config).await.unwrap();

    assert_eq!(report.parsed_logs.summary.total_lines, 4);
    assert_eq!(report.chunked_logs.original_count, 4);
    assert_eq!(report.chunked_logs.chunked_count, 2);
    assert!(report.chunked_logs.redacted);

    // "null" appears on the comment line only
    let grep = report.grep_test.unwrap();
    assert_eq!(grep.total_matches, 1);
    assert_eq!(grep.files_searched, 1);
    assert!(report.timings.contains_key("grep_test"));
}

#[tokio::test]
async fn test_tools_only_without_code_skips_grep() {
    let fixture = Fixture::new();
    let inputs = PipelineInputs::new(fixture.inputs.log_path.clone(), vec![]);
    let report = run_tools_only(&inputs, &fixture.config).await.unwrap();

    assert!(report.grep_test.is_none());
    let value = serde_json::to_value(&report).unwrap();
    assert!(value.get("grep_test").is_none());
    assert_eq!(value["chunked_logs"]["redacted"], true);
}

#[tokio::test]
async fn test_sample_workspace_replay_converges_in_two_rounds() {
    let dir = TempDir::new().unwrap();
    let files = write_sample_files(&dir.path().join("samples")).unwrap();
    let mut config = incident_lens::storage::load_config(&files.config).unwrap();
    config.output.dir = dir.path().join("output").display().to_string();

    let (analyzer, critic) = ReplayScript::load(&files.replay).unwrap().into_providers();
    let inputs = PipelineInputs::new(files.log.clone(), files.code.clone());
    let outcome = run_pipeline(&inputs, &config, analyzer, critic, &EventSink::none())
        .await
        .unwrap();

    assert_eq!(outcome.metrics.conversation_rounds, 2);
    assert!(outcome.metrics.converged);
    assert_eq!(outcome.report.verdict, Verdict::Confirmed);
    assert_eq!(outcome.report.confidence, 0.9);
    assert!(outcome.artifacts.report.is_file());
}

#[tokio::test]
async fn test_open_issues_as_text_do_not_end_the_loop() {
    let fixture = Fixture::new();
    let mut lenient = serde_json::from_str::<Value>(&critic_reply("confirmed", json!([]))).unwrap();
    lenient["open_issues"] = json!("verify the eviction timing");

    let analyzer = scripted(
        "analyzer",
        vec![
            Ok(LlmResponse::text(analyzer_reply(0.6, json!([])))),
            Ok(LlmResponse::text(analyzer_reply(0.8, json!([])))),
        ],
    );
    let critic = scripted(
        "critic",
        vec![
            Ok(LlmResponse::text(lenient.to_string())),
            Ok(LlmResponse::text(critic_reply("confirmed", json!([])))),
        ],
    );

    let outcome = run_pipeline(&fixture.inputs, &fixture.config, analyzer, critic, &EventSink::none())
        .await
        .unwrap();
    assert_eq!(outcome.metrics.conversation_rounds, 2);
    assert!(outcome.metrics.converged);
    assert_eq!(outcome.report.confidence, 0.8);
}
