//! Parser, Chunking and Tool Router Integration Tests

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use incident_lens::models::ScoringConfig;
use incident_lens::services::chunking::{select_best_chunk, ChunkSource};
use incident_lens::services::redaction::{redact_entries, redact_text};
use incident_lens_core::{LogLevel, ParsedLogs, ToolCall};
use incident_lens_llm::ParameterSchema;
use incident_lens_tools::{parse_logs, FunctionTool, ToolError, ToolRouter};

fn at(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_two_line_log_counts() {
    let parsed = parse_logs("2024-01-01T00:00:00Z ERROR boom\n2024-01-01T00:00:01Z INFO ok");
    assert_eq!(parsed.entries.len(), 2);
    assert_eq!(parsed.summary.error_count, 1);
    assert_eq!(parsed.summary.warn_count, 0);
}

#[test]
fn test_stack_trace_merges_into_error() {
    let raw = "2024-03-14T10:00:00Z INFO Starting application\n\
               2024-03-14T10:00:01Z ERROR NullPointerException at UserService.java:42\n\
               \x20   at com.example.UserService.getUserDetails(UserService.java:42)\n\
               \x20   at com.example.LoginController.handleLogin(LoginController.java:28)\n\
               2024-03-14T10:00:02Z WARN Retrying operation";
    let parsed = parse_logs(raw);

    assert_eq!(parsed.entries.len(), 3);
    assert_eq!(parsed.entries[1].level, LogLevel::Error);
    assert!(parsed.entries[1].raw.contains("LoginController.handleLogin"));
    assert_eq!(parsed.summary.warn_count, 1);
}

#[test]
fn test_parsing_never_fails_on_garbage() {
    let parsed = parse_logs("\u{0}\u{1}binary junk\n\n   \n}{][");
    assert!(parsed.entries.iter().all(|e| e.level == LogLevel::Info));
    assert_eq!(parsed.entries.len(), parsed.summary.total_lines);
}

// ============================================================================
// Chunk selection
// ============================================================================

#[test]
fn test_correlation_group_outranks_unrelated_entry() {
    let raw = "2024-01-01T00:00:00Z ERROR [request-id: abc-123] payment failed\n\
               2024-01-01T00:00:01Z INFO [request-id: abc-123] rollback done\n\
               2024-01-01T00:00:02Z INFO heartbeat";
    let parsed = parse_logs(raw);
    let chunk = select_best_chunk(&parsed, 10, at("2024-01-01T00:00:02Z"), &ScoringConfig::default());

    assert_eq!(
        chunk.source,
        ChunkSource::Group {
            id: "abc-123".to_string(),
            total_groups: 1
        }
    );
    assert_eq!(chunk.entries.len(), 2);
    assert!(chunk.score.unwrap() > 2.9);
}

#[test]
fn test_chunk_never_exceeds_budget() {
    let raw: String = (0..50)
        .map(|i| format!("2024-01-01T00:00:{:02}Z ERROR failure {}\n", i, i))
        .collect();
    let parsed = parse_logs(&raw);
    for max in [0, 1, 3, 7, 49, 50, 200] {
        let chunk = select_best_chunk(&parsed, max, Utc::now(), &ScoringConfig::default());
        assert!(chunk.entries.len() <= max, "chunk over budget {}", max);
    }
}

#[test]
fn test_redacted_chunk_hides_pii() {
    let raw = "2024-01-01T00:00:00Z ERROR login failed for alice@example.com with api_key=sk-123\n\
               2024-01-01T00:00:01Z INFO ok";
    let parsed = parse_logs(raw);
    let chunk = select_best_chunk(&parsed, 10, Utc::now(), &ScoringConfig::default());
    let redacted = redact_entries(&chunk.entries);

    let text = serde_json::to_string(&redacted).unwrap();
    assert!(!text.contains("alice@example.com"));
    assert!(!text.contains("sk-123"));
    assert_eq!(redact_text("contact test@example.com"), "contact [EMAIL_REDACTED]");
}

// ============================================================================
// Tool router
// ============================================================================

#[tokio::test]
async fn test_router_parse_logs_roundtrip() {
    let router = ToolRouter::with_default_tools();
    let result = router
        .dispatch(&ToolCall::new(
            "parse_logs",
            json!({"raw_logs": "2024-01-01T00:00:00Z ERROR boom"}),
        ))
        .await;

    assert!(result.success);
    let parsed: ParsedLogs = serde_json::from_value(result.output.clone().unwrap()).unwrap();
    assert_eq!(parsed.summary.error_count, 1);
    assert_eq!(
        router.summarize("parse_logs", &result).unwrap()["total_lines"],
        1
    );
}

#[tokio::test]
async fn test_router_grep_with_context() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "public class Test {{").unwrap();
    writeln!(file, "    public void method() {{").unwrap();
    writeln!(file, "        throw new NullPointerException(\"test error\");").unwrap();
    writeln!(file, "    }}").unwrap();
    writeln!(file, "}}").unwrap();
    let path = file.path().display().to_string();

    let router = ToolRouter::with_default_tools();
    let result = router
        .dispatch(&ToolCall::new(
            "grep_error",
            json!({"pattern": "nullpointer", "files": [path, "/missing/File.java"]}),
        ))
        .await;

    let output = result.output.clone().unwrap();
    assert_eq!(output["total_matches"], 1);
    let first = &output["results"][0]["matches"][0];
    assert_eq!(first["line_number"], 3);
    assert!(first["context"].as_str().unwrap().contains(">>> "));
    assert!(output["results"][1]["error"]
        .as_str()
        .unwrap()
        .starts_with("File not found"));

    let summary = router.summarize("grep_error", &result).unwrap();
    assert_eq!(summary, json!({"total_matches": 1, "files_searched": 2}));
}

#[tokio::test]
async fn test_router_failures_use_envelope() {
    let mut router = ToolRouter::with_default_tools();
    router.register(Arc::new(FunctionTool::new(
        "flaky",
        "Always fails",
        ParameterSchema::object(None, HashMap::new(), vec![]),
        |_args| Box::pin(async { Err::<Value, _>(ToolError::execution("backend down")) }),
    )));

    let unknown = router.dispatch(&ToolCall::new("nope", json!({}))).await;
    assert_eq!(unknown.to_value()["message"], "Unknown tool: nope");

    let failed = router.dispatch(&ToolCall::new("flaky", json!({}))).await;
    let envelope = failed.to_value();
    assert_eq!(envelope["error"], true);
    assert!(envelope["message"].as_str().unwrap().starts_with("Tool flaky failed"));

    let bad_args = router
        .dispatch(&ToolCall::new("grep_error", json!({"pattern": "x"})))
        .await;
    assert!(!bad_args.success);

    let names = router.names();
    assert!(names.contains(&"parse_logs".to_string()));
    assert!(names.contains(&"flaky".to_string()));
    assert_eq!(router.schemas().len(), 3);
}
