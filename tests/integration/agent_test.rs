//! Agent Retry/Repair Integration Tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use incident_lens::models::{Verdict, DEGRADED_REPORT};
use incident_lens::services::agents::{Agent, AgentError, AnalyzerRole, CriticRole};
use incident_lens::services::conversation::{ConversationRole, ConversationState};
use incident_lens_llm::{
    LlmError, LlmProvider, LlmResponse, LlmResult, Message, ScriptEntry, ScriptedProvider,
    ToolDefinition, UsageStats,
};

const ANALYZER_REPLY: &str = r#"{
    "hypothesis": "UserService dereferences a null session after cache eviction",
    "evidence": ["NullPointerException at UserService.java:42"],
    "suspect_files": ["UserService.java"],
    "fix_suggestion": "Check the session before use and reload on miss",
    "confidence": 0.75
}"#;

fn fresh_state() -> ConversationState {
    let mut state = ConversationState::new();
    state.add_user(json!({"log_summary": {"total_lines": 3, "error_count": 1}}));
    state
}

/// Provider that always fails and counts how often it was asked.
struct DownProvider {
    calls: AtomicU32,
}

#[async_trait]
impl LlmProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn generate(
        &self,
        _messages: Vec<Message>,
        _tools: Option<&[ToolDefinition]>,
    ) -> LlmResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: None,
        })
    }
}

#[tokio::test]
async fn test_non_json_twice_fails_analyzer() {
    let provider = Arc::new(ScriptedProvider::with_texts(
        "analyzer",
        vec!["The root cause is a null pointer.", "Sorry, again: null pointer."],
    ));
    let mut agent = Agent::new(AnalyzerRole::new(), provider);
    let err = agent.call(&mut fresh_state(), None, 1500).await.unwrap_err();
    assert!(matches!(err, AgentError::MalformedResponse { attempts: 2, .. }));
}

#[tokio::test]
async fn test_non_json_twice_degrades_critic() {
    let provider = Arc::new(ScriptedProvider::with_texts(
        "critic",
        vec!["Looks fine to me.", "Still fine."],
    ));
    let mut agent = Agent::new(CriticRole::new(), provider);
    let response = agent.call(&mut fresh_state(), None, 1500).await.unwrap();

    assert!(response.degraded);
    assert_eq!(response.output.verdict, Verdict::Error);
    assert_eq!(response.output.final_report, DEGRADED_REPORT);
    assert!(response.output.remaining_risks[0].contains("Invalid critic response format"));
}

#[tokio::test]
async fn test_corrective_message_is_recorded_in_state() {
    let provider = Arc::new(ScriptedProvider::with_texts(
        "analyzer",
        vec!["{\"hypothesis\": ", ANALYZER_REPLY],
    ));
    let mut agent = Agent::new(AnalyzerRole::new(), provider.clone());
    let mut state = fresh_state();
    let response = agent.call(&mut state, None, 1500).await.unwrap();

    assert_eq!(response.attempts, 2);
    let last = state.messages().last().unwrap();
    assert_eq!(last.role, ConversationRole::User);
    assert!(last.content.as_str().unwrap().contains("Parse error"));

    // Second call saw the corrective message as its final input
    let calls = provider.recorded_calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].len(), calls[0].len() + 1);
}

#[tokio::test]
async fn test_trailing_prose_is_salvaged() {
    let reply = format!("{}\n\nLet me know if you need anything else.", ANALYZER_REPLY);
    let provider = Arc::new(ScriptedProvider::with_texts("analyzer", vec![reply]));
    let mut agent = Agent::new(AnalyzerRole::new(), provider);
    let response = agent.call(&mut fresh_state(), None, 1500).await.unwrap();
    assert!(response.repaired);
    assert_eq!(response.output.hypothesis.suspect_files, vec!["UserService.java"]);
}

#[tokio::test]
async fn test_transport_failures_exhaust_budget() {
    let provider = Arc::new(DownProvider {
        calls: AtomicU32::new(0),
    });
    let mut agent = Agent::new(CriticRole::new(), provider.clone()).with_max_attempts(3);
    let mut state = fresh_state();
    let err = agent.call(&mut state, None, 1500).await.unwrap_err();

    assert!(matches!(err, AgentError::Provider { attempts: 3, .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert_eq!(state.len(), 1);
}

#[tokio::test]
async fn test_usage_accumulates_across_attempts() {
    let provider = Arc::new(ScriptedProvider::from_entries(
        "analyzer",
        vec![
            ScriptEntry::Response(LlmResponse {
                usage: UsageStats::new(400, 50),
                ..LlmResponse::text("not json at all")
            }),
            ScriptEntry::Response(LlmResponse {
                usage: UsageStats::new(500, 80),
                ..LlmResponse::text(ANALYZER_REPLY)
            }),
        ],
    ));
    let mut agent = Agent::new(AnalyzerRole::new(), provider);
    let response = agent.call(&mut fresh_state(), None, 1500).await.unwrap();

    assert_eq!(response.usage, UsageStats::new(500, 80));
    assert_eq!(agent.usage(), UsageStats::new(900, 130));
}

#[tokio::test]
async fn test_tool_results_are_truncated_in_prompt() {
    let provider = Arc::new(ScriptedProvider::with_texts("analyzer", vec![ANALYZER_REPLY]));
    let mut agent = Agent::new(AnalyzerRole::new(), provider.clone());
    let mut state = fresh_state();
    state.add_tool_result("grep_error", json!({"blob": "x".repeat(5000)}));

    agent.call(&mut state, None, 100).await.unwrap();

    let calls = provider.recorded_calls().await;
    let tool_message = calls[0].last().unwrap();
    assert!(tool_message.content.starts_with("Tool 'grep_error' returned: "));
    assert!(tool_message.content.ends_with("... (truncated)"));
    assert!(tool_message.content.len() < 200);
}
