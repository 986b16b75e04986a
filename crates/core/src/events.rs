//! Pipeline Event Types
//!
//! Progress events emitted by the orchestration engine while a run is in
//! flight. These are shared between the engine (producer) and any front end
//! (the CLI, or an embedding service) that wants live progress.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress event emitted during pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A tool finished executing
    ToolResult {
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
        success: bool,
        /// Small tool-specific summary (never the full result)
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<Value>,
    },

    /// The log chunk that will enter the analysis context was chosen
    LogChunkSelected {
        selected_count: usize,
        /// Correlation id, cluster index, or "fallback"
        source: String,
        total_groups: usize,
    },

    /// An agent produced a validated turn
    AgentMessage {
        agent: String,
        round: u32,
        message: Value,
    },

    /// Both roles finished a round
    RoundComplete {
        round: u32,
        verdict: String,
        open_issues: usize,
        converged: bool,
    },

    /// The run finished and its artifacts were written
    PipelineComplete {
        report_path: String,
        metrics_path: String,
        conversation_path: String,
        total_rounds: u32,
        total_tokens: u64,
        estimated_cost: f64,
    },
}

impl PipelineEvent {
    /// Short kind label, matching the serde tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolResult { .. } => "tool_result",
            Self::LogChunkSelected { .. } => "log_chunk_selected",
            Self::AgentMessage { .. } => "agent_message",
            Self::RoundComplete { .. } => "round_complete",
            Self::PipelineComplete { .. } => "pipeline_complete",
        }
    }
}
