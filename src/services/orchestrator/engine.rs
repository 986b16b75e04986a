//! Orchestration Engine
//!
//! Drives one analysis run end to end: read and parse the log, select and
//! redact the relevant chunk, load code snippets, run the Analyzer/Critic
//! rounds, then assemble, validate and persist the report.
//!
//! Every step awaits the previous one. Agent failures propagate to the
//! caller; tool failures and report validation problems never abort a run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use incident_lens_core::{LogEntry, LogSummary, ParsedLogs, PipelineEvent, ToolCall};
use incident_lens_llm::LlmProvider;
use incident_lens_tools::{ParseOptions, ToolRouter};

use super::events::EventSink;
use super::timers::StageTimer;
use crate::models::{
    AnalysisConfig, AnalyzerOutput, ChunkingInfo, ConfidenceScores, CostEstimate, CriticOutput,
    IncidentReport, PipelineConfig, RunMetrics, TokenUsageBreakdown,
};
use crate::services::agents::{Agent, AnalyzerRole, CriticRole};
use crate::services::chunking::{select_best_chunk, SelectedChunk};
use crate::services::conversation::ConversationState;
use crate::services::persistence::{ArtifactPaths, ArtifactWriter};
use crate::services::redaction::{redact_entries, redact_parsed};
use crate::utils::error::{AppError, AppResult};

/// Pattern searched in code files by the tools-only run.
pub const TOOLS_ONLY_GREP_PATTERN: &str = "error|exception|null";

const RECENT_ERRORS_LIMIT: usize = 5;
const RECENT_ERROR_MESSAGE_CHARS: usize = 200;
const FEEDBACK_SUGGESTION: &str = "Please address the issues found and provide updated analysis.";

/// Files a run reads.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInputs {
    pub log_path: PathBuf,
    pub code_paths: Vec<PathBuf>,
}

impl PipelineInputs {
    pub fn new(log_path: impl Into<PathBuf>, code_paths: Vec<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            code_paths,
        }
    }

    /// Fail with `NotFound` for the first input that is not a readable file.
    pub fn check_exists(&self) -> AppResult<()> {
        for path in std::iter::once(&self.log_path).chain(self.code_paths.iter()) {
            if !path.is_file() {
                return Err(AppError::not_found(format!(
                    "Input file not found: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

// ── Rounds ───────────────────────────────────────────────────────────

/// Everything the round loop borrows for one run.
pub struct RoundContext<'a> {
    pub analyzer: &'a mut Agent<AnalyzerRole>,
    pub critic: &'a mut Agent<CriticRole>,
    pub router: &'a ToolRouter,
    pub state: &'a mut ConversationState,
    pub pipeline: &'a PipelineConfig,
    pub max_tool_result_chars: usize,
    pub timer: &'a mut StageTimer,
    pub events: &'a EventSink,
}

/// Last outputs of both roles, whether or not the loop converged.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub analysis: AnalyzerOutput,
    pub critique: CriticOutput,
    pub rounds: u32,
    pub converged: bool,
}

/// Run Analyzer/Critic rounds until convergence or `max_rounds`.
///
/// A round converges when the Critic confirms with no open issues and at
/// least `min_rounds` rounds have run.
pub async fn run_rounds(ctx: RoundContext<'_>) -> AppResult<RoundOutcome> {
    let RoundContext {
        analyzer,
        critic,
        router,
        state,
        pipeline,
        max_tool_result_chars,
        timer,
        events,
    } = ctx;

    if pipeline.max_rounds == 0 {
        return Err(AppError::config("max_rounds must be at least 1"));
    }

    let schemas = router.schemas();
    let mut last: Option<(AnalyzerOutput, CriticOutput)> = None;
    let mut rounds = 0;
    let mut converged = false;

    for round in 1..=pipeline.max_rounds {
        rounds = round;

        let started = Instant::now();
        let analysis = analyzer
            .call(state, Some(&schemas), max_tool_result_chars)
            .await?;
        state.add_agent(format!("analyzer_round_{}", round), analysis.raw.clone());
        events.emit(PipelineEvent::AgentMessage {
            agent: format!("{} (Round {})", analyzer.name(), round),
            round,
            message: analysis.raw.clone(),
        });
        timer.record(format!("analyzer_round_{}", round), started);
        tracing::info!(
            round,
            root_cause = %analysis.output.hypothesis.root_cause,
            confidence = analysis.output.hypothesis.confidence,
            "analyzer hypothesis"
        );

        let started = Instant::now();
        dispatch_tool_calls(router, state, events, &analysis.tool_calls).await;
        timer.record(format!("tool_execution_round_{}", round), started);

        let started = Instant::now();
        let critique = critic
            .call(state, Some(&schemas), max_tool_result_chars)
            .await?;
        state.add_agent(format!("critic_round_{}", round), critique.raw.clone());
        events.emit(PipelineEvent::AgentMessage {
            agent: format!("{} (Round {})", critic.name(), round),
            round,
            message: critique.raw.clone(),
        });
        tracing::info!(
            round,
            verdict = %critique.output.verdict,
            open_issues = critique.output.open_issues.len(),
            degraded = critique.degraded,
            "critic verdict"
        );
        if !critique.tool_calls.is_empty() {
            tracing::info!(round, count = critique.tool_calls.len(), "critic requested tool calls");
        }
        dispatch_tool_calls(router, state, events, &critique.tool_calls).await;
        timer.record(format!("critic_round_{}", round), started);

        converged = critique.output.is_settled() && round >= pipeline.min_rounds;
        events.emit(PipelineEvent::RoundComplete {
            round,
            verdict: critique.output.verdict.to_string(),
            open_issues: critique.output.open_issues.len(),
            converged,
        });

        if !converged && round < pipeline.max_rounds {
            state.add_user(feedback_message(&critique.output));
        }

        last = Some((analysis.output, critique.output));
        if converged {
            tracing::info!(round, "analysis confirmed");
            break;
        }
    }

    let Some((analysis, critique)) = last else {
        return Err(AppError::internal("no analysis round completed"));
    };
    if !converged {
        tracing::warn!(rounds, "analysis did not converge within max_rounds");
    }

    Ok(RoundOutcome {
        analysis,
        critique,
        rounds,
        converged,
    })
}

/// User message carrying the Critic's feedback into the next round.
pub fn feedback_message(critique: &CriticOutput) -> Value {
    json!({
        "critic_feedback": {
            "issues_found": critique.issues_found,
            "open_issues": critique.open_issues,
            "suggestions": FEEDBACK_SUGGESTION,
        }
    })
}

async fn dispatch_tool_calls(
    router: &ToolRouter,
    state: &mut ConversationState,
    events: &EventSink,
    calls: &[ToolCall],
) {
    for call in calls {
        let result = router.dispatch(call).await;
        if let Some(message) = result.error_message() {
            tracing::warn!(tool = %call.name, error = %message, "tool call failed, continuing");
        }
        state.add_tool_result(call.name.clone(), result.to_value());
        events.emit(PipelineEvent::ToolResult {
            tool: call.name.clone(),
            args: Some(call.args.clone()),
            success: result.success,
            summary: router.summarize(&call.name, &result),
        });
    }
}

// ── Input preparation ────────────────────────────────────────────────

fn parse_options(config: &AnalysisConfig) -> ParseOptions {
    ParseOptions {
        cluster_radius: config.scoring.cluster_radius,
    }
}

async fn parse_via_router(router: &ToolRouter, raw_logs: &str) -> AppResult<ParsedLogs> {
    let call = ToolCall::new("parse_logs", json!({ "raw_logs": raw_logs }));
    let result = router.dispatch(&call).await;
    if let Some(message) = result.error_message() {
        return Err(AppError::internal(format!("Log parsing failed: {}", message)));
    }
    let output = result
        .output
        .ok_or_else(|| AppError::internal("Log parsing returned no output"))?;
    Ok(ParsedLogs::from_value(output)?)
}

/// Select the analysis chunk and redact it.
fn select_redacted_chunk(parsed: &ParsedLogs, config: &AnalysisConfig) -> SelectedChunk {
    let selected = select_best_chunk(parsed, config.limits.max_log_lines, Utc::now(), &config.scoring);
    SelectedChunk {
        entries: redact_entries(&selected.entries),
        ..selected
    }
}

/// Read code files in order, keeping their combined size within
/// `max_chars` characters. The file that crosses the budget is truncated;
/// later files are skipped. Unreadable files are logged and skipped.
pub async fn load_code_snippets(paths: &[PathBuf], max_chars: usize) -> BTreeMap<String, String> {
    let mut snippets = BTreeMap::new();
    let mut total = 0usize;

    for path in paths {
        let key = path.display().to_string();
        let mut content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %key, error = %e, "failed to read code file");
                continue;
            }
        };

        let len = content.chars().count();
        if total + len > max_chars {
            let remaining = max_chars.saturating_sub(total);
            if remaining == 0 {
                tracing::warn!(path = %key, "skipping code file, size limit reached");
                continue;
            }
            content = content.chars().take(remaining).collect();
            tracing::warn!(path = %key, kept = remaining, "truncated code file to fit size limit");
        }

        total += content.chars().count();
        snippets.insert(key, content);
    }

    tracing::info!(files = snippets.len(), chars = total, "loaded code snippets");
    snippets
}

/// Compact log overview placed in the first user message.
pub fn build_log_summary(summary: &LogSummary, chunk: &[LogEntry]) -> Value {
    let recent_errors: Vec<Value> = chunk
        .iter()
        .filter(|entry| entry.is_error())
        .take(RECENT_ERRORS_LIMIT)
        .map(|entry| {
            json!({
                "timestamp": entry.timestamp,
                "message": entry.message.chars().take(RECENT_ERROR_MESSAGE_CHARS).collect::<String>(),
            })
        })
        .collect();

    json!({
        "total_lines": summary.total_lines,
        "error_count": summary.error_count,
        "warn_count": summary.warn_count,
        "selected_chunk_size": chunk.len(),
        "recent_errors": recent_errors,
    })
}

// ── Pipeline ─────────────────────────────────────────────────────────

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: IncidentReport,
    pub metrics: RunMetrics,
    pub artifacts: ArtifactPaths,
}

/// Run the full analysis pipeline and persist its artifacts.
pub async fn run_pipeline(
    inputs: &PipelineInputs,
    config: &AnalysisConfig,
    analyzer_provider: Arc<dyn LlmProvider>,
    critic_provider: Arc<dyn LlmProvider>,
    events: &EventSink,
) -> AppResult<PipelineOutcome> {
    config.validate().map_err(AppError::config)?;
    inputs.check_exists()?;

    let run_id = Uuid::new_v4().to_string();
    tracing::info!(
        run_id = %run_id,
        log = %inputs.log_path.display(),
        code_files = inputs.code_paths.len(),
        "starting analysis pipeline"
    );

    let mut timer = StageTimer::new();
    let router = ToolRouter::with_parse_options(parse_options(config));
    let mut state = ConversationState::new();

    let started = Instant::now();
    let raw_logs = tokio::fs::read_to_string(&inputs.log_path).await?;
    timer.record("read_logs", started);
    tracing::info!(chars = raw_logs.len(), "read log file");

    let started = Instant::now();
    let parsed = parse_via_router(&router, &raw_logs).await?;
    state.add_tool_result("parse_logs", serde_json::to_value(redact_parsed(&parsed))?);
    events.emit(PipelineEvent::ToolResult {
        tool: "parse_logs".to_string(),
        args: None,
        success: true,
        summary: Some(serde_json::to_value(parsed.summary)?),
    });
    timer.record("parse_logs", started);
    tracing::info!(lines = parsed.summary.total_lines, "parsed log lines");

    let chunk = timer.measure("chunk_and_redact", || select_redacted_chunk(&parsed, config));
    events.emit(PipelineEvent::LogChunkSelected {
        selected_count: chunk.entries.len(),
        source: chunk.source.label(),
        total_groups: chunk.source.total_candidates(),
    });
    tracing::info!(entries = chunk.entries.len(), source = %chunk.source.label(), "selected redacted chunk");

    let started = Instant::now();
    let code_files = load_code_snippets(&inputs.code_paths, config.limits.max_code_chars).await;
    state.set_context("code_files", json!(code_files));
    timer.record("read_code", started);

    let mut log_summary = build_log_summary(&parsed.summary, &chunk.entries);
    if config.debug.include_full_logs {
        log_summary["full_logs"] = serde_json::to_value(&chunk)?;
    }
    state.add_user(json!({
        "log_summary": log_summary,
        "code_snippets": code_files,
    }));

    let mut analyzer = Agent::new(AnalyzerRole::new(), analyzer_provider)
        .with_max_attempts(config.agents.max_attempts);
    let mut critic =
        Agent::new(CriticRole::new(), critic_provider).with_max_attempts(config.agents.max_attempts);

    let started = Instant::now();
    let outcome = run_rounds(RoundContext {
        analyzer: &mut analyzer,
        critic: &mut critic,
        router: &router,
        state: &mut state,
        pipeline: &config.pipeline,
        max_tool_result_chars: config.limits.max_tool_result_chars,
        timer: &mut timer,
        events,
    })
    .await?;
    timer.record("multi_round_analysis", started);

    let started = Instant::now();
    let writer = ArtifactWriter::new(&config.output.dir)?;
    let conversation_path = writer.write_conversation(&state.export())?;

    let hypothesis = &outcome.analysis.hypothesis;
    let report = IncidentReport::assemble(
        writer.timestamp(),
        hypothesis,
        &outcome.critique,
        conversation_path.display().to_string(),
    );
    let problems = report.validate();
    if !problems.is_empty() {
        tracing::warn!(issues = ?problems, "report validation issues");
    }
    let report_path = writer.write_report(&report)?;

    let token_usage = TokenUsageBreakdown::new(analyzer.usage(), critic.usage());
    let raw_cost = CostEstimate::raw_amount(&token_usage.total, &config.pricing);
    let warning = RunMetrics::low_confidence_warning(
        hypothesis.confidence,
        config.thresholds.critical_confidence,
    );
    if warning.is_some() {
        tracing::warn!(confidence = hypothesis.confidence, "final confidence still low");
    }
    timer.record("generate_report", started);

    let metrics = RunMetrics {
        run_id,
        timings: timer.summary(),
        token_usage,
        estimated_cost: CostEstimate::from_usage(&token_usage.total, &config.pricing),
        confidence_scores: ConfidenceScores {
            analyzer: hypothesis.confidence,
            critic: outcome.critique.confidence_score,
        },
        conversation_rounds: outcome.rounds,
        converged: outcome.converged,
        chunking_info: ChunkingInfo {
            original_lines: parsed.summary.total_lines,
            chunked_lines: chunk.entries.len(),
            method: chunk.source.label(),
        },
        warning,
    };
    let metrics_path = writer.write_metrics(&metrics)?;

    tracing::info!(
        rounds = outcome.rounds,
        converged = outcome.converged,
        total_tokens = token_usage.total.total,
        estimated_cost = raw_cost,
        "pipeline complete"
    );
    events.emit(PipelineEvent::PipelineComplete {
        report_path: report_path.display().to_string(),
        metrics_path: metrics_path.display().to_string(),
        conversation_path: conversation_path.display().to_string(),
        total_rounds: outcome.rounds,
        total_tokens: token_usage.total.total,
        estimated_cost: raw_cost,
    });

    Ok(PipelineOutcome {
        report,
        metrics,
        artifacts: ArtifactPaths {
            conversation: conversation_path,
            report: report_path,
            metrics: metrics_path,
        },
    })
}

// ── Tools-only run ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkedLogsSummary {
    pub original_count: usize,
    pub chunked_count: usize,
    pub redacted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrepTestSummary {
    pub total_matches: u64,
    pub files_searched: usize,
}

/// Output of a provider-free run of the deterministic stages.
#[derive(Debug, Clone, Serialize)]
pub struct ToolsOnlyReport {
    pub parsed_logs: ParsedLogs,
    pub chunked_logs: ChunkedLogsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grep_test: Option<GrepTestSummary>,
    pub timings: BTreeMap<String, f64>,
}

/// Parse, chunk and redact the log, and grep the code files for common
/// failure words, without calling any provider.
pub async fn run_tools_only(inputs: &PipelineInputs, config: &AnalysisConfig) -> AppResult<ToolsOnlyReport> {
    config.validate().map_err(AppError::config)?;
    inputs.check_exists()?;

    let mut timer = StageTimer::new();
    let router = ToolRouter::with_parse_options(parse_options(config));

    let started = Instant::now();
    let raw_logs = tokio::fs::read_to_string(&inputs.log_path).await?;
    let parsed = parse_via_router(&router, &raw_logs).await?;
    timer.record("parse_logs", started);

    let chunk = timer.measure("chunk_and_redact", || select_redacted_chunk(&parsed, config));
    let chunked_logs = ChunkedLogsSummary {
        original_count: parsed.entries.len(),
        chunked_count: chunk.entries.len(),
        redacted: true,
    };

    let grep_test = if inputs.code_paths.is_empty() {
        None
    } else {
        let started = Instant::now();
        let files: Vec<String> = inputs
            .code_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let call = ToolCall::new(
            "grep_error",
            json!({ "pattern": TOOLS_ONLY_GREP_PATTERN, "files": files }),
        );
        let result = router.dispatch(&call).await;
        if let Some(message) = result.error_message() {
            tracing::warn!(error = %message, "grep_error failed during tools-only run");
        }
        let total_matches = result
            .output
            .as_ref()
            .and_then(|output| output.get("total_matches"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        timer.record("grep_test", started);
        Some(GrepTestSummary {
            total_matches,
            files_searched: inputs.code_paths.len(),
        })
    };

    tracing::info!(
        entries = parsed.entries.len(),
        chunked = chunked_logs.chunked_count,
        "tools-only run complete"
    );

    Ok(ToolsOnlyReport {
        parsed_logs: parsed,
        chunked_logs,
        grep_test,
        timings: timer.summary(),
    })
}
