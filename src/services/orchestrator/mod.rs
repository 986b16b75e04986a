//! Orchestration
//!
//! The Analyzer/Critic round loop and the pipeline built around it.

pub mod engine;
pub mod events;
pub mod timers;

pub use engine::{
    build_log_summary, feedback_message, load_code_snippets, run_pipeline, run_rounds,
    run_tools_only, ChunkedLogsSummary, GrepTestSummary, PipelineInputs, PipelineOutcome,
    RoundContext, RoundOutcome, ToolsOnlyReport, TOOLS_ONLY_GREP_PATTERN,
};
pub use events::EventSink;
pub use timers::StageTimer;
