//! Incident Lens
//!
//! Root-cause analysis of production incidents by two cooperating analysis
//! roles over parsed logs and source snippets:
//! - Data models and configuration
//! - Analysis services (chunking, redaction, agents, orchestration)
//! - Storage (TOML config loading)
//! - Error types

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::settings::AnalysisConfig;
pub use services::orchestrator::{
    run_pipeline, run_tools_only, EventSink, PipelineInputs, PipelineOutcome, ToolsOnlyReport,
};
pub use utils::error::{AppError, AppResult};
