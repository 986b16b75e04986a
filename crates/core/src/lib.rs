//! Incident Lens Core
//!
//! Foundational data model, error types, and pipeline events for the Incident
//! Lens workspace. This crate has no dependencies on the provider, tool, or
//! orchestration layers.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `log` - Parsed log data model (`LogEntry`, `LogLevel`, `ParsedLogs`, groupings)
//! - `tool_call` - Tool invocation request type shared by agents and the router
//! - `events` - Progress events emitted while a pipeline runs
//!
//! ## Design Principles
//!
//! 1. **Minimal dependencies** - serde, serde_json, thiserror and chrono only
//! 2. **Plain data** - every type here is `Serialize`/`Deserialize` so it can be
//!    handed to a model, persisted, or emitted as an event unchanged
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod events;
pub mod log;
pub mod tool_call;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Log Data Model ─────────────────────────────────────────────────────
pub use log::{
    CorrelationGroup, ErrorCluster, LogEntry, LogGroups, LogLevel, LogSummary, ParsedLogs,
};

// ── Tool Calls ─────────────────────────────────────────────────────────
pub use tool_call::ToolCall;

// ── Pipeline Events ────────────────────────────────────────────────────
pub use events::PipelineEvent;
