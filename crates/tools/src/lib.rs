//! Incident Lens Tools
//!
//! The log parser and the tools agents may request during analysis, plus the
//! name-keyed router that dispatches them:
//! - `parse_logs` - raw text to structured entries, groups and summary
//! - `grep_error` - regex search over source files with context
//! - `ToolRouter` - registration, schema export and fault-tolerant dispatch
//! - `ToolResult` - success payload or uniform error envelope

pub mod definitions;
pub mod error;
pub mod executor;
pub mod grep_error;
pub mod parse_logs;
pub mod registry;

pub use definitions::{default_tools, DEFAULT_TOOL_NAMES};
pub use error::ToolError;
pub use executor::{ToolErrorEnvelope, ToolResult};
pub use grep_error::{grep_files, FileMatches, GrepErrorTool, GrepMatch, GrepOutput};
pub use parse_logs::{
    group_entries, parse_logs, parse_logs_with, ParseLogsTool, ParseOptions,
    DEFAULT_CLUSTER_RADIUS,
};
pub use registry::{FunctionTool, FunctionToolHandler, Tool, ToolRouter};
