//! Built-in tool set.

use std::sync::Arc;

use crate::grep_error::GrepErrorTool;
use crate::parse_logs::{ParseLogsTool, ParseOptions};
use crate::registry::Tool;

/// Names of the tools registered by `ToolRouter::with_default_tools`.
pub const DEFAULT_TOOL_NAMES: [&str; 2] = ["parse_logs", "grep_error"];

/// The built-in tools, in registration order.
pub fn default_tools(options: ParseOptions) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ParseLogsTool::new(options)),
        Arc::new(GrepErrorTool),
    ]
}
