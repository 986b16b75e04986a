//! Tool Call Request
//!
//! A named tool invocation requested by an agent, either declared inside its
//! structured JSON payload or returned as a native function call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation: name plus argument mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Default::default())
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Extract the `tool_calls` array from an agent payload.
    ///
    /// Malformed items (missing or non-string `name`) are skipped; a missing
    /// `args` becomes an empty object.
    pub fn from_payload(payload: &Value) -> Vec<ToolCall> {
        payload
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let name = item.get("name")?.as_str()?;
                        let args = item.get("args").cloned().unwrap_or_else(empty_args);
                        Some(ToolCall::new(name, args))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
