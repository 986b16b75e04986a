//! Tool Execution Result
//!
//! Portable result type returned by the router for every dispatch: either
//! the tool's success payload, or the uniform error envelope
//! `{ "error": true, "message": ..., "detail": ... }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform error envelope surfaced to agents when a tool fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolErrorEnvelope {
    /// Always `true`; lets agents detect failures with one field check
    pub error: bool,
    /// Human-readable summary
    pub message: String,
    /// Underlying cause, when one exists
    pub detail: Option<String>,
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error envelope (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorEnvelope>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(ToolErrorEnvelope {
                error: true,
                message: message.into(),
                detail,
            }),
        }
    }

    /// Convert to the JSON value recorded in the conversation:
    /// the success payload, or the error envelope.
    pub fn to_value(&self) -> Value {
        if self.success {
            self.output.clone().unwrap_or(Value::Null)
        } else {
            self.error
                .as_ref()
                .and_then(|envelope| serde_json::to_value(envelope).ok())
                .unwrap_or_else(|| serde_json::json!({"error": true, "message": "Unknown error", "detail": null}))
        }
    }

    /// Error message, if this result is a failure
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
