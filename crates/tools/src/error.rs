//! Tool Error Types
//!
//! Errors a tool handler may return. The router never propagates these; it
//! folds them into the uniform error envelope of `ToolResult`.

use thiserror::Error;

/// Error returned by a tool handler.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Arguments did not match the tool's schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran but could not complete
    #[error("Execution failed: {0}")]
    Execution(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Result could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Create an invalid-arguments error
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }
}
