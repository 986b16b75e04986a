//! Tool Trait and Router
//!
//! Defines the `Tool` trait and the `ToolRouter` that maps tool names to
//! handlers. Dispatch never fails: unknown names, handler errors and handler
//! panics are all folded into the uniform error envelope so a bad tool call
//! only ever shows up as data in the next agent context.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;

use incident_lens_core::ToolCall;
use incident_lens_llm::{ParameterSchema, ToolDefinition};

use crate::definitions::default_tools;
use crate::error::ToolError;
use crate::executor::ToolResult;
use crate::parse_logs::ParseOptions;

/// Unified tool interface.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool (e.g., "parse_logs", "grep_error")
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema describing the tool's input parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Execute the tool with the given JSON arguments.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// Compact view of a successful output for progress events.
    fn summarize(&self, _output: &Value) -> Option<Value> {
        None
    }
}

/// Name-keyed registry of tools with deterministic iteration order.
pub struct ToolRouter {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Router with the built-in `parse_logs` and `grep_error` tools.
    pub fn with_default_tools() -> Self {
        Self::with_parse_options(ParseOptions::default())
    }

    /// Router with the built-in tools, parsing with the given options.
    pub fn with_parse_options(options: ParseOptions) -> Self {
        let mut router = Self::new();
        for tool in default_tools(options) {
            router.register(tool);
        }
        router
    }

    /// Register a tool. If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Function-calling schemas for all tools, in registration order.
    pub fn schemas(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Get all registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the router is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool call and return its result or the error envelope.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        tracing::info!(tool = %call.name, "dispatching tool call");

        let Some(tool) = self.tools.get(&call.name) else {
            let message = format!("Unknown tool: {}", call.name);
            tracing::error!(tool = %call.name, "{}", message);
            return ToolResult::err(message, None);
        };

        let outcome = AssertUnwindSafe(tool.execute(call.args.clone()))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => {
                tracing::info!(tool = %call.name, "tool completed successfully");
                ToolResult::ok(output)
            }
            Ok(Err(e)) => {
                tracing::error!(tool = %call.name, error = %e, "tool failed");
                ToolResult::err(format!("Tool {} failed: {}", call.name, e), Some(e.to_string()))
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::error!(tool = %call.name, panic = %detail, "tool panicked");
                ToolResult::err(format!("Tool {} panicked", call.name), Some(detail))
            }
        }
    }

    /// Compact summary of a dispatch result, for progress events.
    pub fn summarize(&self, name: &str, result: &ToolResult) -> Option<Value> {
        let output = result.output.as_ref()?;
        self.tools.get(name)?.summarize(output)
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── FunctionTool ─────────────────────────────────────────────────────

/// Boxed async handler used by `FunctionTool`.
pub type FunctionToolHandler = Box<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>
        + Send
        + Sync,
>;

/// A tool created from an async closure.
///
/// ```ignore
/// let tool = FunctionTool::new(
///     "echo",
///     "Echoes the input",
///     ParameterSchema::object(None, HashMap::new(), vec![]),
///     |args| Box::pin(async move { Ok(args) }),
/// );
/// ```
pub struct FunctionTool {
    tool_name: String,
    tool_description: String,
    schema: ParameterSchema,
    handler: FunctionToolHandler,
}

impl FunctionTool {
    /// Create a new FunctionTool from an async closure.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            tool_name: name.into(),
            tool_description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn parameters_schema(&self) -> ParameterSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        (self.handler)(args).await
    }
}
