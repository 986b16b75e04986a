//! Analysis Agents
//!
//! One call/retry/repair routine shared by both analysis roles. A role
//! supplies its instructions and a validator through `AgentRole`; `Agent`
//! handles prompt assembly, provider invocation, JSON decode, salvage and the
//! corrective re-prompt.
//!
//! Failure policy per attempt:
//! - transport error: retried until attempts run out, then fatal
//! - undecodable text: salvage, then a corrective message and a retry
//! - decoded but invalid: no retry; fatal unless the role can degrade

pub mod analyzer;
pub mod critic;
pub mod prompts;

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use thiserror::Error;

use incident_lens_core::ToolCall;
use incident_lens_llm::{
    salvage_json, LlmError, LlmProvider, Message, ToolDefinition, UsageStats,
};

use super::conversation::ConversationState;

pub use analyzer::AnalyzerRole;
pub use critic::CriticRole;

/// Default number of attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Role-specific behavior plugged into the shared agent routine.
pub trait AgentRole: Send + Sync {
    type Output: Clone + Send;

    /// Display name used in logs and errors
    fn name(&self) -> &str;

    /// System instructions prepended to every call
    fn instructions(&self) -> &str;

    /// Validate a decoded payload; `Err` lists every problem found.
    fn parse_and_validate(&self, payload: &Value) -> Result<Self::Output, Vec<String>>;

    /// Synthetic output to return instead of failing. `None` makes the
    /// failure fatal.
    fn degrade(&self, _message: &str) -> Option<Self::Output> {
        None
    }
}

/// Why an agent call produced no usable output.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{agent} provider call failed after {attempts} attempt(s): {source}")]
    Provider {
        agent: String,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("{agent} returned invalid JSON after {attempts} attempt(s): {detail}")]
    MalformedResponse {
        agent: String,
        attempts: u32,
        detail: String,
    },

    #[error("{agent} response failed validation: {}", .errors.join("; "))]
    Validation { agent: String, errors: Vec<String> },
}

/// A validated (or degraded) turn from one role.
#[derive(Debug, Clone)]
pub struct AgentResponse<T> {
    pub output: T,
    /// Payload `tool_calls` plus native function calls, deduplicated
    pub tool_calls: Vec<ToolCall>,
    /// Decoded payload, or an error record for degraded turns
    pub raw: Value,
    /// Seconds spent in the successful provider call
    pub latency: f64,
    pub usage: UsageStats,
    pub attempts: u32,
    /// Whether salvage was needed to decode the payload
    pub repaired: bool,
    pub degraded: bool,
}

/// Corrective user message appended after an undecodable response.
pub fn build_repair_prompt(parse_error: &str) -> String {
    format!(
        "Your previous response could not be parsed as valid JSON.\n\n\
         Parse error: {}\n\n\
         Please respond with ONLY a valid JSON object. \
         No markdown fences, no explanatory text.",
        parse_error
    )
}

enum AttemptFailure {
    Transport(LlmError),
    Decode(String),
}

/// A role bound to a provider, with per-agent usage accounting.
pub struct Agent<R: AgentRole> {
    role: R,
    provider: Arc<dyn LlmProvider>,
    max_attempts: u32,
    usage: UsageStats,
}

impl<R: AgentRole> Agent<R> {
    pub fn new(role: R, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            role,
            provider,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            usage: UsageStats::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn name(&self) -> &str {
        self.role.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Usage accumulated over every provider call this agent made.
    pub fn usage(&self) -> UsageStats {
        self.usage
    }

    /// Run one validated turn against the current conversation.
    ///
    /// The only mutation of `state` is the corrective message appended
    /// between attempts after an undecodable response.
    pub async fn call(
        &mut self,
        state: &mut ConversationState,
        tools: Option<&[ToolDefinition]>,
        max_tool_result_chars: usize,
    ) -> Result<AgentResponse<R::Output>, AgentError> {
        let agent = self.role.name().to_string();
        let mut last_failure: Option<AttemptFailure> = None;
        let mut last_text = String::new();
        // Usage of every attempt made by this call
        let mut call_usage = UsageStats::default();

        for attempt in 1..=self.max_attempts {
            let mut messages = vec![Message::system(self.role.instructions())];
            messages.extend(state.api_messages(max_tool_result_chars));

            let started = Instant::now();
            let response = match self.provider.generate(messages, tools).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(agent = %agent, attempt, error = %e, "provider call failed");
                    last_failure = Some(AttemptFailure::Transport(e));
                    continue;
                }
            };
            self.usage.accumulate(&response.usage);
            call_usage.accumulate(&response.usage);

            let latency = if response.latency > 0.0 {
                response.latency
            } else {
                started.elapsed().as_secs_f64()
            };
            let text = response.text_or_empty();

            let (payload, repaired) = match serde_json::from_str::<Value>(text) {
                Ok(value) => (value, false),
                Err(decode_error) => match salvage_json(text) {
                    Some((value, step)) => {
                        tracing::debug!(agent = %agent, attempt, ?step, "salvaged JSON response");
                        (value, true)
                    }
                    None => {
                        tracing::error!(agent = %agent, attempt, error = %decode_error, "invalid JSON response");
                        if attempt < self.max_attempts {
                            tracing::info!(agent = %agent, "requesting JSON repair");
                            state.add_user(Value::String(build_repair_prompt(
                                &decode_error.to_string(),
                            )));
                        }
                        last_text = text.to_string();
                        last_failure = Some(AttemptFailure::Decode(decode_error.to_string()));
                        continue;
                    }
                },
            };

            let output = match self.role.parse_and_validate(&payload) {
                Ok(output) => output,
                Err(errors) => {
                    let message = format!(
                        "Invalid {} response format: {}",
                        agent.to_lowercase(),
                        errors.join("; ")
                    );
                    tracing::error!(agent = %agent, attempt, "{}", message);
                    return match self.role.degrade(&message) {
                        Some(output) => Ok(self.degraded_response(
                            output,
                            &message,
                            text,
                            attempt,
                            call_usage,
                        )),
                        None => Err(AgentError::Validation { agent, errors }),
                    };
                }
            };

            let mut tool_calls = ToolCall::from_payload(&payload);
            for call in response.function_calls {
                if !tool_calls.contains(&call) {
                    tool_calls.push(call);
                }
            }

            tracing::info!(
                agent = %agent,
                attempt,
                repaired,
                tool_calls = tool_calls.len(),
                "agent turn complete"
            );

            return Ok(AgentResponse {
                output,
                tool_calls,
                raw: payload,
                latency,
                usage: call_usage,
                attempts: attempt,
                repaired,
                degraded: false,
            });
        }

        let attempts = self.max_attempts;
        match last_failure {
            Some(AttemptFailure::Decode(detail)) => {
                let message = format!("Invalid {} response format: {}", agent.to_lowercase(), detail);
                match self.role.degrade(&message) {
                    Some(output) => Ok(self.degraded_response(
                        output,
                        &message,
                        &last_text,
                        attempts,
                        call_usage,
                    )),
                    None => Err(AgentError::MalformedResponse {
                        agent,
                        attempts,
                        detail,
                    }),
                }
            }
            Some(AttemptFailure::Transport(source)) => Err(AgentError::Provider {
                agent,
                attempts,
                source,
            }),
            None => Err(AgentError::Provider {
                agent,
                attempts,
                source: LlmError::Other {
                    message: "no attempts were made".to_string(),
                },
            }),
        }
    }

    fn degraded_response(
        &self,
        output: R::Output,
        message: &str,
        content: &str,
        attempts: u32,
        usage: UsageStats,
    ) -> AgentResponse<R::Output> {
        tracing::warn!(agent = %self.role.name(), "returning degraded output");
        AgentResponse {
            output,
            tool_calls: Vec::new(),
            raw: json!({"error": message, "content": content}),
            latency: 0.0,
            usage,
            attempts,
            repaired: false,
            degraded: true,
        }
    }
}
