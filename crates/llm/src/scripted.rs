//! Scripted Provider
//!
//! A provider that replays a fixed queue of responses. Used for offline
//! replay of recorded sessions and as the test double for the agent and
//! orchestration layers. Every call is recorded so callers can inspect the
//! exact messages that were sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::provider::LlmProvider;
use super::types::{LlmError, LlmResponse, LlmResult, Message, ToolDefinition};

/// One scripted reply, as written in a replay file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptEntry {
    /// Transport failure with the given message
    Failure { error: String },
    /// Full response with function calls and usage
    Response(LlmResponse),
    /// Bare text content
    Text(String),
}

impl From<ScriptEntry> for LlmResult<LlmResponse> {
    fn from(entry: ScriptEntry) -> Self {
        match entry {
            ScriptEntry::Failure { error } => Err(LlmError::NetworkError { message: error }),
            ScriptEntry::Response(response) => Ok(response),
            ScriptEntry::Text(text) => Ok(LlmResponse::text(text)),
        }
    }
}

/// Provider that pops pre-recorded results in order.
pub struct ScriptedProvider {
    name: String,
    model: String,
    responses: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>, responses: Vec<LlmResult<LlmResponse>>) -> Self {
        Self {
            name: name.into(),
            model: "scripted".to_string(),
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose every reply is the given text, in order.
    pub fn with_texts<S: Into<String>>(name: impl Into<String>, texts: Vec<S>) -> Self {
        Self::new(
            name,
            texts
                .into_iter()
                .map(|t| Ok(LlmResponse::text(t)))
                .collect(),
        )
    }

    pub fn from_entries(name: impl Into<String>, entries: Vec<ScriptEntry>) -> Self {
        Self::new(name, entries.into_iter().map(Into::into).collect())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Messages sent on each call so far, in call order.
    pub async fn recorded_calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().await.clone()
    }

    /// Number of scripted results not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        messages: Vec<Message>,
        _tools: Option<&[ToolDefinition]>,
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().await.push(messages);
        let next = self.responses.lock().await.pop_front();
        match next {
            Some(result) => result,
            None => {
                tracing::warn!(provider = %self.name, "scripted provider exhausted");
                Err(LlmError::ProviderUnavailable {
                    message: format!("No more scripted responses for {}", self.name),
                })
            }
        }
    }
}
