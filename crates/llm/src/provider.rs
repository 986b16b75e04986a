//! LLM Provider Trait
//!
//! Defines the generation capability the orchestration engine depends on.
//! Concrete vendor clients live outside this workspace; anything that can
//! turn a message list into text + function calls + usage implements it.

use async_trait::async_trait;

use super::types::{LlmResponse, LlmResult, Message, ToolDefinition};

/// Trait that all generation providers must implement.
///
/// Implementations may fail transiently or permanently and make no promise
/// that `content` is structurally valid; callers own validation and retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Generate a completion for the given conversation.
    ///
    /// # Arguments
    /// * `messages` - Flat conversation history, system prompt first
    /// * `tools` - Optional function-calling schema set offered to the model
    ///
    /// # Returns
    /// Complete response from the model
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<&[ToolDefinition]>,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is healthy and reachable.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}
