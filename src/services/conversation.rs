//! Conversation State
//!
//! Append-only history of one analysis run. Messages keep their full
//! structured content; the flat text projection sent to providers is derived
//! on demand and may truncate tool results, but stored content is never
//! rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use incident_lens_llm::Message;

/// Suffix appended to tool results cut at the character budget.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Who produced a message, when it was not the user or system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    Agent(String),
    Tool(String),
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ConversationRole,
    pub content: Value,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<MessageOrigin>,
}

/// Full state dump written next to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationExport {
    pub messages: Vec<ConversationMessage>,
    pub context: Map<String, Value>,
    /// Latest result per tool name
    pub tool_results: Map<String, Value>,
}

/// Append-only conversation history plus shared context.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<ConversationMessage>,
    context: Map<String, Value>,
    tool_results: Map<String, Value>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, role: ConversationRole, content: Value, metadata: Option<MessageOrigin>) {
        self.messages.push(ConversationMessage {
            role,
            content,
            created_at: Utc::now(),
            metadata,
        });
    }

    pub fn add_system(&mut self, text: impl Into<String>) {
        self.push(ConversationRole::System, Value::String(text.into()), None);
    }

    pub fn add_user(&mut self, content: Value) {
        self.push(ConversationRole::User, content, None);
    }

    /// Record an agent turn under `agent` (e.g. `analyzer_round_1`).
    pub fn add_agent(&mut self, agent: impl Into<String>, content: Value) {
        self.push(
            ConversationRole::Assistant,
            content,
            Some(MessageOrigin::Agent(agent.into())),
        );
    }

    /// Record a tool result; it also becomes the latest result for `tool`.
    pub fn add_tool_result(&mut self, tool: impl Into<String>, result: Value) {
        let tool = tool.into();
        self.tool_results.insert(tool.clone(), result.clone());
        self.push(ConversationRole::Tool, result, Some(MessageOrigin::Tool(tool)));
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    pub fn context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn tool_result(&self, tool: &str) -> Option<&Value> {
        self.tool_results.get(tool)
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Flat `{role, text}` projection for a provider call.
    ///
    /// Tool results become user messages of the form
    /// `Tool '<name>' returned: <json>`, with the JSON cut after
    /// `max_tool_result_chars` characters.
    pub fn api_messages(&self, max_tool_result_chars: usize) -> Vec<Message> {
        self.messages
            .iter()
            .map(|msg| match msg.role {
                ConversationRole::Tool => {
                    let name = match &msg.metadata {
                        Some(MessageOrigin::Tool(name)) => name.as_str(),
                        _ => "unknown",
                    };
                    let rendered = truncate_chars(&msg.content.to_string(), max_tool_result_chars);
                    Message::user(format!("Tool '{}' returned: {}", name, rendered))
                }
                ConversationRole::System => Message::system(render_text(&msg.content)),
                ConversationRole::User => Message::user(render_text(&msg.content)),
                ConversationRole::Assistant => Message::assistant(render_text(&msg.content)),
            })
            .collect()
    }

    pub fn export(&self) -> ConversationExport {
        ConversationExport {
            messages: self.messages.clone(),
            context: self.context.clone(),
            tool_results: self.tool_results.clone(),
        }
    }
}

/// Plain strings verbatim, anything else as compact JSON.
pub fn render_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
