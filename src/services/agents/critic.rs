//! Critic role: challenges the hypothesis and writes the narrative report.
//!
//! A Critic turn that cannot be validated degrades to an `error` verdict
//! instead of failing the run.

use serde_json::Value;

use super::prompts::CRITIC_INSTRUCTIONS;
use super::AgentRole;
use crate::models::CriticOutput;

#[derive(Debug, Clone, Default)]
pub struct CriticRole {
    instructions: Option<String>,
}

impl CriticRole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
        }
    }
}

impl AgentRole for CriticRole {
    type Output = CriticOutput;

    fn name(&self) -> &str {
        "Critic"
    }

    fn instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or(CRITIC_INSTRUCTIONS)
    }

    fn parse_and_validate(&self, payload: &Value) -> Result<CriticOutput, Vec<String>> {
        CriticOutput::from_payload(payload)
    }

    fn degrade(&self, message: &str) -> Option<CriticOutput> {
        Some(CriticOutput::degraded(message))
    }
}
