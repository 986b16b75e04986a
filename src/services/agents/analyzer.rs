//! Analyzer role: proposes and refines the root-cause hypothesis.

use serde_json::Value;

use super::prompts::ANALYZER_INSTRUCTIONS;
use super::AgentRole;
use crate::models::AnalyzerOutput;

#[derive(Debug, Clone, Default)]
pub struct AnalyzerRole {
    instructions: Option<String>,
}

impl AnalyzerRole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in instructions.
    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
        }
    }
}

impl AgentRole for AnalyzerRole {
    type Output = AnalyzerOutput;

    fn name(&self) -> &str {
        "Analyzer"
    }

    fn instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or(ANALYZER_INSTRUCTIONS)
    }

    fn parse_and_validate(&self, payload: &Value) -> Result<AnalyzerOutput, Vec<String>> {
        AnalyzerOutput::from_payload(payload)
    }
}
