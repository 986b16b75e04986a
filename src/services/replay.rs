//! Recorded Response Replay
//!
//! Loads a replay file holding one scripted response queue per role:
//!
//! ```json
//! { "analyzer": ["{...}", {"content": "{...}", "usage": {...}}],
//!   "critic":   [{"error": "connection reset"}, "{...}"] }
//! ```
//!
//! Entries are bare text, full responses, or transport failures.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use incident_lens_llm::{LlmProvider, ScriptEntry, ScriptedProvider};

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub analyzer: Vec<ScriptEntry>,
    #[serde(default)]
    pub critic: Vec<ScriptEntry>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.is_file() {
            return Err(AppError::not_found(format!(
                "Replay file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> AppResult<Self> {
        let script: ReplayScript = serde_json::from_str(content)?;
        if script.analyzer.is_empty() {
            return Err(AppError::validation("Replay file has no analyzer responses"));
        }
        if script.critic.is_empty() {
            return Err(AppError::validation("Replay file has no critic responses"));
        }
        Ok(script)
    }

    /// Analyzer and critic providers, in that order.
    pub fn into_providers(self) -> (Arc<dyn LlmProvider>, Arc<dyn LlmProvider>) {
        let analyzer: Arc<dyn LlmProvider> = Arc::new(
            ScriptedProvider::from_entries("analyzer-replay", self.analyzer).with_model("replay"),
        );
        let critic: Arc<dyn LlmProvider> = Arc::new(
            ScriptedProvider::from_entries("critic-replay", self.critic).with_model("replay"),
        );
        (analyzer, critic)
    }
}
