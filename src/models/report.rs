//! Incident Report Model
//!
//! The final artifact of a run, assembled from the last Analyzer hypothesis
//! and the last Critic verdict. Validation is advisory: problems are returned
//! as messages for the caller to log, never as an error.

use std::sync::OnceLock;

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::critique::{CriticOutput, Verdict};
use super::hypothesis::Hypothesis;

/// Placeholder impact text; impact is not assessed by either role.
pub const DEFAULT_IMPACT: &str = "See report for details";

/// Words that suggest an evidence line leaked a credential.
const SENSITIVE_WORDS: [&str; 3] = ["password", "secret", "key"];

/// JSON Schema every serialized report must satisfy.
pub fn incident_report_schema() -> Value {
    json!({
        "type": "object",
        "required": ["title", "summary", "root_cause", "evidence", "fix", "impact", "remaining_risks"],
        "properties": {
            "title": {"type": "string", "minLength": 1, "maxLength": 200},
            "summary": {"type": "string", "minLength": 10, "maxLength": 500},
            "root_cause": {"type": "string", "minLength": 10, "maxLength": 1000},
            "evidence": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "maxItems": 20
            },
            "fix": {"type": "string", "minLength": 5, "maxLength": 1000},
            "impact": {"type": "string", "minLength": 1, "maxLength": 500},
            "remaining_risks": {
                "type": "array",
                "items": {"type": "string"},
                "maxItems": 10
            },
            "raw_conversation_path": {"type": "string"}
        }
    })
}

fn compiled_schema() -> Result<&'static JSONSchema, String> {
    static SCHEMA: OnceLock<Result<JSONSchema, String>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            JSONSchema::compile(&incident_report_schema()).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Validated incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub title: String,
    pub summary: String,
    pub root_cause: String,
    pub evidence: Vec<String>,
    pub fix: String,
    pub impact: String,
    pub remaining_risks: Vec<String>,
    /// Analyzer confidence for the final hypothesis
    pub confidence: f64,
    pub verdict: Verdict,
    /// Critic's narrative markdown
    pub narrative: String,
    pub raw_conversation_path: String,
}

impl IncidentReport {
    /// Combine the final hypothesis and critique into a report.
    pub fn assemble(
        run_label: &str,
        hypothesis: &Hypothesis,
        critique: &CriticOutput,
        conversation_path: impl Into<String>,
    ) -> Self {
        Self {
            title: format!("Incident Analysis - {}", run_label),
            summary: hypothesis.root_cause.clone(),
            root_cause: hypothesis.root_cause.clone(),
            evidence: hypothesis.evidence.clone(),
            fix: hypothesis.fix_suggestion.clone(),
            impact: DEFAULT_IMPACT.to_string(),
            remaining_risks: critique.remaining_risks.clone(),
            confidence: hypothesis.confidence,
            verdict: critique.verdict,
            narrative: critique.final_report.clone(),
            raw_conversation_path: conversation_path.into(),
        }
    }

    /// Check field bounds and content rules. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match (compiled_schema(), serde_json::to_value(self)) {
            (Ok(schema), Ok(instance)) => {
                if let Err(failures) = schema.validate(&instance) {
                    errors.extend(failures.map(|e| {
                        format!("Schema validation failed at '{}': {}", e.instance_path, e)
                    }));
                }
            }
            (Err(e), _) => errors.push(format!("Report schema is invalid: {}", e)),
            (_, Err(e)) => errors.push(format!("Report could not be serialized: {}", e)),
        }

        if !self.title.is_empty() && !self.title.to_lowercase().contains("incident") {
            errors.push("Title should contain 'Incident'".to_string());
        }

        if self.evidence.is_empty() {
            errors.push("At least one piece of evidence is required".to_string());
        }

        if !self.root_cause.is_empty() && self.root_cause.chars().count() < 20 {
            errors.push("Root cause description is too brief".to_string());
        }

        for evidence in &self.evidence {
            if evidence.contains("[REDACTED]") || evidence.contains("_REDACTED]") {
                continue;
            }
            let lowered = evidence.to_lowercase();
            if SENSITIVE_WORDS.iter().any(|w| lowered.contains(w)) {
                let preview: String = evidence.chars().take(50).collect();
                errors.push(format!("Evidence may contain sensitive data: {}...", preview));
            }
        }

        errors
    }
}
