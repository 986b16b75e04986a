//! Analyzer Output Models
//!
//! The Analyzer's structured turn: a root-cause hypothesis with supporting
//! evidence, plus the assumptions and questions it hands to the Critic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields every Analyzer payload must carry.
pub const ANALYZER_REQUIRED_FIELDS: [&str; 5] = [
    "hypothesis",
    "evidence",
    "suspect_files",
    "fix_suggestion",
    "confidence",
];

/// Root-cause hypothesis produced by the Analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub root_cause: String,
    pub evidence: Vec<String>,
    pub suspect_files: Vec<String>,
    pub fix_suggestion: String,
    /// Self-reported confidence in [0, 1]
    pub confidence: f64,
}

/// A validated Analyzer turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerOutput {
    pub hypothesis: Hypothesis,
    #[serde(default)]
    pub assumptions: Vec<Value>,
    #[serde(default)]
    pub questions_for_critic: Vec<Value>,
}

impl AnalyzerOutput {
    /// Validate a decoded payload and build the typed output.
    ///
    /// Returns every problem found, not just the first.
    pub fn from_payload(data: &Value) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let Some(obj) = data.as_object() else {
            return Err(vec!["Response must be a JSON object".to_string()]);
        };

        for field in ANALYZER_REQUIRED_FIELDS {
            if !obj.contains_key(field) {
                errors.push(format!("Missing required field: {}", field));
            }
        }

        let confidence = obj
            .get("confidence")
            .and_then(|raw| unit_interval(raw, "Confidence", &mut errors));

        let root_cause = string_field(obj.get("hypothesis"), "Hypothesis", &mut errors);
        let fix_suggestion = string_field(obj.get("fix_suggestion"), "Fix suggestion", &mut errors);
        let evidence = string_list(obj.get("evidence"), "Evidence", &mut errors);
        let suspect_files = string_list(obj.get("suspect_files"), "Suspect files", &mut errors);
        let assumptions = optional_list(obj.get("assumptions"), "Assumptions", &mut errors);
        let questions_for_critic =
            optional_list(obj.get("questions_for_critic"), "Questions for critic", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        match (root_cause, fix_suggestion, evidence, suspect_files, confidence) {
            (Some(root_cause), Some(fix_suggestion), Some(evidence), Some(suspect_files), Some(confidence)) => {
                Ok(Self {
                    hypothesis: Hypothesis {
                        root_cause,
                        evidence,
                        suspect_files,
                        fix_suggestion,
                        confidence,
                    },
                    assumptions,
                    questions_for_critic,
                })
            }
            _ => Err(vec!["Incomplete hypothesis".to_string()]),
        }
    }
}

/// Numbers, or strings that parse as numbers.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A number in [0, 1]; pushes an error and returns `None` otherwise.
pub(crate) fn unit_interval(value: &Value, label: &str, errors: &mut Vec<String>) -> Option<f64> {
    match as_number(value) {
        Some(c) if (0.0..=1.0).contains(&c) => Some(c),
        Some(_) => {
            errors.push(format!("{} must be between 0 and 1", label));
            None
        }
        None => {
            errors.push(format!("{} must be a number", label));
            None
        }
    }
}

fn string_field(value: Option<&Value>, label: &str, errors: &mut Vec<String>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        _ => {
            errors.push(format!("{} must be a string", label));
            None
        }
    }
}

/// A list whose items are strings. Non-string scalars are rendered as text.
pub(crate) fn string_list(
    value: Option<&Value>,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<Vec<String>> {
    match value? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => {
            errors.push(format!("{} must be a list", label));
            None
        }
    }
}

/// An optional list field. Absent or null is empty; any other non-list is an error.
pub(crate) fn optional_list(
    value: Option<&Value>,
    label: &str,
    errors: &mut Vec<String>,
) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            errors.push(format!("{} must be a list", label));
            Vec::new()
        }
    }
}
