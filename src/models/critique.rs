//! Critic Output Models

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::hypothesis::{optional_list, string_list, unit_interval};

/// Fields every Critic payload must carry.
pub const CRITIC_REQUIRED_FIELDS: [&str; 3] = ["verdict", "final_report", "remaining_risks"];

/// Bounds on the narrative report length, in characters.
pub const MIN_REPORT_CHARS: usize = 50;
pub const MAX_REPORT_CHARS: usize = 5000;

/// Report text used when the Critic's turn could not be validated.
pub const DEGRADED_REPORT: &str =
    "Could not generate a valid report due to response format errors.";

/// Critic's judgement of the current hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Confirmed,
    Revised,
    /// Synthetic verdict for a Critic turn that failed validation
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Revised => "revised",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Critic turn, either validated or degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticOutput {
    pub verdict: Verdict,
    #[serde(default)]
    pub issues_found: Vec<Value>,
    #[serde(default)]
    pub open_issues: Vec<Value>,
    #[serde(default)]
    pub assumptions_challenged: Vec<Value>,
    /// Narrative markdown report
    pub final_report: String,
    pub remaining_risks: Vec<String>,
    #[serde(default)]
    pub confidence_score: f64,
    /// True when this output was synthesized after a validation failure
    #[serde(default)]
    pub degraded: bool,
}

impl CriticOutput {
    /// Validate a decoded payload and build the typed output.
    pub fn from_payload(data: &Value) -> Result<Self, Vec<String>> {
        let Some(obj) = data.as_object() else {
            return Err(vec!["Response must be a JSON object".to_string()]);
        };

        let mut errors: Vec<String> = CRITIC_REQUIRED_FIELDS
            .iter()
            .filter(|field| !obj.contains_key(**field))
            .map(|field| format!("Missing required field: {}", field))
            .collect();

        let verdict = match obj.get("verdict") {
            Some(v) => match v.as_str() {
                Some("confirmed") => Some(Verdict::Confirmed),
                Some("revised") => Some(Verdict::Revised),
                _ => {
                    errors.push("Verdict must be 'confirmed' or 'revised'".to_string());
                    None
                }
            },
            None => None,
        };

        let remaining_risks = string_list(obj.get("remaining_risks"), "Remaining risks", &mut errors);

        let final_report = match obj.get("final_report") {
            Some(Value::String(report)) => {
                let len = report.chars().count();
                if len > MAX_REPORT_CHARS {
                    errors.push("Final report exceeds maximum length".to_string());
                    None
                } else if len < MIN_REPORT_CHARS {
                    errors.push("Final report is too brief".to_string());
                    None
                } else {
                    Some(report.clone())
                }
            }
            Some(_) => {
                errors.push("Final report must be a string".to_string());
                None
            }
            None => None,
        };

        let issues_found = optional_list(obj.get("issues_found"), "Issues found", &mut errors);
        let open_issues = optional_list(obj.get("open_issues"), "Open issues", &mut errors);
        let assumptions_challenged = optional_list(
            obj.get("assumptions_challenged"),
            "Assumptions challenged",
            &mut errors,
        );
        let confidence_score = match obj.get("confidence_score") {
            None | Some(Value::Null) => Some(0.0),
            Some(raw) => unit_interval(raw, "Confidence score", &mut errors),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        match (verdict, final_report, remaining_risks, confidence_score) {
            (Some(verdict), Some(final_report), Some(remaining_risks), Some(confidence_score)) => {
                Ok(Self {
                    verdict,
                    issues_found,
                    open_issues,
                    assumptions_challenged,
                    final_report,
                    remaining_risks,
                    confidence_score,
                    degraded: false,
                })
            }
            _ => Err(vec!["Incomplete critique".to_string()]),
        }
    }

    /// Synthetic output carrying a failure message.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Error,
            issues_found: Vec::new(),
            open_issues: Vec::new(),
            assumptions_challenged: Vec::new(),
            final_report: DEGRADED_REPORT.to_string(),
            remaining_risks: vec![message.into()],
            confidence_score: 0.0,
            degraded: true,
        }
    }

    /// Whether the Critic accepted the hypothesis with nothing left open.
    pub fn is_settled(&self) -> bool {
        self.verdict == Verdict::Confirmed && self.open_issues.is_empty()
    }
}
