//! Settings Models
//!
//! Analysis configuration. Every field has a default, so a TOML file only
//! needs the keys it wants to override.

use serde::{Deserialize, Serialize};

/// Full analysis configuration, loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub limits: LimitsConfig,
    pub pipeline: PipelineConfig,
    pub agents: AgentsConfig,
    pub scoring: ScoringConfig,
    pub thresholds: ThresholdsConfig,
    pub pricing: PricingConfig,
    pub output: OutputConfig,
    pub debug: DebugConfig,
}

/// Size budgets for what enters the analysis context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum log entries in the selected chunk
    pub max_log_lines: usize,
    /// Combined character budget for all code snippets
    pub max_code_chars: usize,
    /// Per-tool-result character budget in the provider projection
    pub max_tool_result_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_log_lines: 120,
            max_code_chars: 20_000,
            max_tool_result_chars: 1500,
        }
    }
}

/// Round bounds for the Analyzer/Critic loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_rounds: u32,
    pub max_rounds: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_rounds: 2,
            max_rounds: 3,
        }
    }
}

/// Retry bound for each agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub max_attempts: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// Relevance scoring weights for chunk selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub error_weight: f64,
    pub warn_weight: f64,
    /// Upper bound on the recency penalty, in hours
    pub age_penalty_cap_hours: f64,
    /// Entries on each side of an ERROR in a cluster
    pub cluster_radius: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            error_weight: 3.0,
            warn_weight: 1.0,
            age_penalty_cap_hours: 10.0,
            cluster_radius: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Analyzer confidence below this adds a warning to the metrics
    pub critical_confidence: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            critical_confidence: 0.5,
        }
    }
}

/// Token pricing used for the cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub input_per_1k_tokens: f64,
    pub output_per_1k_tokens: f64,
    pub currency: String,
    pub note: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_1k_tokens: 0.0,
            output_per_1k_tokens: 0.0,
            currency: "USD".to_string(),
            note: "Estimate only; set [pricing] for your model".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives conversation, report and metrics files
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Embed the full selected chunk in the initial analysis message
    pub include_full_logs: bool,
}

impl AnalysisConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let pipeline = &self.pipeline;
        if pipeline.min_rounds < 1 {
            return Err("pipeline.min_rounds must be at least 1".to_string());
        }
        if pipeline.min_rounds > pipeline.max_rounds {
            return Err(format!(
                "pipeline.min_rounds ({}) cannot exceed pipeline.max_rounds ({})",
                pipeline.min_rounds, pipeline.max_rounds
            ));
        }

        if self.agents.max_attempts < 1 {
            return Err("agents.max_attempts must be at least 1".to_string());
        }

        if self.limits.max_log_lines < 1 {
            return Err("limits.max_log_lines must be at least 1".to_string());
        }

        let scoring = &self.scoring;
        for (name, value) in [
            ("scoring.error_weight", scoring.error_weight),
            ("scoring.warn_weight", scoring.warn_weight),
            ("scoring.age_penalty_cap_hours", scoring.age_penalty_cap_hours),
            ("pricing.input_per_1k_tokens", self.pricing.input_per_1k_tokens),
            ("pricing.output_per_1k_tokens", self.pricing.output_per_1k_tokens),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number", name));
            }
        }

        if !(0.0..=1.0).contains(&self.thresholds.critical_confidence) {
            return Err("thresholds.critical_confidence must be between 0 and 1".to_string());
        }

        Ok(())
    }
}
