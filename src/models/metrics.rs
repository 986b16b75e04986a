//! Run Metrics Model
//!
//! The metrics document written alongside each report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use incident_lens_llm::UsageStats;

use super::settings::PricingConfig;

/// Token usage per role and combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsageBreakdown {
    pub analyzer: UsageStats,
    pub critic: UsageStats,
    pub total: UsageStats,
}

impl TokenUsageBreakdown {
    pub fn new(analyzer: UsageStats, critic: UsageStats) -> Self {
        let mut total = UsageStats::default();
        total.accumulate(&analyzer);
        total.accumulate(&critic);
        Self {
            analyzer,
            critic,
            total,
        }
    }
}

/// Estimated spend for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Rounded to 4 decimal places
    pub amount: f64,
    pub currency: String,
    pub note: String,
}

impl CostEstimate {
    /// Unrounded cost of `usage` under `pricing`.
    pub fn raw_amount(usage: &UsageStats, pricing: &PricingConfig) -> f64 {
        (usage.input as f64 / 1000.0) * pricing.input_per_1k_tokens
            + (usage.output as f64 / 1000.0) * pricing.output_per_1k_tokens
    }

    pub fn from_usage(usage: &UsageStats, pricing: &PricingConfig) -> Self {
        let amount = Self::raw_amount(usage, pricing);
        Self {
            amount: (amount * 10_000.0).round() / 10_000.0,
            currency: pricing.currency.clone(),
            note: pricing.note.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub analyzer: f64,
    pub critic: f64,
}

/// How the analysis chunk was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingInfo {
    pub original_lines: usize,
    pub chunked_lines: usize,
    /// Correlation id, `cluster:<n>`, or `fallback`
    pub method: String,
}

/// Metrics document for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: String,
    /// Seconds per stage
    pub timings: BTreeMap<String, f64>,
    pub token_usage: TokenUsageBreakdown,
    pub estimated_cost: CostEstimate,
    pub confidence_scores: ConfidenceScores,
    pub conversation_rounds: u32,
    pub converged: bool,
    pub chunking_info: ChunkingInfo,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub warning: Option<String>,
}

impl RunMetrics {
    /// Warning text when `confidence` is under `threshold`.
    pub fn low_confidence_warning(confidence: f64, threshold: f64) -> Option<String> {
        (confidence < threshold).then(|| format!("Low confidence score: {}", confidence))
    }
}
