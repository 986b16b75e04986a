//! TOML Configuration Loading
//!
//! Reads an `AnalysisConfig` from a TOML file and validates it. Keys absent
//! from the file keep their defaults.

use std::fs;
use std::path::Path;

use crate::models::settings::AnalysisConfig;
use crate::utils::error::{AppError, AppResult};

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> AppResult<AnalysisConfig> {
    if !path.exists() {
        return Err(AppError::not_found(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded analysis config");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> AppResult<AnalysisConfig> {
    let config: AnalysisConfig = toml::from_str(content)?;
    config.validate().map_err(AppError::config)?;
    Ok(config)
}

/// Load from `path` when given, otherwise use defaults.
pub fn load_or_default(path: Option<&Path>) -> AppResult<AnalysisConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Serialize a configuration as TOML (the starter file written by `init`).
pub fn to_toml(config: &AnalysisConfig) -> AppResult<String> {
    toml::to_string_pretty(config).map_err(|e| AppError::internal(e.to_string()))
}
