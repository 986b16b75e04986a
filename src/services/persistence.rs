//! Artifact Persistence
//!
//! Writes the artifacts of one run into the output directory, each tagged
//! with the run timestamp (`%Y%m%d_%H%M%S`):
//! - `conversation_<ts>.json` - full conversation export
//! - `report_<ts>.md` - narrative report
//! - `metrics_<ts>.json` - run metrics
//!
//! Writes are plain file writes with no atomicity guarantees.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::models::{IncidentReport, RunMetrics};
use crate::services::conversation::ConversationExport;
use crate::utils::error::AppResult;

/// File name of the tools-only run output.
pub const TOOLS_RESULTS_FILE: &str = "tools_test_results.json";

/// Paths of the artifacts written for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactPaths {
    pub conversation: PathBuf,
    pub report: PathBuf,
    pub metrics: PathBuf,
}

/// Writer bound to one output directory and run timestamp.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    timestamp: String,
}

impl ArtifactWriter {
    /// Create the output directory if needed and stamp the run with the
    /// current local time.
    pub fn new(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::with_timestamp(dir, timestamp)
    }

    pub fn with_timestamp(dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> AppResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            timestamp: timestamp.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run timestamp shared by every artifact of this run.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn conversation_path(&self) -> PathBuf {
        self.dir.join(format!("conversation_{}.json", self.timestamp))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(format!("report_{}.md", self.timestamp))
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join(format!("metrics_{}.json", self.timestamp))
    }

    pub fn write_conversation(&self, export: &ConversationExport) -> AppResult<PathBuf> {
        let path = self.conversation_path();
        write_json(&path, export)?;
        Ok(path)
    }

    /// Write the narrative markdown of `report`.
    pub fn write_report(&self, report: &IncidentReport) -> AppResult<PathBuf> {
        let path = self.report_path();
        fs::write(&path, &report.narrative)?;
        tracing::info!(path = %path.display(), "report saved");
        Ok(path)
    }

    pub fn write_metrics(&self, metrics: &RunMetrics) -> AppResult<PathBuf> {
        let path = self.metrics_path();
        write_json(&path, metrics)?;
        tracing::info!(path = %path.display(), "metrics saved");
        Ok(path)
    }
}

/// Pretty-print `value` as JSON into `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
