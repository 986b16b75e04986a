//! Log Data Model
//!
//! Structured form of a raw log file after parsing: the ordered entry
//! sequence plus the two derived groupings (by correlation id and
//! error-anchored clusters) and summary counts.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse a severity token, case-insensitively. `WARNING` maps to `Warn`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            "FATAL" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Whether continuation lines (stack frames) may attach to an entry of this level.
    pub fn opens_continuation(&self) -> bool {
        matches!(self, Self::Warn | Self::Error | Self::Fatal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::from_token(s).ok_or_else(|| CoreError::parse(format!("Unknown log level: {}", s)))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Parsed timestamp, or the ingestion time when none could be parsed
    pub timestamp: DateTime<Utc>,
    /// True when `timestamp` is the ingestion time rather than a parsed value
    #[serde(default)]
    pub timestamp_inferred: bool,
    /// Severity level (INFO when the line carries no recognised token)
    pub level: LogLevel,
    /// Request/trace id threading related lines together
    #[serde(rename = "request_id", skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
    /// Line text with the timestamp and level token removed
    pub message: String,
    /// Original line, with any merged continuation lines appended
    pub raw: String,
    /// 1-based physical line number of the entry head
    pub line_number: usize,
}

impl LogEntry {
    /// Merge a continuation line (e.g. a stack frame) into this entry.
    pub fn append_continuation(&mut self, line: &str) {
        self.message.push('\n');
        self.message.push_str(line);
        self.raw.push('\n');
        self.raw.push_str(line);
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    pub fn is_warn(&self) -> bool {
        self.level == LogLevel::Warn
    }
}

/// Entries sharing a correlation id, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationGroup {
    pub id: String,
    pub entries: Vec<LogEntry>,
}

/// Fixed-radius window of entries centered on an ERROR entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCluster {
    /// Position of the anchoring ERROR entry in the parsed sequence
    pub anchor_index: usize,
    /// Position of the anchor within `entries`
    pub anchor_offset: usize,
    pub entries: Vec<LogEntry>,
}

impl ErrorCluster {
    /// The ERROR entry this cluster is centered on.
    pub fn anchor(&self) -> Option<&LogEntry> {
        self.entries.get(self.anchor_offset)
    }
}

/// Derived views over the parsed entry sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogGroups {
    pub by_correlation_id: Vec<CorrelationGroup>,
    pub error_clusters: Vec<ErrorCluster>,
}

/// Summary counts over the parsed entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_lines: usize,
    pub error_count: usize,
    pub warn_count: usize,
    pub fatal_count: usize,
}

impl LogSummary {
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut summary, entry| {
            summary.total_lines += 1;
            match entry.level {
                LogLevel::Error => summary.error_count += 1,
                LogLevel::Warn => summary.warn_count += 1,
                LogLevel::Fatal => summary.fatal_count += 1,
                _ => {}
            }
            summary
        })
    }
}

/// Full output of the log parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedLogs {
    pub entries: Vec<LogEntry>,
    pub groups: LogGroups,
    pub summary: LogSummary,
}

impl ParsedLogs {
    /// Decode the JSON produced by the `parse_logs` tool.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
