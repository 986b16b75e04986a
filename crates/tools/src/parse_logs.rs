//! Log Parser
//!
//! Turns raw log text into an ordered `LogEntry` sequence plus the derived
//! groupings used for chunk selection. Parsing never fails: a line that
//! matches none of the heuristics still becomes an INFO entry stamped with the
//! ingestion time.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use incident_lens_core::{
    CorrelationGroup, ErrorCluster, LogEntry, LogGroups, LogLevel, LogSummary, ParsedLogs,
};
use incident_lens_llm::ParameterSchema;

use crate::error::ToolError;
use crate::registry::Tool;

/// Default number of entries on each side of an ERROR entry in a cluster.
pub const DEFAULT_CLUSTER_RADIUS: usize = 5;

/// Parser knobs.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Entries on each side of an ERROR anchor
    pub cluster_radius: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            cluster_radius: DEFAULT_CLUSTER_RADIUS,
        }
    }
}

/// Timestamp pattern families, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimestampFormat {
    /// `2024-01-01T00:00:00.123Z`, `2024-01-01 00:00:00+0200`, ...
    Iso8601,
    /// `Jan 5, 2024 3:04:05 PM`
    Human,
    /// `05/Jan/2024:15:04:05` (Apache / common log format)
    Server,
}

impl TimestampFormat {
    const ORDER: [TimestampFormat; 3] = [Self::Iso8601, Self::Human, Self::Server];

    fn pattern(&self) -> &'static str {
        match self {
            Self::Iso8601 => {
                r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?"
            }
            Self::Human => r"\w{3} \d{1,2}, \d{4} \d{1,2}:\d{2}:\d{2} [AP]M",
            Self::Server => r"\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2}",
        }
    }

    fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        match self {
            Self::Iso8601 => parse_iso8601(text),
            Self::Human => NaiveDateTime::parse_from_str(text, "%b %d, %Y %I:%M:%S %p")
                .ok()
                .map(|n| n.and_utc()),
            Self::Server => NaiveDateTime::parse_from_str(text, "%d/%b/%Y:%H:%M:%S")
                .ok()
                .map(|n| n.and_utc()),
        }
    }
}

/// Zone-less ISO values are taken as UTC.
fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    let normalized = text.replacen(' ', "T", 1);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

struct Patterns {
    timestamps: Vec<(TimestampFormat, Regex)>,
    level: Option<Regex>,
    correlation_ids: Vec<Regex>,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        timestamps: TimestampFormat::ORDER
            .iter()
            .filter_map(|f| Regex::new(f.pattern()).ok().map(|r| (*f, r)))
            .collect(),
        level: Regex::new(r"(?i)\b(TRACE|DEBUG|INFO|WARN|WARNING|ERROR|FATAL)\b").ok(),
        correlation_ids: [
            // Explicit label followed by a long hex id
            r"(?i)(?:request[_-]?id|req[_-]?id|trace[_-]?id)[:\s]*([a-f0-9-]{32,36})",
            // Bare UUID
            r"(?i)([a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12})",
            // Loose labelled fallback for short ids
            r"(?i)(?:request[_-]?id|req[_-]?id|trace[_-]?id)[^\w-]*([A-Za-z0-9_-]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect(),
    })
}

/// Whether `line` looks like a stack-trace continuation of the previous entry.
pub fn is_continuation_line(line: &str) -> bool {
    if line.starts_with('\t') {
        return true;
    }
    if !line.starts_with(' ') {
        return false;
    }
    let body = line.trim_start();
    body.starts_with("at ") || body.starts_with("... ") || body.starts_with("Caused by:")
}

/// Parse a single non-continuation line into an entry.
fn parse_line(line: &str, line_number: usize, ingested_at: DateTime<Utc>) -> LogEntry {
    let pats = patterns();

    // First matching family wins, even if the matched text fails to parse
    let ts_match = pats
        .timestamps
        .iter()
        .find_map(|(format, re)| re.find(line).map(|m| (*format, m)));
    let parsed_ts = ts_match.and_then(|(format, m)| format.parse(m.as_str()));

    let mut message = match ts_match {
        Some((_, m)) => format!("{}{}", &line[..m.start()], &line[m.end()..]),
        None => line.to_string(),
    };

    let level = match pats.level.as_ref().and_then(|re| re.find(&message)) {
        Some(m) => {
            let level = m.as_str().parse::<LogLevel>().unwrap_or_default();
            message.replace_range(m.range(), "");
            level
        }
        None => LogLevel::Info,
    };

    let correlation_id = pats
        .correlation_ids
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    LogEntry {
        timestamp: parsed_ts.unwrap_or(ingested_at),
        timestamp_inferred: parsed_ts.is_none(),
        level,
        correlation_id,
        message: message.trim().to_string(),
        raw: line.to_string(),
        line_number,
    }
}

/// Parse raw log text with default options.
pub fn parse_logs(raw: &str) -> ParsedLogs {
    parse_logs_with(raw, &ParseOptions::default())
}

/// Parse raw log text into entries, groupings and summary counts.
pub fn parse_logs_with(raw: &str, options: &ParseOptions) -> ParsedLogs {
    let ingested_at = Utc::now();
    let mut entries: Vec<LogEntry> = Vec::new();
    // Index of the entry that continuation lines may attach to
    let mut open_entry: Option<usize> = None;

    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        if is_continuation_line(line) {
            if let Some(open) = open_entry {
                entries[open].append_continuation(line);
                continue;
            }
        }

        let entry = parse_line(line, idx + 1, ingested_at);
        open_entry = entry
            .level
            .opens_continuation()
            .then_some(entries.len());
        entries.push(entry);
    }

    let groups = group_entries(&entries, options.cluster_radius);
    let summary = LogSummary::from_entries(&entries);

    ParsedLogs {
        entries,
        groups,
        summary,
    }
}

/// Build the by-correlation-id and error-cluster views.
pub fn group_entries(entries: &[LogEntry], cluster_radius: usize) -> LogGroups {
    let mut by_correlation_id: Vec<CorrelationGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let Some(id) = entry.correlation_id.as_deref() else {
            continue;
        };
        match positions.get(id) {
            Some(&pos) => by_correlation_id[pos].entries.push(entry.clone()),
            None => {
                positions.insert(id, by_correlation_id.len());
                by_correlation_id.push(CorrelationGroup {
                    id: id.to_string(),
                    entries: vec![entry.clone()],
                });
            }
        }
    }

    let error_clusters = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_error())
        .map(|(anchor_index, _)| {
            let start = anchor_index.saturating_sub(cluster_radius);
            let end = (anchor_index + cluster_radius + 1).min(entries.len());
            ErrorCluster {
                anchor_index,
                anchor_offset: anchor_index - start,
                entries: entries[start..end].to_vec(),
            }
        })
        .collect();

    LogGroups {
        by_correlation_id,
        error_clusters,
    }
}

// ── Tool ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ParseLogsArgs {
    raw_logs: String,
}

/// `parse_logs` tool: raw text in, `ParsedLogs` JSON out.
pub struct ParseLogsTool {
    options: ParseOptions,
}

impl ParseLogsTool {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl Default for ParseLogsTool {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

#[async_trait]
impl Tool for ParseLogsTool {
    fn name(&self) -> &str {
        "parse_logs"
    }

    fn description(&self) -> &str {
        "Parse raw log text into structured entries grouped by request id and error proximity"
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "raw_logs".to_string(),
            ParameterSchema::string(Some("Raw log text to parse")),
        );
        ParameterSchema::object(None, properties, vec!["raw_logs".to_string()])
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ParseLogsArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        let parsed = parse_logs_with(&args.raw_logs, &self.options);
        Ok(serde_json::to_value(parsed)?)
    }

    fn summarize(&self, output: &Value) -> Option<Value> {
        output.get("summary").cloned()
    }
}
