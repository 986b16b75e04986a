//! Log Chunk Selection
//!
//! Picks the bounded subset of parsed log entries that enters the analysis
//! context. Three policies are tried in order: the most relevant
//! correlation-id group, the most recent error cluster, then the most recent
//! entries overall.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use incident_lens_core::{ErrorCluster, LogEntry, LogLevel, ParsedLogs};

use crate::models::settings::ScoringConfig;

/// Which policy produced a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ChunkSource {
    /// A correlation-id group
    Group { id: String, total_groups: usize },
    /// An error cluster, by position in the cluster list
    Cluster { index: usize, total_clusters: usize },
    /// Most recent entries overall
    Fallback { truncated: bool },
}

impl ChunkSource {
    /// Short label for events and metrics.
    pub fn label(&self) -> String {
        match self {
            Self::Group { id, .. } => id.clone(),
            Self::Cluster { index, .. } => format!("cluster:{}", index),
            Self::Fallback { .. } => "fallback".to_string(),
        }
    }

    /// Size of the candidate set this chunk was chosen from.
    pub fn total_candidates(&self) -> usize {
        match self {
            Self::Group { total_groups, .. } => *total_groups,
            Self::Cluster { total_clusters, .. } => *total_clusters,
            Self::Fallback { .. } => 0,
        }
    }
}

/// The chosen entries, never longer than the requested budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedChunk {
    pub entries: Vec<LogEntry>,
    pub source: ChunkSource,
    /// Relevance score, for group selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Relevance of a group of entries as of `now`.
///
/// Weighted ERROR and WARN counts minus an age penalty (hours since the
/// latest parsed timestamp, clamped to `[0, cap]`), floored at zero.
pub fn score_group(entries: &[LogEntry], now: DateTime<Utc>, scoring: &ScoringConfig) -> f64 {
    let errors = entries.iter().filter(|e| e.level == LogLevel::Error).count() as f64;
    let warns = entries.iter().filter(|e| e.level == LogLevel::Warn).count() as f64;
    let base = scoring.error_weight * errors + scoring.warn_weight * warns;

    let latest = entries
        .iter()
        .filter(|e| !e.timestamp_inferred)
        .map(|e| e.timestamp)
        .max();

    let penalty = latest
        .map(|ts| {
            let age_hours = (now - ts).num_milliseconds() as f64 / 3_600_000.0;
            age_hours.clamp(0.0, scoring.age_penalty_cap_hours)
        })
        .unwrap_or(0.0);

    (base - penalty).max(0.0)
}

/// Choose the most relevant chunk of at most `max_lines` entries.
///
/// An oversized error cluster is trimmed to a window centered on its anchor
/// rather than cut to its first `max_lines` entries, so the ERROR line that
/// formed the cluster is never dropped.
pub fn select_best_chunk(
    parsed: &ParsedLogs,
    max_lines: usize,
    now: DateTime<Utc>,
    scoring: &ScoringConfig,
) -> SelectedChunk {
    let groups = &parsed.groups.by_correlation_id;
    if !groups.is_empty() {
        let mut best = 0;
        let mut best_score = f64::MIN;
        for (idx, group) in groups.iter().enumerate() {
            let score = score_group(&group.entries, now, scoring);
            // Strictly greater keeps the first group on ties
            if score > best_score {
                best = idx;
                best_score = score;
            }
        }
        let group = &groups[best];
        tracing::debug!(group = %group.id, score = best_score, "selected correlation group");
        return SelectedChunk {
            entries: group.entries.iter().take(max_lines).cloned().collect(),
            source: ChunkSource::Group {
                id: group.id.clone(),
                total_groups: groups.len(),
            },
            score: Some(best_score),
        };
    }

    let clusters = &parsed.groups.error_clusters;
    if let Some(index) = most_recent_cluster(clusters) {
        let cluster = &clusters[index];
        tracing::debug!(cluster = index, anchor = cluster.anchor_index, "selected error cluster");
        return SelectedChunk {
            entries: trim_around_anchor(cluster, max_lines),
            source: ChunkSource::Cluster {
                index,
                total_clusters: clusters.len(),
            },
            score: None,
        };
    }

    fallback_chunk(&parsed.entries, max_lines)
}

/// Cluster whose anchor is most recent. Parsed timestamps outrank inferred
/// ones; ties go to the earlier cluster.
fn most_recent_cluster(clusters: &[ErrorCluster]) -> Option<usize> {
    let mut best: Option<(usize, (bool, DateTime<Utc>))> = None;
    for (idx, cluster) in clusters.iter().enumerate() {
        let Some(anchor) = cluster.anchor() else {
            continue;
        };
        let key = (!anchor.timestamp_inferred, anchor.timestamp);
        match best {
            Some((_, best_key)) if key <= best_key => {}
            _ => best = Some((idx, key)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Window of at most `max_lines` entries that always contains the anchor.
fn trim_around_anchor(cluster: &ErrorCluster, max_lines: usize) -> Vec<LogEntry> {
    let len = cluster.entries.len();
    if len <= max_lines {
        return cluster.entries.clone();
    }
    if max_lines == 0 {
        return Vec::new();
    }
    let half = (max_lines - 1) / 2;
    let start = cluster.anchor_offset.saturating_sub(half).min(len - max_lines);
    cluster.entries[start..start + max_lines].to_vec()
}

fn fallback_chunk(entries: &[LogEntry], max_lines: usize) -> SelectedChunk {
    let truncated = entries.len() > max_lines;
    let any_inferred = entries.iter().any(|e| e.timestamp_inferred);

    let selected = if any_inferred {
        // Timestamps are not comparable; position is the best recency signal
        let start = entries.len().saturating_sub(max_lines);
        entries[start..].to_vec()
    } else {
        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(max_lines);
        sorted
    };

    SelectedChunk {
        entries: selected,
        source: ChunkSource::Fallback { truncated },
        score: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use incident_lens_tools::parse_logs;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
    }

    fn entry(level: LogLevel, ts: Option<DateTime<Utc>>, line: usize) -> LogEntry {
        LogEntry {
            timestamp: ts.unwrap_or_else(now),
            timestamp_inferred: ts.is_none(),
            level,
            correlation_id: None,
            message: format!("line {}", line),
            raw: format!("line {}", line),
            line_number: line,
        }
    }

    #[test]
    fn test_score_counts_without_timestamps() {
        let scoring = ScoringConfig::default();
        let entries = vec![
            entry(LogLevel::Error, None, 1),
            entry(LogLevel::Warn, None, 2),
            entry(LogLevel::Info, None, 3),
        ];
        assert_eq!(score_group(&entries, now(), &scoring), 4.0);
    }

    #[test]
    fn test_score_age_penalty_capped_and_floored() {
        let scoring = ScoringConfig::default();
        let two_hours_ago = Some(now() - Duration::hours(2));
        let entries = vec![entry(LogLevel::Error, two_hours_ago, 1)];
        assert_eq!(score_group(&entries, now(), &scoring), 1.0);

        let long_ago = Some(now() - Duration::days(30));
        let entries = vec![
            entry(LogLevel::Error, long_ago, 1),
            entry(LogLevel::Error, long_ago, 2),
            entry(LogLevel::Error, long_ago, 3),
            entry(LogLevel::Error, long_ago, 4),
        ];
        // 12 - 10 (capped)
        assert_eq!(score_group(&entries, now(), &scoring), 2.0);

        let entries = vec![entry(LogLevel::Warn, long_ago, 1)];
        assert_eq!(score_group(&entries, now(), &scoring), 0.0);
    }

    #[test]
    fn test_future_timestamps_have_no_penalty() {
        let scoring = ScoringConfig::default();
        let entries = vec![entry(LogLevel::Error, Some(now() + Duration::hours(3)), 1)];
        assert_eq!(score_group(&entries, now(), &scoring), 3.0);
    }

    #[test]
    fn test_adding_error_never_lowers_score() {
        let scoring = ScoringConfig::default();
        let ts = Some(now() - Duration::hours(1));
        let mut entries = vec![entry(LogLevel::Info, ts, 1), entry(LogLevel::Warn, ts, 2)];
        let before = score_group(&entries, now(), &scoring);
        entries.push(entry(LogLevel::Error, ts, 3));
        assert!(score_group(&entries, now(), &scoring) >= before);
    }

    #[test]
    fn test_selects_error_heavy_group() {
        let raw = "INFO req_id=quiet hello\n\
                   INFO req_id=quiet world\n\
                   ERROR req_id=noisy failed\n\
                   ERROR req_id=noisy failed again\n\
                   WARN req_id=noisy slow";
        let parsed = parse_logs(raw);
        let chunk = select_best_chunk(&parsed, 120, now(), &ScoringConfig::default());
        assert_eq!(
            chunk.source,
            ChunkSource::Group {
                id: "noisy".to_string(),
                total_groups: 2
            }
        );
        assert_eq!(chunk.entries.len(), 3);
        assert_eq!(chunk.score, Some(7.0));
    }

    #[test]
    fn test_group_ties_go_to_first() {
        let parsed = parse_logs("ERROR req_id=a x\nERROR req_id=b y");
        let chunk = select_best_chunk(&parsed, 10, now(), &ScoringConfig::default());
        assert_eq!(chunk.source.label(), "a");
    }

    #[test]
    fn test_group_truncated_to_budget() {
        let raw: Vec<String> = (0..10).map(|i| format!("ERROR req_id=big e{}", i)).collect();
        let parsed = parse_logs(&raw.join("\n"));
        let chunk = select_best_chunk(&parsed, 4, now(), &ScoringConfig::default());
        assert_eq!(chunk.entries.len(), 4);
        assert_eq!(chunk.entries[0].message, "req_id=big e0");
    }

    #[test]
    fn test_cluster_policy_picks_most_recent_anchor() {
        let raw = "2024-03-14T08:00:00Z ERROR early failure\n\
                   2024-03-14T08:00:01Z INFO between\n\
                   2024-03-14T11:00:00Z ERROR late failure\n\
                   2024-03-14T11:00:01Z INFO after";
        let parsed = parse_logs(raw);
        let chunk = select_best_chunk(&parsed, 120, now(), &ScoringConfig::default());
        assert_eq!(
            chunk.source,
            ChunkSource::Cluster {
                index: 1,
                total_clusters: 2
            }
        );
        assert_eq!(chunk.source.label(), "cluster:1");
    }

    #[test]
    fn test_cluster_trim_keeps_anchor() {
        let mut lines: Vec<String> = (0..30).map(|i| format!("INFO filler {}", i)).collect();
        lines[20] = "ERROR the failure".to_string();
        let parsed = parse_logs(&lines.join("\n"));
        let chunk = select_best_chunk(&parsed, 4, now(), &ScoringConfig::default());
        assert_eq!(chunk.entries.len(), 4);
        assert!(chunk.entries.iter().any(|e| e.message == "the failure"));
        // A prefix cut would start at the cluster's first entry, "filler 15"
        assert_eq!(chunk.entries[0].message, "filler 19");
    }

    #[test]
    fn test_cluster_trim_near_edge() {
        let cluster = ErrorCluster {
            anchor_index: 10,
            anchor_offset: 5,
            entries: (0..6).map(|i| entry(LogLevel::Info, None, i)).collect(),
        };
        let trimmed = trim_around_anchor(&cluster, 3);
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed.last().unwrap().line_number, 5);
    }

    #[test]
    fn test_fallback_with_inferred_timestamps_takes_tail() {
        let raw: Vec<String> = (0..200).map(|i| format!("INFO line {}", i)).collect();
        let parsed = parse_logs(&raw.join("\n"));
        let chunk = select_best_chunk(&parsed, 120, now(), &ScoringConfig::default());
        assert_eq!(chunk.entries.len(), 120);
        assert_eq!(chunk.source, ChunkSource::Fallback { truncated: true });
        assert_eq!(chunk.entries[0].message, "line 80");
        assert_eq!(chunk.entries[119].message, "line 199");
    }

    #[test]
    fn test_fallback_sorts_parsed_timestamps_descending() {
        let raw = "2024-03-14T09:00:00Z INFO a\n\
                   2024-03-14T11:00:00Z INFO b\n\
                   2024-03-14T10:00:00Z INFO c";
        let parsed = parse_logs(raw);
        let chunk = select_best_chunk(&parsed, 2, now(), &ScoringConfig::default());
        let messages: Vec<&str> = chunk.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["b", "c"]);
        assert_eq!(chunk.source, ChunkSource::Fallback { truncated: true });
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse_logs("");
        let chunk = select_best_chunk(&parsed, 10, now(), &ScoringConfig::default());
        assert!(chunk.entries.is_empty());
        assert_eq!(chunk.source, ChunkSource::Fallback { truncated: false });
    }
}
