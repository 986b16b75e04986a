//! PII Redaction
//!
//! Replaces emails, card numbers, SSNs, API keys, bearer tokens and JWTs
//! with fixed markers before log text is sent to a provider. Replacement
//! markers never match any pattern, so redaction is idempotent.

use std::sync::OnceLock;

use regex::Regex;

use incident_lens_core::{CorrelationGroup, ErrorCluster, LogEntry, LogGroups, ParsedLogs};

/// A named replacement rule.
struct RedactionRule {
    name: &'static str,
    regex: Regex,
    replacement: &'static str,
}

/// Rule name, pattern source and replacement marker, applied in order.
const RULES: [(&str, &str, &str); 6] = [
    (
        "email",
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        "[EMAIL_REDACTED]",
    ),
    (
        "credit_card",
        r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
        "[CC_REDACTED]",
    ),
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b", "[SSN_REDACTED]"),
    (
        "api_key",
        r#"[aA][pP][iI][-_]?[kK][eE][yY]\s*[:=]\s*["']?[\w\-]+["']?"#,
        "[API_KEY_REDACTED]",
    ),
    ("bearer", r"[bB]earer\s+[\w\-\.]+", "[BEARER_TOKEN_REDACTED]"),
    ("jwt", r"eyJ[\w\-]+\.[\w\-]+\.[\w\-]+", "[JWT_REDACTED]"),
];

fn rules() -> &'static Vec<RedactionRule> {
    static RULES_COMPILED: OnceLock<Vec<RedactionRule>> = OnceLock::new();
    RULES_COMPILED.get_or_init(|| {
        RULES
            .iter()
            .filter_map(|&(name, pattern, replacement)| {
                Regex::new(pattern).ok().map(|regex| RedactionRule {
                    name,
                    regex,
                    replacement,
                })
            })
            .collect()
    })
}

/// Redact sensitive substrings from `text`.
pub fn redact_text(text: &str) -> String {
    rules().iter().fold(text.to_string(), |acc, rule| {
        if rule.regex.is_match(&acc) {
            tracing::trace!(rule = rule.name, "redacting");
            rule.regex.replace_all(&acc, rule.replacement).into_owned()
        } else {
            acc
        }
    })
}

/// Copy of `entries` with `message` and `raw` redacted.
pub fn redact_entries(entries: &[LogEntry]) -> Vec<LogEntry> {
    entries
        .iter()
        .map(|entry| LogEntry {
            message: redact_text(&entry.message),
            raw: redact_text(&entry.raw),
            ..entry.clone()
        })
        .collect()
}

/// Copy of a full parse result with every entry redacted, groups included.
pub fn redact_parsed(parsed: &ParsedLogs) -> ParsedLogs {
    ParsedLogs {
        entries: redact_entries(&parsed.entries),
        groups: LogGroups {
            by_correlation_id: parsed
                .groups
                .by_correlation_id
                .iter()
                .map(|group| CorrelationGroup {
                    id: group.id.clone(),
                    entries: redact_entries(&group.entries),
                })
                .collect(),
            error_clusters: parsed
                .groups
                .error_clusters
                .iter()
                .map(|cluster| ErrorCluster {
                    entries: redact_entries(&cluster.entries),
                    ..cluster.clone()
                })
                .collect(),
        },
        summary: parsed.summary,
    }
}
