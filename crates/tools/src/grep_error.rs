//! grep_error Tool
//!
//! Case-insensitive regex search over a list of source files, returning each
//! matching line with two lines of context on either side. Problems with an
//! individual file are reported in that file's result entry; only an invalid
//! pattern fails the whole call.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use incident_lens_llm::ParameterSchema;

use crate::error::ToolError;
use crate::registry::Tool;

/// Lines of context shown before and after a match.
pub const CONTEXT_LINES: usize = 2;

#[derive(Debug, Deserialize)]
struct GrepArgs {
    pattern: String,
    files: Vec<String>,
}

/// One matching line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepMatch {
    /// 1-based line number of the match
    pub line_number: usize,
    pub line: String,
    /// Numbered context block; the matching line is marked with `>>> `
    pub context: String,
}

/// Search outcome for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMatches {
    pub file: String,
    pub matches: Vec<GrepMatch>,
    pub match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileMatches {
    fn failed(file: &str, error: String) -> Self {
        Self {
            file: file.to_string(),
            matches: Vec::new(),
            match_count: 0,
            error: Some(error),
        }
    }
}

/// Full output of a grep run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepOutput {
    /// Always false on a completed search
    pub error: bool,
    pub pattern: String,
    pub total_matches: usize,
    pub results: Vec<FileMatches>,
}

/// Compile `pattern` case-insensitively with multi-line anchors.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ToolError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|e| ToolError::invalid_arguments(format!("Invalid regex pattern: {}", e)))
}

/// Search the text of one file.
pub fn search_text(regex: &Regex, content: &str) -> Vec<GrepMatch> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| regex.is_match(line))
        .map(|(idx, line)| {
            let start = idx.saturating_sub(CONTEXT_LINES);
            let end = (idx + CONTEXT_LINES + 1).min(lines.len());
            let context = (start..end)
                .map(|i| {
                    let marker = if i == idx { ">>> " } else { "    " };
                    format!("{:4}: {}{}", i + 1, marker, lines[i])
                })
                .collect::<Vec<_>>()
                .join("\n");
            GrepMatch {
                line_number: idx + 1,
                line: line.to_string(),
                context,
            }
        })
        .collect()
}

fn search_file(regex: &Regex, file: &str) -> FileMatches {
    let path = Path::new(file);
    if !path.exists() {
        return FileMatches::failed(file, format!("File not found: {}", file));
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let matches = search_text(regex, &content);
            FileMatches {
                file: file.to_string(),
                match_count: matches.len(),
                matches,
                error: None,
            }
        }
        Err(e) => FileMatches::failed(file, e.to_string()),
    }
}

/// Run a search over every file, in order.
pub fn grep_files(pattern: &str, files: &[String]) -> Result<GrepOutput, ToolError> {
    let regex = compile_pattern(pattern)?;
    let results: Vec<FileMatches> = files.iter().map(|f| search_file(&regex, f)).collect();
    let total_matches = results.iter().map(|r| r.match_count).sum();

    tracing::debug!(pattern, total_matches, files = files.len(), "grep completed");

    Ok(GrepOutput {
        error: false,
        pattern: pattern.to_string(),
        total_matches,
        results,
    })
}

/// `grep_error` tool.
#[derive(Debug, Default)]
pub struct GrepErrorTool;

#[async_trait]
impl Tool for GrepErrorTool {
    fn name(&self) -> &str {
        "grep_error"
    }

    fn description(&self) -> &str {
        "Search source files for a regex pattern (case-insensitive) with two lines of context"
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "pattern".to_string(),
            ParameterSchema::string(Some("Regular expression to search for")),
        );
        properties.insert(
            "files".to_string(),
            ParameterSchema::array(
                Some("Paths of the files to search"),
                ParameterSchema::string(None),
            ),
        );
        ParameterSchema::object(
            None,
            properties,
            vec!["pattern".to_string(), "files".to_string()],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: GrepArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        let output = grep_files(&args.pattern, &args.files)?;
        Ok(serde_json::to_value(output)?)
    }

    fn summarize(&self, output: &Value) -> Option<Value> {
        Some(json!({
            "total_matches": output.get("total_matches")?,
            "files_searched": output.get("results")?.as_array()?.len(),
        }))
    }
}
