//! Structured Response Salvage
//!
//! Models asked for "JSON only" still wrap it in markdown fences or surround
//! it with prose. This module tries a fixed, ordered sequence of text
//! transforms and returns the first one that decodes, preferring objects:
//! prose like "see line [42]" must not shadow the payload that follows it.
//! It is a best-effort step, not a JSON parser: anything these transforms
//! cannot recover is left to a corrective re-prompt.

use serde_json::Value;

/// Transform that produced a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalvageStep {
    /// Content between the first markdown fence and its closing fence
    StripFences,
    /// First opening brace (or bracket) through the last matching closer
    OuterSpan,
    /// First opening brace (or bracket) through its balanced closer
    BalancedSpan,
}

impl SalvageStep {
    /// All steps, in the order they are attempted.
    pub const ORDER: [SalvageStep; 3] = [
        SalvageStep::StripFences,
        SalvageStep::OuterSpan,
        SalvageStep::BalancedSpan,
    ];

    /// Candidate slices for this step, object-shaped ones first.
    fn candidates<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            SalvageStep::StripFences => strip_fences(text).into_iter().collect(),
            SalvageStep::OuterSpan => [outer_span(text, '{'), outer_span(text, '[')]
                .into_iter()
                .flatten()
                .collect(),
            SalvageStep::BalancedSpan => [balanced_span(text, '{'), balanced_span(text, '[')]
                .into_iter()
                .flatten()
                .collect(),
        }
    }
}

/// Try each salvage transform in order and return the first decoded object.
/// Only when no step yields an object is the first decodable array or
/// scalar returned.
pub fn salvage_json(text: &str) -> Option<(Value, SalvageStep)> {
    let decoded: Vec<(Value, SalvageStep)> = SalvageStep::ORDER
        .iter()
        .flat_map(|step| {
            step.candidates(text).into_iter().filter_map(move |candidate| {
                serde_json::from_str::<Value>(candidate)
                    .ok()
                    .map(|value| (value, *step))
            })
        })
        .collect();

    let first_object = decoded.iter().position(|(value, _)| value.is_object());
    match first_object {
        Some(index) => decoded.into_iter().nth(index),
        None => decoded.into_iter().next(),
    }
}

/// Extract the body of the first markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_fences(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let start = trimmed.find("```")?;
    let after_fence = &trimmed[start + 3..];
    // Skip optional language identifier (e.g., "json")
    let content_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
    let content = &after_fence[content_start..];
    let body = match content.find("```") {
        Some(end) => &content[..end],
        // Unterminated fence: take the rest
        None => content,
    };
    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

fn closer(open: char) -> char {
    if open == '[' {
        ']'
    } else {
        '}'
    }
}

/// Slice from the first `open` (`{` or `[`) to the last matching closer.
pub fn outer_span(text: &str, open: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(closer(open))?;
    (end > start).then(|| &text[start..=end])
}

/// Slice from the first `open` (`{` or `[`) to the closer that balances it,
/// ignoring brackets inside string literals.
pub fn balanced_span(text: &str, open: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
