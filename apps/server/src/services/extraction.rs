//! Result extraction from analyzer output.
//!
//! The analyzer's streams mix progress logs, warnings and the actual result.
//! Recovery is attempted in order:
//!
//! 1. the hand-off result file, when the analyzer wrote one;
//! 2. the first `<JSON_START>` ... `<JSON_END>` block in stdout + stderr;
//! 3. the last brace-balanced `{...}` span in stdout + stderr.
//!
//! Only JSON objects count as a result. When nothing parses, the caller gets
//! [`ExtractionDiagnostics`] describing what the output looked like.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::analyzer::AnalyzerOutput;

pub const JSON_START_MARKER: &str = "<JSON_START>";
pub const JSON_END_MARKER: &str = "<JSON_END>";

/// Characters of each stream kept in diagnostics previews.
const PREVIEW_CHARS: usize = 1000;

static DELIMITED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<JSON_START>(.*?)<JSON_END>").expect("delimited block pattern is valid")
});

static GREEDY_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("greedy object pattern is valid"));

/// Which tier produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    ResultFile,
    DelimitedBlock,
    TrailingObject,
}

/// A recovered analyzer result.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub result: Value,
    pub source: ExtractionSource,
    /// Number of individual errors the result enumerates, if it lists them.
    pub error_count: Option<usize>,
}

/// Why extraction failed, detailed enough to debug without re-running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ExtractionDiagnostics {
    pub stdout_length: usize,
    pub stderr_length: usize,
    pub stdout_preview: String,
    pub stderr_preview: String,
    pub has_json_start: bool,
    pub has_json_end: bool,
    pub output_length: usize,
    /// Parse errors from each tier that found a candidate.
    pub parse_errors: Vec<String>,
}

/// Extract the result from a finished invocation.
pub fn extract(output: &AnalyzerOutput) -> Result<Extraction, ExtractionDiagnostics> {
    extract_from_streams(output.result_file.as_deref(), &output.stdout, &output.stderr)
}

/// Extract the result from the hand-off file contents and the two streams.
pub fn extract_from_streams(
    result_file: Option<&str>,
    stdout: &str,
    stderr: &str,
) -> Result<Extraction, ExtractionDiagnostics> {
    let mut parse_errors = Vec::new();

    if let Some(contents) = result_file.filter(|c| !c.trim().is_empty()) {
        match parse_object(contents.trim()) {
            Ok(result) => return Ok(found(result, ExtractionSource::ResultFile)),
            Err(e) => {
                warn!("Result file is not a JSON object: {}", e);
                parse_errors.push(format!("result file: {}", e));
            }
        }
    }

    let combined = format!("{}{}", stdout, stderr);

    if let Some(block) = DELIMITED_BLOCK.captures(&combined).and_then(|c| c.get(1)) {
        let candidate = block.as_str().trim();
        debug!(
            length = candidate.len(),
            preview = %preview(candidate, 200),
            "Found delimited JSON block"
        );
        match parse_object(candidate) {
            Ok(result) => return Ok(found(result, ExtractionSource::DelimitedBlock)),
            Err(e) => {
                warn!(
                    preview = %preview(candidate, 500),
                    "Delimited JSON block did not parse: {}",
                    e
                );
                parse_errors.push(format!("delimited block: {}", e));
            }
        }
    }

    if let Some(candidate) = trailing_object(&combined) {
        match parse_object(candidate) {
            Ok(result) => {
                info!("Extracted JSON without delimiters (last object in output)");
                return Ok(found(result, ExtractionSource::TrailingObject));
            }
            Err(e) => {
                warn!("Trailing JSON object did not parse: {}", e);
                parse_errors.push(format!("trailing object: {}", e));
            }
        }
    }

    Err(ExtractionDiagnostics {
        stdout_length: stdout.chars().count(),
        stderr_length: stderr.chars().count(),
        stdout_preview: preview(stdout, PREVIEW_CHARS).to_string(),
        stderr_preview: preview(stderr, PREVIEW_CHARS).to_string(),
        has_json_start: combined.contains(JSON_START_MARKER),
        has_json_end: combined.contains(JSON_END_MARKER),
        output_length: combined.chars().count(),
        parse_errors,
    })
}

fn found(result: Value, source: ExtractionSource) -> Extraction {
    let error_count = count_errors(&result);
    if let Some(count) = error_count {
        info!(source = ?source, "Analyzer result lists {} error(s)", count);
    }
    Extraction {
        result,
        source,
        error_count,
    }
}

/// Parse text as a JSON object; other JSON values are rejected.
fn parse_object(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(Value::Object(map)),
        Ok(other) => Err(format!("expected a JSON object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Number of errors enumerated by a result, looked up at
/// `metadata.all_errors`, `all_errors`, then `errors`.
pub fn count_errors(result: &Value) -> Option<usize> {
    let object: &Map<String, Value> = result.as_object()?;
    object
        .get("metadata")
        .and_then(|m| m.get("all_errors"))
        .or_else(|| object.get("all_errors"))
        .or_else(|| object.get("errors"))
        .and_then(Value::as_array)
        .map(Vec::len)
}

/// Select the last maximal brace-balanced span of `text`.
///
/// Falls back to the greedy first-`{`-to-last-`}` span when braces never
/// balance (e.g. an unterminated object earlier in the output).
fn trailing_object(text: &str) -> Option<&str> {
    match last_balanced_span(text) {
        Some((start, end)) => Some(&text[start..end]),
        None => GREEDY_OBJECT.find(text).map(|m| m.as_str()),
    }
}

/// Byte range of the last maximal brace-balanced span, in one pass.
///
/// Braces inside JSON strings are ignored. A string ends at a newline even
/// without a closing quote, so a stray `"` cannot hide the rest of the output.
/// Opening braces that never close are left on the stack and ignored.
fn last_balanced_span(text: &str) -> Option<(usize, usize)> {
    let mut open: Vec<usize> = Vec::new();
    let mut last = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' || byte == b'\n' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                // Each close ends after every span recorded so far, so the
                // newest pair either encloses or follows the previous one.
                if let Some(start) = open.pop() {
                    last = Some((start, i + 1));
                }
            }
            _ => {}
        }
    }

    last
}

/// First `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
