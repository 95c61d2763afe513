//! Best-effort JSON extraction from free-text model responses.
//!
//! Models are asked for "JSON only" but routinely wrap it in code fences,
//! prepend commentary, or get truncated. [`extract`] runs an ordered list of
//! increasingly lenient parsers over the text and returns the first JSON
//! object any of them recovers. [`decode`] adds a typed step on top, turning
//! that object into a named record.
//!
//! Every function here is pure and total: it never panics, never blocks,
//! and reports failure as a value carrying the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A JSON object recovered from a response.
pub type JsonObject = Map<String, Value>;

/// A pure parser tried by [`first_success`].
pub type Parser<T> = fn(&str) -> Option<T>;

/// Number of trailing lines scanned by the last-resort parser.
const TAIL_LINES: usize = 10;

/// Fenced block, with or without a `json` language tag.
static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok());

/// Object with balanced braces, nested up to three levels.
static BALANCED_OBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\{(?:[^{}]|\{(?:[^{}]|\{[^{}]*\})*\})*\}").ok()
});

/// Flat object containing at least one quoted string.
static MINIMAL_OBJECT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?s)\{[^}]*"[^"]*"[^}]*\}"#).ok());

/// The extraction chain, in the order the strategies are attempted.
const STRATEGIES: &[(&str, Parser<JsonObject>)] = &[
    ("fenced_block", from_fenced_block),
    ("balanced_object", from_balanced_object),
    ("whole_text", from_whole_text),
    ("trailing_line", from_trailing_line),
    ("tail_fragment", from_tail_fragment),
];

/// No JSON object could be recovered from a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no JSON object found in response ({} bytes)", .raw_content.len())]
pub struct ExtractionFailure {
    /// The response text exactly as received.
    pub raw_content: String,
}

impl ExtractionFailure {
    fn new(text: &str) -> Self {
        Self {
            raw_content: text.to_string(),
        }
    }
}

/// Runs `parsers` in order and returns the first value produced, tagged
/// with the name of the parser that produced it.
pub fn first_success<T>(
    input: &str,
    parsers: &[(&'static str, Parser<T>)],
) -> Option<(&'static str, T)> {
    parsers
        .iter()
        .find_map(|(name, parse)| parse(input).map(|value| (*name, value)))
}

/// Recovers a JSON object from arbitrary response text.
///
/// # Errors
///
/// Returns [`ExtractionFailure`] holding the original text when no strategy
/// yields an object.
pub fn extract(text: &str) -> Result<JsonObject, ExtractionFailure> {
    extract_tagged(text).map(|(_, object)| object)
}

/// Like [`extract`], but also reports which strategy succeeded.
///
/// # Errors
///
/// Returns [`ExtractionFailure`] when no strategy yields an object.
pub fn extract_tagged(text: &str) -> Result<(&'static str, JsonObject), ExtractionFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionFailure::new(text));
    }
    first_success(trimmed, STRATEGIES).ok_or_else(|| ExtractionFailure::new(text))
}

/// Extracts a JSON object and decodes it into `T`.
///
/// # Errors
///
/// Returns [`ExtractionFailure`] if no object is found or the object does
/// not match the shape of `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionFailure> {
    let object = extract(text)?;
    serde_json::from_value(Value::Object(object)).map_err(|_| ExtractionFailure::new(text))
}

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn from_fenced_block(text: &str) -> Option<JsonObject> {
    FENCED_BLOCK
        .as_ref()?
        .captures_iter(text)
        .find_map(|caps| caps.get(1).and_then(|m| parse_object(m.as_str())))
}

fn from_balanced_object(text: &str) -> Option<JsonObject> {
    BALANCED_OBJECT
        .as_ref()?
        .find_iter(text)
        .find_map(|m| parse_object(m.as_str()))
}

fn from_whole_text(text: &str) -> Option<JsonObject> {
    parse_object(text)
}

fn from_trailing_line(text: &str) -> Option<JsonObject> {
    text.lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .find_map(parse_object)
}

fn from_tail_fragment(text: &str) -> Option<JsonObject> {
    let lines: Vec<&str> = text.lines().collect();
    let tail = lines[lines.len().saturating_sub(TAIL_LINES)..].join("\n");
    MINIMAL_OBJECT
        .as_ref()?
        .find_iter(&tail)
        .find_map(|m| parse_object(m.as_str()))
}
