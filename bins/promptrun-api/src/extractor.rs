/// Code Extractor - recovers runnable source from an LLM reply
///
/// Model output formatting is not reliable even with strict instructions, so
/// extraction is an ordered list of strategies. Each is a pure function from
/// reply text to an optional source string; the first one that yields
/// non-empty source wins:
///
/// 1. `structured_json` - the `code` field of a JSON reply (structured mode only)
/// 2. `fenced_block`    - interior of the first ``` fence
/// 3. `leading_source`  - reply already starts like a source file
/// 4. `raw_reply`       - the trimmed reply, as a last resort
///
/// A structured reply is a JSON object with a `code` key. When that object is
/// the whole reply or the whole fenced interior and its `code` is blank or not
/// text, the reply is rejected outright instead of falling through.

use promptrun_common::languages::{LanguageProfile, PromptMode};
use serde_json::{Map, Value};
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("reply contained no code")]
    NoCode,

    #[error("structured reply had no usable code field")]
    EmptyStructuredCode,
}

/// Per-language inputs the strategies need
#[derive(Debug, Clone, Copy)]
pub struct ExtractionHints<'a> {
    pub mode: PromptMode,
    pub leading_hints: &'a [String],
}

impl<'a> From<&'a LanguageProfile> for ExtractionHints<'a> {
    fn from(profile: &'a LanguageProfile) -> Self {
        Self {
            mode: profile.mode,
            leading_hints: &profile.leading_hints,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub code: String,
    /// Name of the strategy that produced `code`
    pub strategy: &'static str,
}

type Strategy = fn(&str, &ExtractionHints) -> Option<String>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("structured_json", structured_json),
    ("fenced_block", fenced_block),
    ("leading_source", leading_source),
    ("raw_reply", raw_reply),
];

/// Where a structured object was found in the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Whole,
    Fenced,
    /// On its own lines after some prose
    Embedded,
}

pub fn extract(raw: &str, hints: &ExtractionHints) -> Result<Extracted, ExtractionError> {
    if hints.mode == PromptMode::Structured {
        if let Some((placement, object)) = find_structured(raw) {
            if placement != Placement::Embedded && structured_code(&object).is_none() {
                return Err(ExtractionError::EmptyStructuredCode);
            }
        }
    }

    STRATEGIES
        .iter()
        .find_map(|&(name, strategy)| {
            strategy(raw, hints).map(|code| Extracted {
                code,
                strategy: name,
            })
        })
        .ok_or(ExtractionError::NoCode)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First `{` that opens a line through the last `}` that closes one
fn embedded_object(raw: &str) -> Option<&str> {
    let start = raw
        .match_indices('{')
        .map(|(i, _)| i)
        .find(|&i| raw[..i].rsplit('\n').next().unwrap_or("").trim().is_empty())?;
    let end = raw
        .rmatch_indices('}')
        .map(|(i, _)| i)
        .find(|&i| raw[i + 1..].split('\n').next().unwrap_or("").trim().is_empty())?;
    (start < end).then(|| &raw[start..=end])
}

/// Try the whole reply, then a fenced interior, then an object on its own lines
fn find_structured(raw: &str) -> Option<(Placement, Map<String, Value>)> {
    let trimmed = raw.trim();

    [
        (Placement::Whole, Some(trimmed)),
        (Placement::Fenced, fenced_interior(trimmed)),
        (Placement::Embedded, embedded_object(trimmed)),
    ]
    .into_iter()
    .find_map(|(placement, candidate)| {
        let value: Value = serde_json::from_str(candidate?.trim()).ok()?;
        match value {
            // a dict literal without `code` is source, not a structured reply
            Value::Object(object) if object.contains_key("code") => Some((placement, object)),
            _ => None,
        }
    })
}

/// `code` as text; an array of lines is joined
fn structured_code(object: &Map<String, Value>) -> Option<String> {
    let code = match object.get("code")? {
        Value::String(s) => s.clone(),
        Value::Array(lines) => lines
            .iter()
            .map(|line| line.as_str())
            .collect::<Option<Vec<_>>>()?
            .join("\n"),
        _ => return None,
    };
    non_empty(&code)
}

fn structured_json(raw: &str, hints: &ExtractionHints) -> Option<String> {
    if hints.mode != PromptMode::Structured {
        return None;
    }
    let (_, object) = find_structured(raw)?;
    structured_code(&object)
}

/// Interior of the first fence. The opening line may carry a language tag;
/// an unterminated fence runs to the end of the reply.
fn fenced_interior(raw: &str) -> Option<&str> {
    let start = raw.find(FENCE)?;
    let after = &raw[start + FENCE.len()..];

    let body = match after.find('\n') {
        Some(newline) => {
            let tag_line = &after[..newline];
            if let Some(end) = tag_line.find(FENCE) {
                return Some(&tag_line[..end]);
            }
            &after[newline + 1..]
        }
        None => after,
    };

    let end = body.find(FENCE).unwrap_or(body.len());
    Some(&body[..end])
}

fn fenced_block(raw: &str, _hints: &ExtractionHints) -> Option<String> {
    fenced_interior(raw).and_then(non_empty)
}

fn leading_source(raw: &str, hints: &ExtractionHints) -> Option<String> {
    let trimmed = raw.trim_start();
    hints
        .leading_hints
        .iter()
        .any(|hint| trimmed.starts_with(hint.as_str()))
        .then(|| trimmed.trim_end().to_string())
}

fn raw_reply(raw: &str, _hints: &ExtractionHints) -> Option<String> {
    non_empty(raw)
}
