//! Adapter around the extraction service: prompt construction, response
//! validation and a tolerant repair pass for near-JSON output.

use crate::domain::model::{ExtractedField, ExtractedFields};
use crate::domain::ports::LlmClient;
use crate::utils::error::ExtractionError;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an expert data extractor. Only return valid JSON. \
Do not include any explanation, markdown, or extra text.";

const PROMPT_HEADER: &str = "Extract the following information from this profile text (if available):
  - Where they work (including if they are a broker)
  - Their job role
  - The company's page on the source platform
  - The company's website
  - The person's following/friends amount (QTY)
  - The company's following amount (QTY)
  - Their LinkedIn profile
  - Their personal profile URL
  - The company's name
  - Entity type (Australian Pvt Company or other)
  - ABN status
  - Marital status (e.g. married, single, in a relationship, etc.)
  - Who they are married to (if available)";

pub struct FieldExtractor {
    client: Arc<dyn LlmClient>,
}

impl FieldExtractor {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn build_prompt(text: &str) -> String {
        let keys = ExtractedField::ALL
            .iter()
            .map(|f| f.key())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}\nReturn as a JSON object with these fields: {}.\n\nProfile text:\n{}",
            PROMPT_HEADER, keys, text
        )
    }

    /// One outbound call, no retries. Failures are returned to the caller, which
    /// decides whether the record can continue.
    pub async fn extract(&self, text: &str) -> Result<ExtractedFields, ExtractionError> {
        let prompt = Self::build_prompt(text);
        tracing::debug!(model = self.client.model_name(), "Sending extraction prompt:\n{}", prompt);

        let raw = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        tracing::debug!("Extraction raw response:\n{}", raw);

        parse_response(&raw)
    }
}

pub fn parse_response(raw: &str) -> Result<ExtractedFields, ExtractionError> {
    if let Some(fields) = parse_object(raw.trim()) {
        return Ok(fields);
    }

    if let Some(repaired) = repair_json(raw) {
        tracing::debug!("Trying repaired extraction payload:\n{}", repaired);
        if let Some(fields) = parse_object(&repaired) {
            return Ok(fields);
        }
    }

    Err(ExtractionError::MalformedResponse {
        raw_text: raw.to_string(),
    })
}

fn parse_object(candidate: &str) -> Option<ExtractedFields> {
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let object = match value {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Array(items) => match items.into_iter().next() {
            Some(serde_json::Value::Object(map)) => map,
            _ => return None,
        },
        _ => return None,
    };
    Some(fields_from_object(&object))
}

fn fields_from_object(object: &serde_json::Map<String, serde_json::Value>) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    for field in ExtractedField::ALL {
        let value = std::iter::once(field.key())
            .chain(field.aliases().iter().copied())
            .find_map(|key| {
                object.get(key).or_else(|| {
                    object
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(key))
                        .map(|(_, v)| v)
                })
            });
        if let Some(value) = value {
            fields.set(field, value_to_string(value));
        }
    }
    fields
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Object(_) => value.to_string(),
    }
}

/// Best-effort rewrite of near-JSON into JSON. Returns `None` when there is no
/// object to salvage at all.
pub fn repair_json(raw: &str) -> Option<String> {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = stripped.find('{')?;
    let body = match stripped.rfind('}') {
        Some(end) if end > start => &stripped[start..=end],
        _ => &stripped[start..],
    };

    let repaired = if body.contains('"') {
        body.to_string()
    } else {
        body.replace('\'', "\"")
    };
    Some(close_unbalanced(&normalize_tokens(&repaired)))
}

/// Tracks whether a scan is inside a JSON string literal.
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Feeds one character; returns true while the character belongs to a string
    /// (opening and closing quotes included).
    fn step(&mut self, c: char) -> bool {
        if self.in_string {
            match c {
                _ if self.escaped => self.escaped = false,
                '\\' => self.escaped = true,
                '"' => self.in_string = false,
                _ => {}
            }
            return true;
        }
        if c == '"' {
            self.in_string = true;
            return true;
        }
        false
    }
}

fn is_key_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Quotes bare object keys and drops commas directly before a closing bracket.
/// String literals pass through untouched.
fn normalize_tokens(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut state = StringState::default();
    let next_significant = |from: usize| chars[from..].iter().copied().find(|c| !c.is_whitespace());

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if state.step(c) {
            out.push(c);
            i += 1;
            continue;
        }
        match c {
            ',' if matches!(next_significant(i + 1), Some('}' | ']')) => {}
            c if is_key_start(c) && matches!(out.trim_end().chars().last(), Some('{' | ',')) => {
                let end = chars[i..]
                    .iter()
                    .position(|c| !is_key_char(*c))
                    .map_or(chars.len(), |p| i + p);
                let word: String = chars[i..end].iter().collect();
                if next_significant(end) == Some(':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
                i = end;
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Finishes a truncated payload. An unterminated string value is closed; a
/// trailing key with no value is dropped; then the open brackets are closed.
fn close_unbalanced(input: &str) -> String {
    let mut stack = Vec::new();
    let mut state = StringState::default();
    let mut awaiting_value = false;
    // Byte offset of an object key whose value has not started yet.
    let mut dangling_key: Option<usize> = None;

    for (i, c) in input.char_indices() {
        let was_in_string = state.in_string;
        if state.step(c) {
            if !was_in_string {
                if awaiting_value {
                    dangling_key = None;
                } else if stack.last() == Some(&'}') {
                    dangling_key = Some(i);
                }
            }
            continue;
        }
        if c.is_whitespace() {
            continue;
        }
        if awaiting_value && c != ':' {
            dangling_key = None;
        }
        match c {
            ':' => awaiting_value = true,
            ',' => awaiting_value = false,
            '{' => {
                stack.push('}');
                awaiting_value = false;
            }
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = match dangling_key {
        Some(start) => input[..start].to_string(),
        None => {
            let mut out = input.to_string();
            if state.in_string {
                if state.escaped {
                    out.pop();
                }
                out.push('"');
            }
            out
        }
    };
    out.truncate(out.trim_end().len());
    if out.ends_with(',') {
        out.pop();
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}
