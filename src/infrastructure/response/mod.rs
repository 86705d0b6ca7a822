use crate::domain::generation::{DraftRecord, FallbackReason};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static INTERNAL_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<internal>[\s\S]*?</internal>").unwrap());

/// Keys of each object in the JSON array the instruction asks for.
/// The prompt builder renders exactly these.
pub const DRAFT_KEYS: [&str; 6] = [
    "title",
    "preconditions",
    "test_steps",
    "data_for_steps",
    "expected_results",
    "tags",
];

/// Removes reasoning blocks some local models emit before their answer.
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = THINK_TAG_PATTERN.replace_all(response, "");
    let cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "");
    let cleaned = INTERNAL_TAG_PATTERN.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Slice from the first `[` to the last `]`, if both exist in that order.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Full response-text path shared by every backend: clean, locate, decode.
pub fn parse_draft_records(response: &str) -> Result<Vec<DraftRecord>, FallbackReason> {
    let cleaned = clean_llm_response(response);
    let payload = extract_json_array(&cleaned).ok_or(FallbackReason::NoJsonArray)?;
    let items: Vec<Value> =
        serde_json::from_str(payload).map_err(|e| FallbackReason::Decode(e.to_string()))?;

    let drafts: Vec<DraftRecord> = items
        .iter()
        .filter_map(Value::as_object)
        .map(draft_from_object)
        .collect();

    if drafts.is_empty() {
        return Err(FallbackReason::NoRecords);
    }
    Ok(drafts)
}

fn draft_from_object(object: &Map<String, Value>) -> DraftRecord {
    let [title, preconditions, steps, test_data, expected_results, tags] = DRAFT_KEYS;
    DraftRecord {
        title: text_field(object, title, LINE_SEPARATOR),
        preconditions: text_field(object, preconditions, LINE_SEPARATOR),
        steps: text_field(object, steps, LINE_SEPARATOR),
        test_data: text_field(object, test_data, LINE_SEPARATOR),
        expected_results: text_field(object, expected_results, LINE_SEPARATOR),
        tags: text_field(object, tags, TAG_SEPARATOR),
    }
}

const LINE_SEPARATOR: &str = "\n";
const TAG_SEPARATOR: &str = ", ";

fn text_field(object: &Map<String, Value>, key: &str, separator: &str) -> String {
    object
        .get(key)
        .map(|value| value_to_text(value, separator))
        .unwrap_or_default()
}

/// Lists (steps, tags) are joined with `separator`.
fn value_to_text(value: &Value, separator: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| value_to_text(item, separator))
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(separator),
        Value::Object(_) => value.to_string(),
    }
}
