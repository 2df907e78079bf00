//! Word tokenization shared by full-text and phrase matching.
//!
//! Rules:
//! - lowercase (Unicode-aware)
//! - any character that is not alphanumeric separates words
//! - empty pieces are dropped
//!
//! The same rules apply to indexed document text and to query strings, so a
//! query word always compares against words produced the same way.

use serde_json::Value as JsonValue;

/// Split `input` into lowercase words.
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|piece| !piece.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Collect the searchable texts of a JSON document.
///
/// Only values are searchable: strings and numbers, at any depth. Object keys,
/// booleans and nulls are never indexed. Each value is a separate text, so
/// phrases never span two values.
pub fn indexed_texts(value: &JsonValue) -> Vec<String> {
    let mut out = Vec::new();
    collect_texts(value, &mut out);
    out
}

fn collect_texts(value: &JsonValue, out: &mut Vec<String>) {
    match value {
        JsonValue::String(s) => out.push(s.clone()),
        JsonValue::Number(n) => out.push(n.to_string()),
        JsonValue::Array(items) => items.iter().for_each(|v| collect_texts(v, out)),
        JsonValue::Object(map) => map.values().for_each(|v| collect_texts(v, out)),
        JsonValue::Bool(_) | JsonValue::Null => {}
    }
}
