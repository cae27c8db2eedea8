//! Key-value pairs and the backend's string encodings of them.
//!
//! The backend stores headers and params as opaque strings. Depending on who
//! wrote the interface they hold a JSON object, a JSON array of pair objects,
//! a query string, or `Name: value` lines. [`EncodedPairs`] keeps the two
//! shapes apart and [`EncodedPairs::parse`] turns either into a pair list
//! without ever failing.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Key used for the synthetic entry that carries unparseable raw text.
pub const RAW_ENTRY_KEY: &str = "__raw__";

/// One editable key-value row (param or header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Row key.
    pub key: String,
    /// Row value.
    pub value: String,
    /// Disabled rows stay in the draft but are not sent.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl KeyValue {
    /// Creates a new enabled row.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled row.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(key, value)
        }
    }

    /// Returns true for the synthetic entry produced by a failed parse.
    #[must_use]
    pub fn is_raw_entry(&self) -> bool {
        self.key == RAW_ENTRY_KEY
    }
}

/// How a pair list is written back into a backend string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairEncoding {
    /// `{"k":"v"}`
    #[default]
    JsonObject,
    /// `[{"key":"k","value":"v","enabled":true}]`, disabled rows included
    JsonArray,
    /// `k=v&k2=v2`
    Query,
    /// `K: v` one per line
    HeaderLines,
}

/// Backend pair data, either still raw or already structured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", content = "data", rename_all = "snake_case")]
pub enum EncodedPairs {
    /// The string exactly as the backend stored it.
    Raw(String),
    /// Rows already split into key-value form.
    Structured(Vec<KeyValue>),
}

impl EncodedPairs {
    /// Parses into rows. Never fails: text no rule understands becomes a
    /// single enabled [`RAW_ENTRY_KEY`] row holding the original string.
    #[must_use]
    pub fn parse(&self) -> Vec<KeyValue> {
        match self {
            Self::Structured(pairs) => pairs.clone(),
            Self::Raw(raw) => parse_raw(raw).0,
        }
    }

    /// Detects which encoding a raw string uses, for writing edits back in
    /// the same shape.
    #[must_use]
    pub fn encoding(&self) -> PairEncoding {
        match self {
            Self::Structured(_) => PairEncoding::JsonObject,
            Self::Raw(raw) => parse_raw(raw).1,
        }
    }

    /// Encodes rows into a backend string.
    ///
    /// [`PairEncoding::JsonArray`] keeps every row in order with its
    /// `enabled` flag; the other shapes have no room for a flag and write
    /// enabled rows only. Rows with a blank key are never written.
    #[must_use]
    pub fn encode(pairs: &[KeyValue], encoding: PairEncoding) -> String {
        let enabled: Vec<&KeyValue> = pairs.iter().filter(|p| p.enabled).collect();

        if let [only] = enabled.as_slice()
            && only.is_raw_entry()
        {
            return only.value.clone();
        }

        if encoding == PairEncoding::JsonArray {
            let rows: Vec<Value> = pairs
                .iter()
                .filter(|p| !p.key.trim().is_empty())
                .map(|p| json!({"key": p.key, "value": p.value, "enabled": p.enabled}))
                .collect();
            return if rows.is_empty() {
                String::new()
            } else {
                Value::Array(rows).to_string()
            };
        }

        let rows = enabled.into_iter().filter(|p| !p.key.trim().is_empty());
        match encoding {
            PairEncoding::JsonObject | PairEncoding::JsonArray => {
                let map: serde_json::Map<String, Value> = rows
                    .map(|p| (p.key.clone(), Value::String(p.value.clone())))
                    .collect();
                if map.is_empty() {
                    String::new()
                } else {
                    Value::Object(map).to_string()
                }
            }
            PairEncoding::Query => {
                let tuples: Vec<(&str, &str)> =
                    rows.map(|p| (p.key.as_str(), p.value.as_str())).collect();
                serde_urlencoded::to_string(tuples).unwrap_or_default()
            }
            PairEncoding::HeaderLines => rows
                .map(|p| format!("{}: {}", p.key, p.value))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn parse_raw(raw: &str) -> (Vec<KeyValue>, PairEncoding) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (Vec::new(), PairEncoding::default());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(pairs) = pairs_from_json(&value) {
            let encoding = if value.is_array() {
                PairEncoding::JsonArray
            } else {
                PairEncoding::JsonObject
            };
            return (pairs, encoding);
        }
        return (vec![raw_entry(raw)], PairEncoding::JsonObject);
    }

    if let Some(pairs) = pairs_from_header_lines(trimmed) {
        return (pairs, PairEncoding::HeaderLines);
    }

    if let Some(pairs) = pairs_from_query(trimmed) {
        return (pairs, PairEncoding::Query);
    }

    (vec![raw_entry(raw)], PairEncoding::JsonObject)
}

fn raw_entry(raw: &str) -> KeyValue {
    KeyValue::new(RAW_ENTRY_KEY, raw)
}

fn json_scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn pairs_from_json(value: &Value) -> Option<Vec<KeyValue>> {
    match value {
        Value::Object(map) => Some(
            map.iter()
                .map(|(k, v)| KeyValue::new(k.clone(), json_scalar_text(v)))
                .collect(),
        ),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let obj = item.as_object()?;
                let key = obj.get("key").or_else(|| obj.get("name"))?;
                let value = obj.get("value").map(json_scalar_text).unwrap_or_default();
                let enabled = obj
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                Some(KeyValue {
                    key: json_scalar_text(key),
                    value,
                    enabled,
                })
            })
            .collect(),
        _ => None,
    }
}

fn pairs_from_header_lines(text: &str) -> Option<Vec<KeyValue>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            let valid_name = !name.is_empty()
                && !name.contains(|c: char| c.is_whitespace() || c == '=' || c == '&');
            valid_name.then(|| KeyValue::new(name, value.trim()))
        })
        .collect()
}

fn pairs_from_query(text: &str) -> Option<Vec<KeyValue>> {
    if !text.contains('=') || text.contains('\n') {
        return None;
    }
    let tuples: Vec<(String, String)> = serde_urlencoded::from_str(text).ok()?;
    if tuples.is_empty() || tuples.iter().any(|(k, _)| k.is_empty()) {
        return None;
    }
    Some(tuples.into_iter().map(|(k, v)| KeyValue::new(k, v)).collect())
}
