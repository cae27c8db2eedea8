//! Remote interface definitions and the adapters between them and drafts.
//!
//! [`InterfaceDefinition`] mirrors what the backend stores. [`to_draft`]
//! normalizes it for editing and [`apply_draft`] merges an edited draft back
//! onto the cached definition. Only keys in [`SAVE_ALLOW_LIST`] are ever sent
//! on save.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::{EncodedPairs, HttpMethod, KeyValue, RequestDraft};

/// Backend keys accepted by the save endpoint. Anything else is dropped.
pub const SAVE_ALLOW_LIST: &[&str] = &[
    "id",
    "interfaceCode",
    "title",
    "method",
    "url",
    "uri",
    "headers",
    "params",
    "bodyContent",
    "bodyType",
    "varsPre",
    "varsPost",
    "httpConfKey",
];

/// A backend interface definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDefinition {
    /// Numeric backend id.
    pub id: i64,
    /// Business code of the interface.
    #[serde(default)]
    pub interface_code: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Method as the backend spells it.
    #[serde(default)]
    pub method: String,
    /// Request url or path.
    #[serde(default)]
    pub url: String,
    /// Path part kept separately by some backend versions.
    #[serde(default)]
    pub uri: String,
    /// Raw header blob.
    #[serde(default)]
    pub headers: String,
    /// Raw params blob.
    #[serde(default)]
    pub params: String,
    /// Raw body text.
    #[serde(default)]
    pub body_content: String,
    /// Body type tag.
    #[serde(default)]
    pub body_type: String,
    /// Pre-request script.
    #[serde(default, rename = "varsPre")]
    pub pre_script: String,
    /// Post-request script.
    #[serde(default, rename = "varsPost")]
    pub post_script: String,
    /// Key used to look up environments.
    #[serde(default, rename = "httpConfKey")]
    pub endpoint_key: String,
    /// Every other field the backend returned.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl InterfaceDefinition {
    /// Creates a definition with the fields most tests care about.
    #[must_use]
    pub fn new(id: i64, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Builds the save payload: the serialized definition restricted to
    /// [`SAVE_ALLOW_LIST`].
    #[must_use]
    pub fn save_payload(&self) -> serde_json::Map<String, Value> {
        let Ok(Value::Object(mut map)) = serde_json::to_value(self) else {
            return serde_json::Map::new();
        };
        map.retain(|key, _| SAVE_ALLOW_LIST.contains(&key.as_str()));
        map
    }
}

/// One row of the interface catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSummary {
    /// Numeric backend id.
    pub id: i64,
    /// Business code.
    pub interface_code: String,
    /// Display title.
    pub title: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request url or path.
    pub url: String,
    /// Environment lookup key.
    pub endpoint_key: String,
}

impl InterfaceSummary {
    /// Draft shown while the full definition is still loading.
    #[must_use]
    pub fn placeholder_draft(&self) -> RequestDraft {
        RequestDraft::new(self.title.clone(), self.method, self.url.clone())
    }
}

impl From<&InterfaceDefinition> for InterfaceSummary {
    fn from(definition: &InterfaceDefinition) -> Self {
        Self {
            id: definition.id,
            interface_code: definition.interface_code.clone(),
            title: definition.title.clone(),
            method: HttpMethod::parse_lenient(&definition.method),
            url: definition.url.clone(),
            endpoint_key: definition.endpoint_key.clone(),
        }
    }
}

/// One page of catalog rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfacePage {
    /// Rows on this page.
    pub items: Vec<InterfaceSummary>,
    /// Whether another page follows.
    pub has_more: bool,
}

/// Adapts a definition into an editable draft.
#[must_use]
pub fn to_draft(definition: &InterfaceDefinition) -> RequestDraft {
    RequestDraft {
        name: definition.title.clone(),
        method: HttpMethod::parse_lenient(&definition.method),
        url: definition.url.clone(),
        params: EncodedPairs::Raw(definition.params.clone()).parse(),
        headers: EncodedPairs::Raw(definition.headers.clone()).parse(),
        body: definition.body_content.clone(),
        body_type: definition.body_type.clone(),
        pre_script: definition.pre_script.clone(),
        post_script: definition.post_script.clone(),
        tests: Vec::new(),
    }
}

/// Merges a draft onto a cached definition.
///
/// Fields the draft did not change keep their original backend spelling, so
/// `apply_draft(d, &to_draft(d))` saves exactly what was loaded.
#[must_use]
pub fn apply_draft(definition: &InterfaceDefinition, draft: &RequestDraft) -> InterfaceDefinition {
    let mut merged = definition.clone();
    merged.title.clone_from(&draft.name);
    if HttpMethod::parse_lenient(&definition.method) != draft.method
        || definition.method.trim().is_empty()
    {
        merged.method = draft.method.as_str().to_string();
    }
    merged.url.clone_from(&draft.url);
    merged.headers = reencode(&definition.headers, &draft.headers);
    merged.params = reencode(&definition.params, &draft.params);
    merged.body_content.clone_from(&draft.body);
    merged.body_type.clone_from(&draft.body_type);
    merged.pre_script.clone_from(&draft.pre_script);
    merged.post_script.clone_from(&draft.post_script);
    merged
}

fn reencode(original: &str, rows: &[KeyValue]) -> String {
    let source = EncodedPairs::Raw(original.to_string());
    if source.parse() == rows {
        return original.to_string();
    }
    EncodedPairs::encode(rows, source.encoding())
}
