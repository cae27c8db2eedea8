//! Client-side editable request form.

use serde::{Deserialize, Serialize};

use super::{HttpMethod, KeyValue};

/// A named test snippet attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSnippet {
    /// Snippet label.
    pub name: String,
    /// Snippet source.
    pub code: String,
}

/// Editable, normalized form of an interface definition.
///
/// Params and headers are ordered row lists so the editor can keep disabled
/// rows around. Two drafts are "the same" when their [`signature`]s match.
///
/// [`signature`]: RequestDraft::signature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDraft {
    /// Display name.
    pub name: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path or absolute URL.
    pub url: String,
    /// Query/form params.
    #[serde(default)]
    pub params: Vec<KeyValue>,
    /// Request headers.
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    /// Body text.
    #[serde(default)]
    pub body: String,
    /// Backend body type tag (`json`, `form`, `raw`, ...).
    #[serde(default)]
    pub body_type: String,
    /// Script run before the request.
    #[serde(default)]
    pub pre_script: String,
    /// Script run after the request.
    #[serde(default)]
    pub post_script: String,
    /// Local test snippets.
    #[serde(default)]
    pub tests: Vec<TestSnippet>,
}

impl RequestDraft {
    /// Creates a draft with a name, method and url.
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Serialized form used for dirty tracking.
    ///
    /// Field order is fixed by the struct definition, so equal drafts always
    /// produce equal signatures.
    #[must_use]
    pub fn signature(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
