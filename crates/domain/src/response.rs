//! Response snapshots produced by debug runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns the canonical reason phrase for common status codes.
#[must_use]
pub const fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// A response header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl ResponseHeader {
    /// Creates a header line.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Backend-specific debug data attached to a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugPayload {
    /// Status code of the poll envelope (10000 means finished).
    pub backend_code: i64,
    /// Envelope message.
    pub message: String,
    /// Assertion verdict text.
    pub assert_result: Option<String>,
    /// Variables dumped by the pre-script.
    pub vars_pre: Option<Value>,
    /// Variables dumped by the post-script.
    pub vars_post: Option<Value>,
    /// Timing breakdown in milliseconds by phase.
    pub timing: BTreeMap<String, f64>,
}

/// Point-in-time capture of one run attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// HTTP status code (0 while the target has not answered yet).
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Round trip time in milliseconds.
    pub duration_ms: u64,
    /// Body size in bytes.
    pub size_bytes: u64,
    /// Response headers.
    pub headers: Vec<ResponseHeader>,
    /// Body text.
    pub body: String,
    /// Console lines accumulated across the run.
    pub console: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When this snapshot was taken.
    pub finished_at: DateTime<Utc>,
    /// Backend debug payload, when the poll returned one.
    pub debug: Option<DebugPayload>,
}

impl ResponseSnapshot {
    /// Standard snapshot for a failed run, so the response panel always has
    /// something to render.
    #[must_use]
    pub fn error(message: &str, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        let body = serde_json::json!({ "error": message });
        let body = serde_json::to_string_pretty(&body).unwrap_or_else(|_| message.to_string());
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0);
        Self {
            status: 500,
            status_text: reason_phrase(500).to_string(),
            duration_ms: u64::try_from(duration_ms).unwrap_or_default(),
            size_bytes: body.len() as u64,
            headers: Vec::new(),
            body,
            console: vec![format!("[error] {message}")],
            started_at,
            finished_at,
            debug: None,
        }
    }

    /// Returns the backend envelope code, if a debug payload is attached.
    #[must_use]
    pub fn backend_code(&self) -> Option<i64> {
        self.debug.as_ref().map(|d| d.backend_code)
    }

    /// Formats the body size for display.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_display(&self) -> String {
        match self.size_bytes {
            n if n < 1024 => format!("{n} B"),
            n if n < 1024 * 1024 => format!("{:.1} KB", n as f64 / 1024.0),
            n => format!("{:.1} MB", n as f64 / (1024.0 * 1024.0)),
        }
    }
}
