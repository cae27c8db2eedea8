//! Debug service port
//!
//! The backend runs interface calls asynchronously: a submit returns a job id
//! and the result is fetched by polling that id.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use sosodesk_domain::{InterfaceDefinition, ResponseHeader};

use crate::error::BackendResult;

/// Envelope code the backend uses for "finished successfully".
pub const DEBUG_SUCCESS_CODE: i64 = 10000;

/// Identifier of one server-side debug job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebugJobId(pub String);

impl fmt::Display for DebugJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where and how a submitted job should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanContext {
    /// Config key of the chosen environment.
    pub environment_key: String,
    /// Base address of the chosen environment.
    pub request_addr: String,
    /// Client-side run id, for log correlation.
    pub run_id: String,
}

/// Decoded result data returned by a poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugResult {
    /// HTTP status the target returned.
    pub status_code: Option<u16>,
    /// Target response headers.
    pub headers: Vec<ResponseHeader>,
    /// Body as transported.
    pub raw_body: Option<String>,
    /// Body after the backend decoded it. Preferred over `raw_body`.
    pub decoded_body: Option<String>,
    /// Target round trip time.
    pub duration_ms: Option<u64>,
    /// Assertion verdict.
    pub assert_result: Option<String>,
    /// Pre-script variable dump.
    pub vars_pre: Option<Value>,
    /// Post-script variable dump.
    pub vars_post: Option<Value>,
    /// Timing breakdown by phase.
    pub timing: BTreeMap<String, f64>,
    /// The whole decoded payload, for diagnostics.
    pub payload: Value,
}

impl DebugResult {
    /// Body to show: decoded if present, else raw.
    #[must_use]
    pub fn display_body(&self) -> Option<&str> {
        self.decoded_body
            .as_deref()
            .or(self.raw_body.as_deref())
    }
}

/// One poll answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse {
    /// Envelope code; [`DEBUG_SUCCESS_CODE`] once finished.
    pub code: i64,
    /// Envelope message.
    pub message: String,
    /// Result data, if the backend sent any yet.
    pub result: Option<DebugResult>,
}

impl PollResponse {
    /// Returns true if the job finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.code == DEBUG_SUCCESS_CODE
    }
}

/// Backend access to debug jobs.
#[async_trait]
pub trait DebugService: Send + Sync {
    /// Submits a definition for execution.
    ///
    /// Returns `Ok(None)` if the backend accepted the call but handed back
    /// no job id.
    ///
    /// # Errors
    /// Returns an error if the submit call fails.
    async fn submit(
        &self,
        definition: &InterfaceDefinition,
        plan: &PlanContext,
    ) -> BackendResult<Option<DebugJobId>>;

    /// Polls a job.
    ///
    /// # Errors
    /// Returns an error if the poll call fails.
    async fn poll(&self, job: &DebugJobId) -> BackendResult<PollResponse>;
}
