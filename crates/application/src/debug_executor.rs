//! Debug executor
//!
//! Drives one submit/poll cycle against the debug backend. Every poll produces
//! a [`ResponseSnapshot`] handed to the caller immediately, so a UI can show
//! the latest known state while the job is still running. The loop is bounded
//! by `max_attempts`; running out of attempts is reported as a degraded
//! success (`converged == false`) rather than an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sosodesk_domain::{DebugPayload, InterfaceDefinition, ResponseSnapshot, reason_phrase};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationReceiver;
use crate::error::BackendError;
use crate::ports::{Clock, DebugService, PlanContext, PollResponse};

/// Default wait between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1200);

/// Default poll budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 18;

/// Errors from one debug run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DebugError {
    /// The submit failed or returned no job id.
    #[error("debug submission failed: {0}")]
    Submission(String),

    /// No poll ever produced a snapshot.
    #[error("debug run produced no result")]
    NoResult,

    /// A poll call failed.
    #[error("debug poll failed: {0}")]
    Poll(#[from] BackendError),

    /// The run was cancelled. Not a failure from the user's point of view.
    #[error("debug run cancelled")]
    Cancelled,
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct DebugOptions {
    /// Wait between polls.
    pub poll_interval: Duration,
    /// Poll budget.
    pub max_attempts: u32,
    /// Cancellation observed before each poll and during waits.
    pub cancel: CancellationReceiver,
}

impl DebugOptions {
    /// Default interval and budget with the given cancellation.
    #[must_use]
    pub fn new(cancel: CancellationReceiver) -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cancel,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides the poll budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Result of a run that was not cancelled and did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugOutcome {
    /// Final snapshot, console log included.
    pub snapshot: ResponseSnapshot,
    /// Polls performed.
    pub attempts: u32,
    /// True if the backend reported completion.
    pub converged: bool,
}

/// Runs debug jobs through a [`DebugService`].
pub struct DebugExecutor {
    service: Arc<dyn DebugService>,
    clock: Arc<dyn Clock>,
}

impl DebugExecutor {
    /// Creates an executor.
    pub fn new(service: Arc<dyn DebugService>, clock: Arc<dyn Clock>) -> Self {
        Self { service, clock }
    }

    /// Submits `definition` and polls until it finishes, the budget runs out,
    /// or `options.cancel` fires.
    ///
    /// `on_snapshot` is called once per poll, including the final one.
    ///
    /// # Errors
    ///
    /// - `DebugError::Submission` if the submit fails or yields no job id
    /// - `DebugError::Poll` if a poll call fails
    /// - `DebugError::Cancelled` if cancelled before finishing
    /// - `DebugError::NoResult` if no poll happened at all
    pub async fn execute_debug<F>(
        &self,
        definition: &InterfaceDefinition,
        request_id: i64,
        plan: &PlanContext,
        options: DebugOptions,
        mut on_snapshot: F,
    ) -> Result<DebugOutcome, DebugError>
    where
        F: FnMut(&ResponseSnapshot),
    {
        let DebugOptions {
            poll_interval,
            max_attempts,
            mut cancel,
        } = options;
        let started_at = self.clock.now();

        if cancel.is_cancelled() {
            return Err(DebugError::Cancelled);
        }

        let submitted = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DebugError::Cancelled),
            result = self.service.submit(definition, plan) => result,
        };
        let job = match submitted {
            Ok(Some(job)) if !job.0.trim().is_empty() => job,
            Ok(_) => {
                return Err(DebugError::Submission(
                    "backend returned no debug id".to_string(),
                ));
            }
            Err(e) => return Err(DebugError::Submission(e.to_string())),
        };
        info!(
            run_id = %plan.run_id,
            request_id,
            job = %job,
            environment = %plan.environment_key,
            "debug job submitted"
        );

        let mut console = vec![format!(
            "[submit] interface {request_id} queued as debug job {job} on {}",
            plan.environment_key
        )];
        let mut last: Option<(ResponseSnapshot, i64)> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                debug!(run_id = %plan.run_id, attempt, "debug run cancelled before poll");
                return Err(DebugError::Cancelled);
            }

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DebugError::Cancelled),
                result = self.service.poll(&job) => result?,
            };
            debug!(run_id = %plan.run_id, attempt, code = response.code, "debug poll");

            console.push(format!(
                "[poll {attempt}/{max_attempts}] code={} {}",
                response.code, response.message
            ));
            let snapshot = build_snapshot(&response, started_at, self.clock.now(), &console);
            on_snapshot(&snapshot);

            if response.is_finished() {
                if let Some(result) = &response.result {
                    let payload = serde_json::to_string_pretty(&result.payload)
                        .unwrap_or_else(|_| result.payload.to_string());
                    console.push(format!("[result] {payload}"));
                }
                let mut snapshot = snapshot;
                snapshot.console.clone_from(&console);
                return Ok(DebugOutcome {
                    snapshot,
                    attempts: attempt,
                    converged: true,
                });
            }
            last = Some((snapshot, response.code));

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(run_id = %plan.run_id, attempt, "debug wait interrupted");
                        return Err(DebugError::Cancelled);
                    }
                    () = tokio::time::sleep(poll_interval) => {}
                }
            }
        }

        let Some((mut snapshot, last_code)) = last else {
            return Err(DebugError::NoResult);
        };
        warn!(
            run_id = %plan.run_id,
            attempts = max_attempts,
            last_code,
            "debug job did not finish within the poll budget"
        );
        console.push(format!(
            "[warn] no final result after {max_attempts} attempts (last status code {last_code})"
        ));
        snapshot.console = console;
        Ok(DebugOutcome {
            snapshot,
            attempts: max_attempts,
            converged: false,
        })
    }
}

fn build_snapshot(
    response: &PollResponse,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    console: &[String],
) -> ResponseSnapshot {
    let elapsed = u64::try_from((now - started_at).num_milliseconds()).unwrap_or_default();
    let result = response.result.as_ref();

    let status = result.and_then(|r| r.status_code).unwrap_or_default();
    let status_text = match status {
        0 => response.message.clone(),
        code => reason_phrase(code).to_string(),
    };
    let body = result
        .and_then(|r| r.display_body())
        .unwrap_or_default()
        .to_string();

    ResponseSnapshot {
        status,
        status_text,
        duration_ms: result.and_then(|r| r.duration_ms).unwrap_or(elapsed),
        size_bytes: body.len() as u64,
        headers: result.map(|r| r.headers.clone()).unwrap_or_default(),
        body,
        console: console.to_vec(),
        started_at,
        finished_at: now,
        debug: Some(DebugPayload {
            backend_code: response.code,
            message: response.message.clone(),
            assert_result: result.and_then(|r| r.assert_result.clone()),
            vars_pre: result.and_then(|r| r.vars_pre.clone()),
            vars_post: result.and_then(|r| r.vars_post.clone()),
            timing: result.map(|r| r.timing.clone()).unwrap_or_default(),
        }),
    }
}
