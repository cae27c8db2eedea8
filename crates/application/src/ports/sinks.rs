//! Outbound notification ports.

use chrono::{DateTime, Utc};
use sosodesk_domain::{ConnectionState, TabId};

/// Receives connection status changes for display.
pub trait ConnectionSink: Send + Sync {
    /// Publishes the new state.
    fn set_state(&self, state: ConnectionState);
}

/// Synchronous yes/no prompt shown before discarding unsaved edits.
pub trait ConfirmationGate {
    /// Returns true if the user agreed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Told about every completed run.
pub trait ExecutionRecorder: Send + Sync {
    /// A run on `tab` finished at `finished_at`.
    fn request_executed(&self, tab: &TabId, finished_at: DateTime<Utc>);
}

/// Sink and recorder that ignore everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ConnectionSink for NoopNotifier {
    fn set_state(&self, _state: ConnectionState) {}
}

impl ExecutionRecorder for NoopNotifier {
    fn request_executed(&self, _tab: &TabId, _finished_at: DateTime<Utc>) {}
}

impl<F> ConfirmationGate for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
