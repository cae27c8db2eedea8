//! Connection sink and execution recorder that write to the log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use sosodesk_application::ports::{ConnectionSink, ExecutionRecorder};
use sosodesk_domain::{ConnectionState, TabId};
use tracing::{info, warn};

/// Logs connection changes and finished runs through `tracing`.
///
/// Repeated reports of the same state are logged once.
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    state: Mutex<ConnectionState>,
    executed: AtomicU64,
}

impl LoggingNotifier {
    /// Creates a notifier that starts out `Online`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of runs recorded so far.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }
}

impl ConnectionSink for LoggingNotifier {
    fn set_state(&self, state: ConnectionState) {
        let previous = {
            let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, state)
        };
        if previous == state {
            return;
        }
        match state {
            ConnectionState::Online => info!(from = previous.label(), "backend online"),
            ConnectionState::Degraded | ConnectionState::Offline => {
                warn!(from = previous.label(), to = state.label(), "backend connection changed");
            }
        }
    }
}

impl ExecutionRecorder for LoggingNotifier {
    fn request_executed(&self, tab: &TabId, finished_at: DateTime<Utc>) {
        let count = self.executed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(tab = %tab, finished_at = %finished_at.to_rfc3339(), count, "request executed");
    }
}
