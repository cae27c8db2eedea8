//! Events and operation outcomes reported by the tab store.

use sosodesk_domain::{ResponseSnapshot, TabId};

use crate::error::{HydrationError, SaveError};

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A tab was opened or closed.
    TabsChanged,
    /// The active tab changed.
    ActiveTabChanged(Option<TabId>),
    /// Some field of a tab changed.
    TabUpdated(TabId),
    /// A run produced an intermediate snapshot.
    SnapshotReceived {
        /// Tab the run belongs to.
        tab_id: TabId,
        /// The snapshot.
        snapshot: ResponseSnapshot,
    },
}

/// Why an operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The store was torn down.
    TornDown,
    /// No tab is active.
    NoActiveTab,
    /// The tab id is not open.
    UnknownTab,
    /// The tab has not finished hydrating.
    NotReady,
    /// No environment was supplied.
    NoEnvironment,
    /// A save for this tab is already in flight.
    SaveInFlight,
}

/// Result of [`TabStore::hydrate`](super::TabStore::hydrate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// The tab is `Ready`.
    Ready,
    /// The detail fetch failed; the tab is in `Error`.
    Failed(HydrationError),
    /// Nothing was fetched.
    Skipped(SkipReason),
    /// A newer hydration, a close or a teardown made this result stale.
    Discarded,
}

/// Result of [`TabStore::run_active_request`](super::TabStore::run_active_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was submitted.
    Skipped(SkipReason),
    /// The run ended with a snapshot stored on the tab.
    Completed {
        /// False if the poll budget ran out first.
        converged: bool,
        /// Polls performed.
        attempts: u32,
    },
    /// The run was cancelled.
    Cancelled,
    /// The run failed; an error snapshot was stored on the tab.
    Failed(String),
    /// The run was superseded, or its tab is gone.
    Discarded,
}

/// Result of [`TabStore::save_active_request`](super::TabStore::save_active_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The draft is the new baseline.
    Saved,
    /// Nothing was sent.
    Skipped(SkipReason),
    /// The backend refused; `save_error` is set and the draft kept.
    Failed(SaveError),
}

/// Result of [`TabStore::close_tab`](super::TabStore::close_tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The tab was removed.
    Closed,
    /// The user kept the unsaved tab.
    Declined,
    /// No such tab.
    NotFound,
}
