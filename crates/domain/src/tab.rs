//! Open request tabs and their draft/baseline bookkeeping.
//!
//! A tab has one hydration state machine (`Idle -> Loading -> Ready | Error`,
//! `Error -> Loading` on retry) and three independent flags layered on top:
//! dirty, running and saving.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interface::{InterfaceDefinition, InterfaceSummary, to_draft};
use crate::request::RequestDraft;
use crate::response::ResponseSnapshot;

/// Stable tab identity: `<collection scope>:<request id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// Derives the id for a request opened from a collection scope.
    #[must_use]
    pub fn new(scope: &str, request_id: i64) -> Self {
        Self(format!("{scope}:{request_id}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hydration progress of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HydrationState {
    /// Opened, detail not requested yet.
    #[default]
    Idle,
    /// Detail fetch in flight.
    Loading,
    /// Detail loaded; the tab can run and save.
    Ready,
    /// Detail fetch failed; retry by hydrating again.
    Error {
        /// Human-readable failure.
        message: String,
    },
}

impl HydrationState {
    /// Returns true once the detail is loaded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// One open editing/running context bound to a single interface.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    /// Tab identity.
    pub id: TabId,
    /// Backend id of the interface.
    pub request_id: i64,
    /// Environment lookup key.
    pub endpoint_key: String,
    /// Signature of the last persisted draft.
    pub baseline_signature: String,
    /// Last persisted draft.
    pub request: RequestDraft,
    /// Current editor contents.
    pub draft: RequestDraft,
    /// Cached backend definition, present once hydrated.
    pub definition: Option<InterfaceDefinition>,
    /// Hydration state machine.
    pub hydration: HydrationState,
    /// Draft differs from the baseline.
    pub is_dirty: bool,
    /// A run is in flight.
    pub is_running: bool,
    /// Latest snapshot of the latest run.
    pub response: Option<ResponseSnapshot>,
    /// A save is in flight.
    pub is_saving: bool,
    /// Message from the last failed save.
    pub save_error: Option<String>,
}

impl Tab {
    /// Opens a tab from a catalog row. The draft is a copy of the row until
    /// hydration replaces it.
    #[must_use]
    pub fn open(id: TabId, summary: &InterfaceSummary) -> Self {
        let request = summary.placeholder_draft();
        Self {
            id,
            request_id: summary.id,
            endpoint_key: summary.endpoint_key.clone(),
            baseline_signature: request.signature(),
            draft: request.clone(),
            request,
            definition: None,
            hydration: HydrationState::Idle,
            is_dirty: false,
            is_running: false,
            response: None,
            is_saving: false,
            save_error: None,
        }
    }

    /// Replaces the draft and recomputes the dirty flag.
    pub fn update_draft(&mut self, draft: RequestDraft) {
        self.is_dirty = draft.signature() != self.baseline_signature;
        self.draft = draft;
        self.save_error = None;
    }

    /// Enters `Loading`.
    pub fn begin_hydration(&mut self) {
        self.hydration = HydrationState::Loading;
    }

    /// Installs a freshly fetched definition as the new baseline.
    pub fn finish_hydration(&mut self, definition: InterfaceDefinition) {
        let adapted = to_draft(&definition);
        self.baseline_signature = adapted.signature();
        self.request = adapted.clone();
        self.draft = adapted;
        if !definition.endpoint_key.is_empty() {
            self.endpoint_key.clone_from(&definition.endpoint_key);
        }
        self.definition = Some(definition);
        self.hydration = HydrationState::Ready;
        self.is_dirty = false;
    }

    /// Enters `Error`.
    pub fn fail_hydration(&mut self, message: impl Into<String>) {
        self.hydration = HydrationState::Error {
            message: message.into(),
        };
    }

    /// Records a successful save of `saved` as the new baseline.
    ///
    /// The dirty flag is recomputed against the current draft, which only
    /// differs from `saved` if the user kept typing while the save was in
    /// flight.
    pub fn mark_saved(&mut self, saved: RequestDraft, definition: InterfaceDefinition) {
        self.baseline_signature = saved.signature();
        self.is_dirty = self.draft.signature() != self.baseline_signature;
        self.request = saved;
        self.definition = Some(definition);
        self.is_saving = false;
        self.save_error = None;
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.draft.name
    }
}
