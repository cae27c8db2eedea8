//! Read-only projection of a tab for rendering.

use sosodesk_domain::{HttpMethod, HydrationState, Tab, TabId};

/// What a tab strip and editor header need to draw one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabView {
    /// Tab identity.
    pub id: TabId,
    /// Title shown on the tab.
    pub title: String,
    /// Draft method.
    pub method: HttpMethod,
    /// Draft url.
    pub url: String,
    /// Hydration state.
    pub hydration: HydrationState,
    /// Unsaved edits exist.
    pub is_dirty: bool,
    /// A run is in flight.
    pub is_running: bool,
    /// A save is in flight.
    pub is_saving: bool,
    /// Last save failure.
    pub save_error: Option<String>,
    /// Status of the latest snapshot, if any.
    pub last_status: Option<u16>,
    /// This is the active tab.
    pub active: bool,
}

impl TabView {
    pub(crate) fn project(tab: &Tab, active: bool) -> Self {
        Self {
            id: tab.id.clone(),
            title: tab.title().to_string(),
            method: tab.draft.method,
            url: tab.draft.url.clone(),
            hydration: tab.hydration.clone(),
            is_dirty: tab.is_dirty,
            is_running: tab.is_running,
            is_saving: tab.is_saving,
            save_error: tab.save_error.clone(),
            last_status: tab.response.as_ref().map(|r| r.status),
            active,
        }
    }
}
