//! Environment resolution per endpoint key.
//!
//! The resolver keeps one cached environment list per endpoint key and a
//! remembered selection per endpoint key. Both live in the resolver itself,
//! so every store gets its own and teardown wipes them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sosodesk_domain::{EnvironmentEntry, EnvironmentOption, build_options, pick_default};
use tracing::{debug, warn};

use crate::error::EnvironmentLoadError;
use crate::ports::EnvironmentService;

#[derive(Debug, Default)]
struct ResolverState {
    cache: HashMap<String, Vec<EnvironmentEntry>>,
    remembered: BTreeMap<String, String>,
    endpoint_key: Option<String>,
    options: Vec<EnvironmentOption>,
    selected: Option<String>,
    error: Option<EnvironmentLoadError>,
    generation: u64,
}

impl ResolverState {
    fn reset_view(&mut self) {
        self.options.clear();
        self.selected = None;
        self.error = None;
    }

    fn apply(&mut self, endpoint_key: &str, entries: &[EnvironmentEntry]) {
        self.options = build_options(entries);
        let remembered = self.remembered.get(endpoint_key).map(String::as_str);
        self.selected = pick_default(&self.options, remembered);
        self.error = None;
    }
}

/// Resolves and remembers environments for the active endpoint key.
pub struct EnvironmentResolver {
    service: Arc<dyn EnvironmentService>,
    state: Mutex<ResolverState>,
}

impl EnvironmentResolver {
    /// Creates an empty resolver.
    pub fn new(service: Arc<dyn EnvironmentService>) -> Self {
        Self {
            service,
            state: Mutex::new(ResolverState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `endpoint_key` current and returns the selected config key.
    ///
    /// An empty key clears the current view. A cached list is used as is;
    /// otherwise the list is fetched. A failed fetch leaves an empty option
    /// list and records the error. If another `resolve_for` or `clear` ran
    /// while the fetch was in flight, the fetched list is discarded.
    pub async fn resolve_for(&self, endpoint_key: &str) -> Option<String> {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.reset_view();

            if endpoint_key.is_empty() {
                state.endpoint_key = None;
                return None;
            }
            state.endpoint_key = Some(endpoint_key.to_string());

            if let Some(entries) = state.cache.get(endpoint_key).cloned() {
                state.apply(endpoint_key, &entries);
                return state.selected.clone();
            }
            state.generation
        };

        let fetched = self.service.list(endpoint_key).await;

        let mut state = self.state();
        if state.generation != generation {
            debug!(endpoint_key, "discarding superseded environment list");
            return state.selected.clone();
        }
        match fetched {
            Ok(entries) => {
                debug!(endpoint_key, count = entries.len(), "environments loaded");
                state.apply(endpoint_key, &entries);
                state.cache.insert(endpoint_key.to_string(), entries);
            }
            Err(source) => {
                warn!(endpoint_key, error = %source, "failed to load environments");
                state.error = Some(EnvironmentLoadError {
                    endpoint_key: endpoint_key.to_string(),
                    source,
                });
            }
        }
        state.selected.clone()
    }

    /// Selects `config_key` for the current endpoint.
    ///
    /// Returns false, changing nothing, if the key is unknown or belongs to a
    /// production environment.
    pub fn select(&self, config_key: &str) -> bool {
        let mut state = self.state();
        let selectable = state
            .options
            .iter()
            .any(|o| o.entry.config_key == config_key && !o.disabled);
        if !selectable {
            debug!(config_key, "rejected environment selection");
            return false;
        }
        let Some(endpoint_key) = state.endpoint_key.clone() else {
            return false;
        };
        state.remembered.insert(endpoint_key, config_key.to_string());
        state.selected = Some(config_key.to_string());
        true
    }

    /// Current option list.
    pub fn options(&self) -> Vec<EnvironmentOption> {
        self.state().options.clone()
    }

    /// Current selected config key.
    pub fn selected(&self) -> Option<String> {
        self.state().selected.clone()
    }

    /// Current selected entry.
    pub fn selected_entry(&self) -> Option<EnvironmentEntry> {
        let state = self.state();
        let key = state.selected.as_deref()?;
        state
            .options
            .iter()
            .find(|o| o.entry.config_key == key)
            .map(|o| o.entry.clone())
    }

    /// Endpoint key currently resolved.
    pub fn endpoint_key(&self) -> Option<String> {
        self.state().endpoint_key.clone()
    }

    /// Error of the last fetch for the current endpoint, if it failed.
    pub fn last_error(&self) -> Option<EnvironmentLoadError> {
        self.state().error.clone()
    }

    /// Remembered selection per endpoint key.
    pub fn remembered(&self) -> BTreeMap<String, String> {
        self.state().remembered.clone()
    }

    /// Merges previously persisted selections into memory.
    pub fn restore_remembered(&self, remembered: BTreeMap<String, String>) {
        self.state().remembered.extend(remembered);
    }

    /// Drops caches, selections and memory. In-flight fetches are discarded.
    pub fn clear(&self) {
        let mut state = self.state();
        let generation = state.generation + 1;
        *state = ResolverState {
            generation,
            ..ResolverState::default()
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fakes::FakeEnvironmentService;
    use pretty_assertions::assert_eq;
    use sosodesk_domain::EnvironmentGroup;
    use std::sync::atomic::Ordering;

    fn entry(key: &str, group: EnvironmentGroup) -> EnvironmentEntry {
        EnvironmentEntry::new(key, group, key.to_uppercase(), format!("http://{key}.test"))
    }

    fn resolver_with(
        entries: Vec<EnvironmentEntry>,
    ) -> (Arc<FakeEnvironmentService>, EnvironmentResolver) {
        let service = Arc::new(FakeEnvironmentService::with("svc", entries));
        let resolver = EnvironmentResolver::new(service.clone());
        (service, resolver)
    }

    #[tokio::test]
    async fn defaults_to_first_test_entry_and_rejects_production() {
        let (_, resolver) = resolver_with(vec![
            entry("a", EnvironmentGroup::Test),
            entry("b", EnvironmentGroup::Online),
        ]);

        assert_eq!(resolver.resolve_for("svc").await.as_deref(), Some("a"));
        assert!(!resolver.select("b"));
        assert_eq!(resolver.selected().as_deref(), Some("a"));

        let options = resolver.options();
        assert_eq!(options.len(), 2);
        assert!(options[1].disabled);
    }

    #[tokio::test]
    async fn second_resolve_uses_cache() {
        let (service, resolver) = resolver_with(vec![entry("a", EnvironmentGroup::Test)]);

        resolver.resolve_for("svc").await;
        resolver.resolve_for("svc").await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remembered_selection_wins_on_return() {
        let (service, resolver) = resolver_with(vec![
            entry("a", EnvironmentGroup::Test),
            entry("c", EnvironmentGroup::Local),
        ]);
        service
            .lists
            .lock()
            .unwrap()
            .insert("other".to_string(), vec![entry("x", EnvironmentGroup::Test)]);

        resolver.resolve_for("svc").await;
        assert!(resolver.select("c"));
        assert_eq!(resolver.resolve_for("other").await.as_deref(), Some("x"));
        assert_eq!(resolver.resolve_for("svc").await.as_deref(), Some("c"));
        assert_eq!(resolver.remembered().get("svc").map(String::as_str), Some("c"));
    }

    #[tokio::test]
    async fn duplicates_are_collapsed_first_wins() {
        let mut second = entry("a", EnvironmentGroup::Local);
        second.label = "shadow".to_string();
        let (_, resolver) = resolver_with(vec![entry("a", EnvironmentGroup::Test), second]);

        resolver.resolve_for("svc").await;

        let options = resolver.options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].entry.label, "A");
    }

    #[tokio::test]
    async fn only_production_entries_select_nothing() {
        let (_, resolver) = resolver_with(vec![entry("prod", EnvironmentGroup::Online)]);
        assert_eq!(resolver.resolve_for("svc").await, None);
        assert!(resolver.selected_entry().is_none());
    }

    #[tokio::test]
    async fn failed_fetch_clears_and_is_retried() {
        let (service, resolver) = resolver_with(vec![entry("a", EnvironmentGroup::Test)]);
        service.fail.store(true, Ordering::SeqCst);

        assert_eq!(resolver.resolve_for("svc").await, None);
        assert!(resolver.options().is_empty());
        assert_eq!(resolver.last_error().unwrap().endpoint_key, "svc");

        service.fail.store(false, Ordering::SeqCst);
        assert_eq!(resolver.resolve_for("svc").await.as_deref(), Some("a"));
        assert!(resolver.last_error().is_none());
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_key_clears_view() {
        let (_, resolver) = resolver_with(vec![entry("a", EnvironmentGroup::Test)]);
        resolver.resolve_for("svc").await;

        assert_eq!(resolver.resolve_for("").await, None);
        assert!(resolver.options().is_empty());
        assert!(resolver.endpoint_key().is_none());
        assert!(!resolver.select("a"));
    }

    #[tokio::test]
    async fn restored_memory_picks_default() {
        let (_, resolver) = resolver_with(vec![
            entry("a", EnvironmentGroup::Test),
            entry("c", EnvironmentGroup::Local),
        ]);
        resolver.restore_remembered(BTreeMap::from([("svc".to_string(), "c".to_string())]));

        assert_eq!(resolver.resolve_for("svc").await.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let (service, resolver) = resolver_with(vec![entry("a", EnvironmentGroup::Test)]);
        resolver.resolve_for("svc").await;
        resolver.select("a");

        resolver.clear();

        assert!(resolver.remembered().is_empty());
        assert!(resolver.selected().is_none());
        resolver.resolve_for("svc").await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }
}
