//! Tab store
//!
//! Single owner of the open tabs and of which one is active. All state sits
//! behind one mutex that is never held across an `.await`. Every async
//! operation takes an epoch before suspending and re-checks it afterwards, so
//! a result that arrives after the tab was closed, re-hydrated, re-run or the
//! store was torn down is dropped instead of written.

mod outcome;
mod view;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sosodesk_domain::{
    ClientSettings, ConnectionState, EnvironmentEntry, HydrationState, InterfaceSummary,
    RequestDraft, ResponseSnapshot, Tab, TabId, apply_draft, generate_run_id,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::catalog::InterfaceCatalog;
use crate::debug_executor::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DebugError, DebugExecutor, DebugOptions,
};
use crate::environment_resolver::EnvironmentResolver;
use crate::error::{HydrationError, SaveError};
use crate::ports::{
    Clock, ConfirmationGate, ConnectionSink, DebugService, EnvironmentService, ExecutionRecorder,
    InterfaceCatalogService, PlanContext,
};

pub use outcome::{CloseOutcome, HydrateOutcome, RunOutcome, SaveOutcome, SkipReason, StoreEvent};
pub use view::TabView;

/// Collaborators the store talks to.
pub struct StoreDeps {
    /// Interface list, detail and save.
    pub catalog_service: Arc<dyn InterfaceCatalogService>,
    /// Debug job submit and poll.
    pub debug_service: Arc<dyn DebugService>,
    /// Environment lists.
    pub environment_service: Arc<dyn EnvironmentService>,
    /// Connection indicator.
    pub connection: Arc<dyn ConnectionSink>,
    /// Run history hook.
    pub recorder: Arc<dyn ExecutionRecorder>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Run tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Wait between debug polls.
    pub poll_interval: Duration,
    /// Poll budget per run.
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl From<&ClientSettings> for StoreConfig {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            max_attempts: settings.max_attempts,
        }
    }
}

struct TabEntry {
    tab: Tab,
    hydration_epoch: u64,
    run_epoch: u64,
    save_epoch: u64,
    cancel: Option<CancellationToken>,
}

impl TabEntry {
    fn new(tab: Tab) -> Self {
        Self {
            tab,
            hydration_epoch: 0,
            run_epoch: 0,
            save_epoch: 0,
            cancel: None,
        }
    }
}

#[derive(Default)]
struct StoreState {
    tabs: Vec<TabEntry>,
    active: Option<TabId>,
    torn_down: bool,
    epoch: u64,
}

impl StoreState {
    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn position(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|e| &e.tab.id == id)
    }

    fn entry_mut(&mut self, id: &TabId) -> Option<&mut TabEntry> {
        self.tabs.iter_mut().find(|e| &e.tab.id == id)
    }

    /// Entry still eligible for a write from an async continuation.
    fn live_entry(
        &mut self,
        id: &TabId,
        still_current: impl Fn(&TabEntry) -> bool,
    ) -> Option<&mut TabEntry> {
        if self.torn_down {
            return None;
        }
        self.entry_mut(id).filter(|e| still_current(e))
    }

    fn active_entry_mut(&mut self) -> Result<&mut TabEntry, SkipReason> {
        if self.torn_down {
            return Err(SkipReason::TornDown);
        }
        let active = self.active.clone().ok_or(SkipReason::NoActiveTab)?;
        self.entry_mut(&active).ok_or(SkipReason::NoActiveTab)
    }

    fn any_running(&self) -> bool {
        self.tabs.iter().any(|e| e.tab.is_running)
    }
}

/// Owns open tabs, their drafts, runs and saves.
pub struct TabStore {
    catalog_service: Arc<dyn InterfaceCatalogService>,
    executor: DebugExecutor,
    environments: EnvironmentResolver,
    connection: Arc<dyn ConnectionSink>,
    recorder: Arc<dyn ExecutionRecorder>,
    clock: Arc<dyn Clock>,
    catalog: Arc<InterfaceCatalog>,
    config: StoreConfig,
    state: Mutex<StoreState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StoreEvent>>>,
}

impl TabStore {
    /// Creates a store with no tabs.
    pub fn new(deps: StoreDeps, config: StoreConfig, catalog: Arc<InterfaceCatalog>) -> Self {
        Self {
            catalog_service: deps.catalog_service,
            executor: DebugExecutor::new(deps.debug_service, deps.clock.clone()),
            environments: EnvironmentResolver::new(deps.environment_service),
            connection: deps.connection,
            recorder: deps.recorder,
            clock: deps.clock,
            catalog,
            config,
            state: Mutex::new(StoreState::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, events: impl IntoIterator<Item = StoreEvent>) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for event in events {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Receives every event emitted from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Environment resolver owned by this store.
    pub fn environments(&self) -> &EnvironmentResolver {
        &self.environments
    }

    /// Interface catalog this store writes saves back into.
    pub fn catalog(&self) -> &Arc<InterfaceCatalog> {
        &self.catalog
    }

    // ---- projections ----

    /// Copy of one tab.
    pub fn tab(&self, id: &TabId) -> Option<Tab> {
        let state = self.state();
        state
            .tabs
            .iter()
            .find(|e| &e.tab.id == id)
            .map(|e| e.tab.clone())
    }

    /// Copies of all tabs, in order.
    pub fn tabs(&self) -> Vec<Tab> {
        self.state().tabs.iter().map(|e| e.tab.clone()).collect()
    }

    /// Id of the active tab.
    pub fn active_tab_id(&self) -> Option<TabId> {
        self.state().active.clone()
    }

    /// Copy of the active tab.
    pub fn active_tab(&self) -> Option<Tab> {
        let state = self.state();
        let active = state.active.as_ref()?;
        state
            .tabs
            .iter()
            .find(|e| &e.tab.id == active)
            .map(|e| e.tab.clone())
    }

    /// Render projection of every tab.
    pub fn views(&self) -> Vec<TabView> {
        let state = self.state();
        state
            .tabs
            .iter()
            .map(|e| TabView::project(&e.tab, state.active.as_ref() == Some(&e.tab.id)))
            .collect()
    }

    // ---- tab lifecycle ----

    /// Opens (or re-selects) the tab for `summary` and makes it active.
    ///
    /// A new tab starts `Idle` with a copy of the row as its draft; call
    /// [`hydrate`](Self::hydrate) or [`sync`](Self::sync) to load it.
    pub fn open_tab(&self, collection_id: &str, summary: &InterfaceSummary) -> TabId {
        let id = TabId::new(collection_id, summary.id);
        let mut events = Vec::new();
        {
            let mut state = self.state();
            if state.torn_down {
                debug!(tab = %id, "open_tab after teardown ignored");
                return id;
            }
            if state.position(&id).is_none() {
                state.tabs.push(TabEntry::new(Tab::open(id.clone(), summary)));
                events.push(StoreEvent::TabsChanged);
                debug!(tab = %id, "tab opened");
            }
            if state.active.as_ref() != Some(&id) {
                state.active = Some(id.clone());
                events.push(StoreEvent::ActiveTabChanged(Some(id.clone())));
            }
        }
        self.emit(events);
        id
    }

    /// Makes an open tab active. Returns false for unknown ids.
    pub fn activate(&self, id: &TabId) -> bool {
        {
            let mut state = self.state();
            if state.torn_down || state.position(id).is_none() {
                return false;
            }
            if state.active.as_ref() == Some(id) {
                return true;
            }
            state.active = Some(id.clone());
        }
        self.emit([StoreEvent::ActiveTabChanged(Some(id.clone()))]);
        true
    }

    /// Closes a tab, asking `gate` first if it has unsaved edits.
    ///
    /// Any run on the tab is cancelled. If the tab was active, the tab before
    /// it becomes active, else the new first tab, else none.
    pub fn close_tab<G>(&self, id: &TabId, gate: &G) -> CloseOutcome
    where
        G: ConfirmationGate + ?Sized,
    {
        let prompt = {
            let state = self.state();
            let Some(entry) = state.tabs.iter().find(|e| &e.tab.id == id) else {
                return CloseOutcome::NotFound;
            };
            entry
                .tab
                .is_dirty
                .then(|| format!("Discard unsaved changes to \"{}\"?", entry.tab.title()))
        };
        if let Some(prompt) = prompt
            && !gate.confirm(&prompt)
        {
            debug!(tab = %id, "close declined");
            return CloseOutcome::Declined;
        }

        let mut events = vec![StoreEvent::TabsChanged];
        {
            let mut state = self.state();
            let Some(index) = state.position(id) else {
                return CloseOutcome::NotFound;
            };
            let entry = state.tabs.remove(index);
            if let Some(cancel) = entry.cancel {
                cancel.cancel();
            }
            if state.active.as_ref() == Some(id) {
                let next = index
                    .checked_sub(1)
                    .and_then(|i| state.tabs.get(i))
                    .or_else(|| state.tabs.first())
                    .map(|e| e.tab.id.clone());
                state.active.clone_from(&next);
                events.push(StoreEvent::ActiveTabChanged(next));
            }
        }
        debug!(tab = %id, "tab closed");
        self.emit(events);
        CloseOutcome::Closed
    }

    /// Replaces a tab's draft and recomputes its dirty flag.
    pub fn update_draft(&self, id: &TabId, draft: RequestDraft) -> bool {
        {
            let mut state = self.state();
            if state.torn_down {
                return false;
            }
            let Some(entry) = state.entry_mut(id) else {
                return false;
            };
            entry.tab.update_draft(draft);
        }
        self.emit([StoreEvent::TabUpdated(id.clone())]);
        true
    }

    /// Opens the first catalog row if no tab is open yet.
    pub fn prime_from_catalog(&self, collection_id: &str) -> Option<TabId> {
        if !self.state().tabs.is_empty() {
            return None;
        }
        let first = self.catalog.snapshot().first().cloned()?;
        Some(self.open_tab(collection_id, &first))
    }

    // ---- hydration ----

    /// Loads the full definition behind a tab.
    ///
    /// On success the draft and baseline are replaced by the loaded
    /// definition. Can be called again to retry after a failure.
    pub async fn hydrate(&self, id: &TabId) -> HydrateOutcome {
        let (epoch, request_id) = {
            let mut state = self.state();
            if state.torn_down {
                return HydrateOutcome::Skipped(SkipReason::TornDown);
            }
            let epoch = state.next_epoch();
            let Some(entry) = state.entry_mut(id) else {
                return HydrateOutcome::Skipped(SkipReason::UnknownTab);
            };
            entry.hydration_epoch = epoch;
            entry.tab.begin_hydration();
            (epoch, entry.tab.request_id)
        };
        self.emit([StoreEvent::TabUpdated(id.clone())]);

        let fetched = self.catalog_service.get_detail(request_id).await;

        let outcome = {
            let mut state = self.state();
            let Some(entry) = state.live_entry(id, |e| e.hydration_epoch == epoch) else {
                debug!(tab = %id, "stale hydration result dropped");
                return HydrateOutcome::Discarded;
            };
            match fetched {
                Ok(definition) => {
                    entry.tab.finish_hydration(definition);
                    HydrateOutcome::Ready
                }
                Err(e) => {
                    let error = HydrationError::from_backend(request_id, e);
                    warn!(tab = %id, error = %error, "hydration failed");
                    entry.tab.fail_hydration(error.to_string());
                    HydrateOutcome::Failed(error)
                }
            }
        };
        self.emit([StoreEvent::TabUpdated(id.clone())]);
        outcome
    }

    /// Hydrates every tab that is still `Idle`.
    pub async fn sync(&self) -> Vec<(TabId, HydrateOutcome)> {
        let idle: Vec<TabId> = self
            .state()
            .tabs
            .iter()
            .filter(|e| e.tab.hydration == HydrationState::Idle)
            .map(|e| e.tab.id.clone())
            .collect();

        let mut outcomes = Vec::with_capacity(idle.len());
        for id in idle {
            let outcome = self.hydrate(&id).await;
            outcomes.push((id, outcome));
        }
        outcomes
    }

    // ---- environments ----

    /// Resolves environments for the active tab's endpoint key and returns
    /// the selected one.
    pub async fn resolve_active_environment(&self) -> Option<EnvironmentEntry> {
        let endpoint_key = self.active_tab().map(|t| t.endpoint_key).unwrap_or_default();
        self.environments.resolve_for(&endpoint_key).await;
        self.environments.selected_entry()
    }

    // ---- runs ----

    /// Runs the active tab's draft against `environment`.
    ///
    /// A run already in flight on the same tab is cancelled and superseded.
    /// Intermediate snapshots are written into the tab as they arrive.
    pub async fn run_active_request(&self, environment: Option<&EnvironmentEntry>) -> RunOutcome {
        let started_at = self.clock.now();
        let prepared = {
            let mut state = self.state();
            let epoch = state.next_epoch();
            match (state.active_entry_mut(), environment) {
                (Err(reason), _) => Err(reason),
                (Ok(entry), _) if !entry.tab.hydration.is_ready() => Err(SkipReason::NotReady),
                (Ok(_), None) => Err(SkipReason::NoEnvironment),
                (Ok(entry), Some(environment)) => match entry.tab.definition.as_ref() {
                    None => Err(SkipReason::NotReady),
                    Some(cached) => {
                        let definition = apply_draft(cached, &entry.tab.draft);
                        if let Some(previous) = entry.cancel.take() {
                            debug!(tab = %entry.tab.id, "superseding run in flight");
                            previous.cancel();
                        }
                        let token = CancellationToken::new();
                        let receiver = token.receiver();
                        entry.cancel = Some(token);
                        entry.run_epoch = epoch;
                        entry.tab.is_running = true;
                        let plan = PlanContext {
                            environment_key: environment.config_key.clone(),
                            request_addr: environment.request_addr.clone(),
                            run_id: generate_run_id(),
                        };
                        Ok((
                            entry.tab.id.clone(),
                            entry.tab.request_id,
                            definition,
                            plan,
                            receiver,
                            epoch,
                        ))
                    }
                },
            }
        };
        let (id, request_id, definition, plan, cancel, epoch) = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => {
                info!(?reason, "run skipped");
                return RunOutcome::Skipped(reason);
            }
        };

        self.connection.set_state(ConnectionState::Degraded);
        self.emit([StoreEvent::TabUpdated(id.clone())]);
        info!(tab = %id, run_id = %plan.run_id, environment = %plan.environment_key, "run started");

        let options = DebugOptions::new(cancel)
            .with_poll_interval(self.config.poll_interval)
            .with_max_attempts(self.config.max_attempts);
        let on_snapshot = |snapshot: &ResponseSnapshot| {
            let written = {
                let mut state = self.state();
                match state.live_entry(&id, |e| e.run_epoch == epoch && e.cancel.is_some()) {
                    Some(entry) => {
                        entry.tab.response = Some(snapshot.clone());
                        true
                    }
                    None => false,
                }
            };
            if written {
                self.emit([StoreEvent::SnapshotReceived {
                    tab_id: id.clone(),
                    snapshot: snapshot.clone(),
                }]);
            }
        };

        let result = self
            .executor
            .execute_debug(&definition, request_id, &plan, options, on_snapshot)
            .await;

        let (outcome, connection, finished_at) = {
            let mut state = self.state();
            let Some(entry) = state.live_entry(&id, |e| e.run_epoch == epoch) else {
                debug!(tab = %id, run_id = %plan.run_id, "run result dropped");
                let idle = !state.any_running();
                drop(state);
                if idle {
                    self.connection.set_state(ConnectionState::Online);
                }
                return RunOutcome::Discarded;
            };
            entry.tab.is_running = false;
            entry.cancel = None;
            match result {
                Ok(done) => {
                    let finished_at = done.snapshot.finished_at;
                    entry.tab.response = Some(done.snapshot);
                    (
                        RunOutcome::Completed {
                            converged: done.converged,
                            attempts: done.attempts,
                        },
                        ConnectionState::Online,
                        Some(finished_at),
                    )
                }
                Err(DebugError::Cancelled) => {
                    (RunOutcome::Cancelled, ConnectionState::Online, None)
                }
                Err(error) => {
                    let message = error.to_string();
                    entry.tab.response = Some(ResponseSnapshot::error(
                        &message,
                        started_at,
                        self.clock.now(),
                    ));
                    (RunOutcome::Failed(message), ConnectionState::Degraded, None)
                }
            }
        };

        match &outcome {
            RunOutcome::Failed(message) => {
                warn!(tab = %id, run_id = %plan.run_id, error = %message, "run failed");
            }
            RunOutcome::Cancelled => info!(tab = %id, run_id = %plan.run_id, "run cancelled"),
            _ => info!(tab = %id, run_id = %plan.run_id, ?outcome, "run finished"),
        }
        self.connection.set_state(connection);
        if let Some(finished_at) = finished_at {
            self.recorder.request_executed(&id, finished_at);
        }
        self.emit([StoreEvent::TabUpdated(id)]);
        outcome
    }

    /// Cancels the active tab's run. Returns false if nothing was running.
    pub fn cancel_active_request(&self) -> bool {
        let id = {
            let mut state = self.state();
            let Ok(entry) = state.active_entry_mut() else {
                return false;
            };
            let Some(token) = entry.cancel.take() else {
                return false;
            };
            token.cancel();
            entry.tab.is_running = false;
            entry.tab.id.clone()
        };
        info!(tab = %id, "run cancel requested");
        self.emit([StoreEvent::TabUpdated(id)]);
        true
    }

    // ---- saves ----

    /// Saves the active tab's draft and writes the result back into the
    /// catalog.
    pub async fn save_active_request(&self) -> SaveOutcome {
        let prepared = {
            let mut state = self.state();
            let epoch = state.next_epoch();
            match state.active_entry_mut() {
                Err(reason) => Err(reason),
                Ok(entry) if entry.tab.is_saving => Err(SkipReason::SaveInFlight),
                Ok(entry) if !entry.tab.hydration.is_ready() => Err(SkipReason::NotReady),
                Ok(entry) => match entry.tab.definition.as_ref() {
                    None => Err(SkipReason::NotReady),
                    Some(cached) => {
                        let draft = entry.tab.draft.clone();
                        let merged = apply_draft(cached, &draft);
                        entry.tab.is_saving = true;
                        entry.tab.save_error = None;
                        entry.save_epoch = epoch;
                        Ok((entry.tab.id.clone(), entry.tab.request_id, draft, merged, epoch))
                    }
                },
            }
        };
        let (id, request_id, draft, merged, epoch) = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => {
                info!(?reason, "save skipped");
                return SaveOutcome::Skipped(reason);
            }
        };
        self.emit([StoreEvent::TabUpdated(id.clone())]);

        let result = self.catalog_service.save(request_id, &merged).await;

        let outcome = {
            let mut state = self.state();
            if result.is_ok() && !state.torn_down {
                self.catalog.replace_entry(InterfaceSummary::from(&merged));
            }
            let entry = state.live_entry(&id, |e| e.save_epoch == epoch);
            match (result, entry) {
                (Ok(()), Some(entry)) => {
                    entry.tab.mark_saved(draft, merged);
                    info!(tab = %id, request_id, "saved");
                    SaveOutcome::Saved
                }
                (Ok(()), None) => {
                    debug!(tab = %id, "save finished after tab went away");
                    SaveOutcome::Saved
                }
                (Err(e), entry) => {
                    let error = SaveError(e);
                    warn!(tab = %id, error = %error, "save failed");
                    if let Some(entry) = entry {
                        entry.tab.is_saving = false;
                        entry.tab.save_error = Some(error.to_string());
                    }
                    SaveOutcome::Failed(error)
                }
            }
        };
        self.emit([StoreEvent::TabUpdated(id)]);
        outcome
    }

    // ---- lifecycle ----

    /// Cancels every run, closes every tab and forgets environment state.
    /// The store ignores further operations.
    pub fn teardown(&self) {
        {
            let mut state = self.state();
            state.torn_down = true;
            for entry in state.tabs.drain(..) {
                if let Some(cancel) = entry.cancel {
                    cancel.cancel();
                }
            }
            state.active = None;
        }
        self.environments.clear();
        info!("tab store torn down");
        self.emit([StoreEvent::TabsChanged, StoreEvent::ActiveTabChanged(None)]);
    }
}
