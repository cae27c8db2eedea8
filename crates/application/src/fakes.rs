//! In-memory collaborators shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sosodesk_domain::{
    ConnectionState, EnvironmentEntry, InterfaceDefinition, InterfacePage, InterfaceSummary,
    TabId,
};
use tokio::sync::Notify;

use crate::error::{BackendError, BackendResult};
use crate::ports::{
    Clock, ConnectionSink, DEBUG_SUCCESS_CODE, DebugJobId, DebugResult, DebugService,
    EnvironmentService, ExecutionRecorder, InterfaceCatalogService, PlanContext, PollResponse,
};

/// Clock that advances 10ms per reading.
pub struct StepClock {
    ticks: AtomicI64,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        base + chrono::Duration::milliseconds(tick * 10)
    }
}

pub fn pending(code: i64) -> PollResponse {
    PollResponse {
        code,
        message: "running".to_string(),
        result: None,
    }
}

pub fn finished(body: &str) -> PollResponse {
    PollResponse {
        code: DEBUG_SUCCESS_CODE,
        message: "ok".to_string(),
        result: Some(DebugResult {
            status_code: Some(200),
            raw_body: Some("raw-transport".to_string()),
            decoded_body: Some(body.to_string()),
            payload: serde_json::json!({ "actualResult": body }),
            ..DebugResult::default()
        }),
    }
}

/// Debug service replaying a script of poll answers.
pub struct ScriptedDebugService {
    pub job_id: Option<String>,
    pub submit_error: Option<BackendError>,
    script: Mutex<VecDeque<BackendResult<PollResponse>>>,
    pub polls: AtomicUsize,
    pub submits: AtomicUsize,
    pub polled: Notify,
}

impl ScriptedDebugService {
    pub fn new(script: Vec<BackendResult<PollResponse>>) -> Self {
        Self {
            job_id: Some("job-1".to_string()),
            submit_error: None,
            script: Mutex::new(script.into()),
            polls: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            polled: Notify::new(),
        }
    }

    pub fn codes(codes: &[i64]) -> Self {
        Self::new(
            codes
                .iter()
                .map(|&code| {
                    if code == DEBUG_SUCCESS_CODE {
                        Ok(finished("final body"))
                    } else {
                        Ok(pending(code))
                    }
                })
                .collect(),
        )
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DebugService for ScriptedDebugService {
    async fn submit(
        &self,
        _definition: &InterfaceDefinition,
        _plan: &PlanContext,
    ) -> BackendResult<Option<DebugJobId>> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.submit_error {
            return Err(error.clone());
        }
        Ok(self.job_id.clone().map(DebugJobId))
    }

    async fn poll(&self, _job: &DebugJobId) -> BackendResult<PollResponse> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(pending(1)));
        self.polled.notify_one();
        next
    }
}

/// Catalog service backed by a map of definitions.
///
/// With `hold` set, `get_detail` and `save` do their work, signal `entered`
/// and then wait for `release` before answering.
#[derive(Default)]
pub struct FakeCatalogService {
    pub details: Mutex<HashMap<i64, InterfaceDefinition>>,
    pub saved: Mutex<Vec<InterfaceDefinition>>,
    pub pages: Mutex<Vec<InterfacePage>>,
    pub fail_detail: AtomicBool,
    pub fail_save: AtomicBool,
    pub fail_pages: AtomicBool,
    pub detail_calls: AtomicUsize,
    pub hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl FakeCatalogService {
    pub fn with(definitions: Vec<InterfaceDefinition>) -> Self {
        let service = Self::default();
        {
            let mut details = service.details.lock().unwrap();
            for definition in definitions {
                details.insert(definition.id, definition);
            }
        }
        service
    }

    async fn gate(&self) {
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl InterfaceCatalogService for FakeCatalogService {
    async fn list_page(&self, page: u32, _page_size: u32) -> BackendResult<InterfacePage> {
        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(BackendError::Connection("refused".to_string()));
        }
        let pages = self.pages.lock().unwrap();
        let index = usize::try_from(page.saturating_sub(1)).unwrap();
        Ok(pages.get(index).cloned().unwrap_or_default())
    }

    async fn get_detail(&self, id: i64) -> BackendResult<InterfaceDefinition> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_detail.load(Ordering::SeqCst) {
            return Err(BackendError::Timeout { timeout_ms: 100 });
        }
        let found = self
            .details
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()));
        self.gate().await;
        found
    }

    async fn save(&self, id: i64, definition: &InterfaceDefinition) -> BackendResult<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                code: 40001,
                message: "locked by another user".to_string(),
            });
        }
        self.details.lock().unwrap().insert(id, definition.clone());
        self.saved.lock().unwrap().push(definition.clone());
        self.gate().await;
        Ok(())
    }
}

/// Environment service backed by a map, counting calls.
#[derive(Default)]
pub struct FakeEnvironmentService {
    pub lists: Mutex<HashMap<String, Vec<EnvironmentEntry>>>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeEnvironmentService {
    pub fn with(endpoint_key: &str, entries: Vec<EnvironmentEntry>) -> Self {
        let service = Self::default();
        service
            .lists
            .lock()
            .unwrap()
            .insert(endpoint_key.to_string(), entries);
        service
    }
}

#[async_trait]
impl EnvironmentService for FakeEnvironmentService {
    async fn list(&self, endpoint_key: &str) -> BackendResult<Vec<EnvironmentEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Connection("down".to_string()));
        }
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(endpoint_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Records connection states and executed runs.
#[derive(Default)]
pub struct RecordingNotifier {
    pub states: Mutex<Vec<ConnectionState>>,
    pub executed: Mutex<Vec<TabId>>,
}

impl RecordingNotifier {
    pub fn last_state(&self) -> Option<ConnectionState> {
        self.states.lock().unwrap().last().copied()
    }
}

impl ConnectionSink for RecordingNotifier {
    fn set_state(&self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }
}

impl ExecutionRecorder for RecordingNotifier {
    fn request_executed(&self, tab: &TabId, _finished_at: DateTime<Utc>) {
        self.executed.lock().unwrap().push(tab.clone());
    }
}

pub fn summary(id: i64, url: &str, endpoint_key: &str) -> InterfaceSummary {
    InterfaceSummary::from(&definition(id, url, endpoint_key))
}

pub fn definition(id: i64, url: &str, endpoint_key: &str) -> InterfaceDefinition {
    let mut definition = InterfaceDefinition::new(id, "GET", url);
    definition.title = format!("interface {id}");
    definition.endpoint_key = endpoint_key.to_string();
    definition
}
