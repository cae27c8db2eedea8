//! In-process backend for offline use.
//!
//! Implements the same ports as [`SosotestClient`](super::SosotestClient)
//! without any network. Debug jobs follow a configurable script of envelope
//! codes so long-running jobs can be simulated.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use sosodesk_application::ports::{
    DEBUG_SUCCESS_CODE, DebugJobId, DebugService, EnvironmentService, InterfaceCatalogService,
    PlanContext, PollResponse,
};
use sosodesk_application::{BackendError, BackendResult};
use sosodesk_domain::{
    EnvironmentEntry, InterfaceDefinition, InterfacePage, InterfaceSummary,
};

use super::mock_catalog::{FALLBACK_ENDPOINT_KEY, fallback_definitions, fallback_environments};
use super::wire::{Envelope, decode_poll};

struct Job {
    remaining: VecDeque<i64>,
    definition: InterfaceDefinition,
    plan: PlanContext,
    attempts: u32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend kept entirely in memory.
#[derive(Default)]
pub struct InMemoryBackend {
    definitions: Mutex<BTreeMap<i64, InterfaceDefinition>>,
    environments: Mutex<HashMap<String, Vec<EnvironmentEntry>>>,
    poll_script: Mutex<Vec<i64>>,
    jobs: Mutex<HashMap<String, Job>>,
    next_job: AtomicU64,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with the fallback catalog and its environments.
    #[must_use]
    pub fn demo() -> Self {
        Self::new()
            .with_definitions(fallback_definitions())
            .with_environments(FALLBACK_ENDPOINT_KEY, fallback_environments())
    }

    /// Adds definitions.
    #[must_use]
    pub fn with_definitions(self, definitions: Vec<InterfaceDefinition>) -> Self {
        lock(&self.definitions).extend(definitions.into_iter().map(|d| (d.id, d)));
        self
    }

    /// Sets the environments for an endpoint key.
    #[must_use]
    pub fn with_environments(self, endpoint_key: &str, entries: Vec<EnvironmentEntry>) -> Self {
        lock(&self.environments).insert(endpoint_key.to_string(), entries);
        self
    }

    /// Sets the envelope codes every new job answers with, one per poll.
    /// Once the script runs out a job finishes.
    #[must_use]
    pub fn with_poll_script(self, codes: Vec<i64>) -> Self {
        *lock(&self.poll_script) = codes;
        self
    }

    /// Stored definition, as last saved.
    pub fn definition(&self, id: i64) -> Option<InterfaceDefinition> {
        lock(&self.definitions).get(&id).cloned()
    }

    fn merge_save(
        stored: &InterfaceDefinition,
        incoming: &InterfaceDefinition,
    ) -> BackendResult<InterfaceDefinition> {
        let Ok(Value::Object(mut merged)) = serde_json::to_value(stored) else {
            return Err(BackendError::Decode("stored definition is not an object".to_string()));
        };
        merged.extend(incoming.save_payload());
        serde_json::from_value(Value::Object(merged))
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn finished_body(job_id: &str, job: &Job) -> Value {
        let url = fallback_url(&job.plan.request_addr, &job.definition.url);
        let actual = json!({
            "jobId": job_id,
            "attempt": job.attempts,
            "method": job.definition.method,
            "url": url,
            "environment": job.plan.environment_key,
        });
        let rendered = serde_json::to_string_pretty(&actual).unwrap_or_default();
        json!({
            "statusCode": 200,
            "headers": {"Content-Type": "application/json"},
            "responseBody": rendered,
            "actualResult": actual,
            "duration": 5,
            "assertResult": "PASS",
            "timing": {"total": 5.0},
        })
    }
}

fn fallback_url(request_addr: &str, path: &str) -> String {
    EnvironmentEntry::new("", Default::default(), "", request_addr)
        .resolve(path)
        .map_or_else(|_| format!("{request_addr}{path}"), |u| u.to_string())
}

#[async_trait]
impl InterfaceCatalogService for InMemoryBackend {
    async fn list_page(&self, page: u32, page_size: u32) -> BackendResult<InterfacePage> {
        let definitions = lock(&self.definitions);
        let size = page_size.max(1) as usize;
        let start = (page.max(1) as usize - 1) * size;
        let items: Vec<InterfaceSummary> = definitions
            .values()
            .skip(start)
            .take(size)
            .map(InterfaceSummary::from)
            .collect();
        Ok(InterfacePage {
            has_more: start + items.len() < definitions.len(),
            items,
        })
    }

    async fn get_detail(&self, id: i64) -> BackendResult<InterfaceDefinition> {
        self.definition(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn save(&self, id: i64, definition: &InterfaceDefinition) -> BackendResult<()> {
        let mut definitions = lock(&self.definitions);
        let stored = definitions
            .get(&id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        let merged = Self::merge_save(stored, definition)?;
        definitions.insert(id, merged);
        Ok(())
    }
}

#[async_trait]
impl DebugService for InMemoryBackend {
    async fn submit(
        &self,
        definition: &InterfaceDefinition,
        plan: &PlanContext,
    ) -> BackendResult<Option<DebugJobId>> {
        let id = format!("mem-{}", self.next_job.fetch_add(1, Ordering::SeqCst) + 1);
        let job = Job {
            remaining: lock(&self.poll_script).iter().copied().collect(),
            definition: definition.clone(),
            plan: plan.clone(),
            attempts: 0,
        };
        lock(&self.jobs).insert(id.clone(), job);
        Ok(Some(DebugJobId(id)))
    }

    async fn poll(&self, job_id: &DebugJobId) -> BackendResult<PollResponse> {
        let mut jobs = lock(&self.jobs);
        let job = jobs
            .get_mut(&job_id.0)
            .ok_or_else(|| BackendError::NotFound(job_id.0.clone()))?;
        job.attempts += 1;
        let code = job.remaining.pop_front().unwrap_or(DEBUG_SUCCESS_CODE);

        let envelope = if code == DEBUG_SUCCESS_CODE {
            Envelope::ok(Self::finished_body(&job_id.0, job))
        } else {
            Envelope::fail(code, format!("job {} still running", job_id.0))
        };
        Ok(decode_poll(envelope))
    }
}

#[async_trait]
impl EnvironmentService for InMemoryBackend {
    async fn list(&self, endpoint_key: &str) -> BackendResult<Vec<EnvironmentEntry>> {
        Ok(lock(&self.environments)
            .get(endpoint_key)
            .cloned()
            .unwrap_or_default())
    }
}
