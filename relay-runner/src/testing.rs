//! In-memory platform used by the runner tests

use async_trait::async_trait;
use relay_core::domain::credential::Credential;
use relay_core::domain::job::JobDefinition;
use relay_core::domain::run::{ResultSet, RunHandle, RunStatus, RunStatusReport};
use relay_core::error::{RelayError, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::repository::PlatformRepository;

/// Holds the calls to one run or schema until released
#[derive(Clone, Default)]
pub struct Gate {
    /// Signalled when a held call has been issued
    pub entered: Arc<Notify>,
    /// Lets one held call answer
    pub release: Arc<Notify>,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct Inner {
    jobs: Option<Result<Vec<JobDefinition>>>,
    schemas: HashMap<String, Result<Option<JsonValue>>>,
    submission_error: Option<RelayError>,
    polls: HashMap<String, VecDeque<Result<RunStatusReport>>>,
    gates: HashMap<String, Gate>,
    schema_gates: HashMap<String, Gate>,
    results: HashMap<String, ResultSet>,
    payloads: Vec<Map<String, JsonValue>>,
    calls: Vec<String>,
    next_run: u32,
}

/// Scriptable [`PlatformRepository`]
///
/// Runs are numbered `run-1`, `run-2`, ... in submission order. A run whose
/// script is exhausted keeps reporting `Running`.
#[derive(Default)]
pub struct FakePlatform {
    inner: Mutex<Inner>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn set_jobs(&self, jobs: Result<Vec<JobDefinition>>) {
        self.lock().jobs = Some(jobs);
    }

    pub fn set_schema(&self, job_id: &str, schema: Result<Option<JsonValue>>) {
        self.lock().schemas.insert(job_id.to_string(), schema);
    }

    pub fn reject_submissions(&self, message: &str) {
        self.lock().submission_error = Some(RelayError::Submission(message.to_string()));
    }

    pub fn script_polls(&self, run_id: &str, answers: Vec<Result<RunStatusReport>>) {
        self.lock()
            .polls
            .entry(run_id.to_string())
            .or_default()
            .extend(answers);
    }

    pub fn hold_polls(&self, run_id: &str) -> Gate {
        let gate = Gate::default();
        self.lock().gates.insert(run_id.to_string(), gate.clone());
        gate
    }

    pub fn hold_schema(&self, job_id: &str) -> Gate {
        let gate = Gate::default();
        self.lock()
            .schema_gates
            .insert(job_id.to_string(), gate.clone());
        gate
    }

    pub fn set_results(&self, dataset_id: &str, results: ResultSet) {
        self.lock().results.insert(dataset_id.to_string(), results);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn polls(&self, run_id: &str) -> usize {
        let needle = format!("poll {}", run_id);
        self.lock().calls.iter().filter(|c| **c == needle).count()
    }

    pub fn result_fetches(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with("results "))
            .count()
    }

    pub fn last_payload(&self) -> Option<Map<String, JsonValue>> {
        self.lock().payloads.last().cloned()
    }
}

#[async_trait]
impl PlatformRepository for FakePlatform {
    async fn list_jobs(&self, _credential: &Credential) -> Result<Vec<JobDefinition>> {
        let mut inner = self.lock();
        inner.calls.push("list".to_string());
        inner.jobs.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_schema(
        &self,
        _credential: &Credential,
        job_id: &str,
    ) -> Result<Option<JsonValue>> {
        let gate = self.lock().schema_gates.get(job_id).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let mut inner = self.lock();
        inner.calls.push(format!("schema {}", job_id));
        inner.schemas.get(job_id).cloned().unwrap_or(Ok(None))
    }

    async fn submit_run(
        &self,
        _credential: &Credential,
        job_id: &str,
        payload: &Map<String, JsonValue>,
    ) -> Result<RunHandle> {
        let mut inner = self.lock();
        inner.calls.push(format!("submit {}", job_id));
        inner.payloads.push(payload.clone());
        if let Some(err) = inner.submission_error.clone() {
            return Err(err);
        }

        inner.next_run += 1;
        Ok(RunHandle {
            run_id: format!("run-{}", inner.next_run),
            owner_job_id: job_id.to_string(),
        })
    }

    async fn poll_run_status(
        &self,
        _credential: &Credential,
        handle: &RunHandle,
    ) -> Result<RunStatusReport> {
        let gate = self.lock().gates.get(&handle.run_id).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let mut inner = self.lock();
        inner.calls.push(format!("poll {}", handle.run_id));
        inner
            .polls
            .get_mut(&handle.run_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(RunStatusReport {
                status: RunStatus::Running,
                default_dataset_id: None,
            }))
    }

    async fn fetch_results(
        &self,
        _credential: &Credential,
        _handle: &RunHandle,
        dataset_id: &str,
    ) -> Result<ResultSet> {
        let mut inner = self.lock();
        inner.calls.push(format!("results {}", dataset_id));
        inner
            .results
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| RelayError::Transport(format!("dataset {} not found", dataset_id)))
    }
}
