//! Session service
//!
//! Handles one user's interaction with the platform:
//! - Authenticating and listing the jobs the credential can see
//! - Selecting a job and turning its input schema into a form
//! - Editing form values
//! - Running the selected job and following the run to its results
//!
//! Every transition is published as a [`StatusView`].

use relay_core::domain::credential::Credential;
use relay_core::domain::field::FieldDescriptor;
use relay_core::domain::job::JobDefinition;
use relay_core::domain::run::{ResultSet, RunState};
use relay_core::error::{RelayError, Result};
use relay_core::form::{FormValues, normalize};
use relay_core::status::{SessionAction, SessionPhase, StatusView, project};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::repository::{HttpPlatformRepository, PlatformRepository};
use crate::scheduler::{RunOrchestrator, RunOutcome, RunRequest, RunSnapshot};

#[derive(Default)]
struct SessionState {
    credential: Option<Credential>,
    jobs: Vec<JobDefinition>,
    selected: Option<String>,
    /// Set once the selected job's schema has been loaded and normalized
    schema_ready: bool,
    fields: Vec<FieldDescriptor>,
    form: FormValues,
}

/// A user session against the platform
pub struct Session {
    repository: Arc<dyn PlatformRepository>,
    orchestrator: RunOrchestrator,
    state: RwLock<SessionState>,
    /// Bumped by authentication and job selection; stale schema or job
    /// answers are dropped
    epoch: AtomicU64,
    phase: watch::Sender<SessionPhase>,
    status: watch::Sender<StatusView>,
}

impl Session {
    /// Creates a new session
    pub fn new(repository: Arc<dyn PlatformRepository>, config: &Config) -> Self {
        let orchestrator = RunOrchestrator::new(repository.clone(), config);
        let (phase, _) = watch::channel(SessionPhase::Idle);
        let (status, _) = watch::channel(project(&SessionPhase::Idle));

        Self {
            repository,
            orchestrator,
            state: RwLock::new(SessionState::default()),
            epoch: AtomicU64::new(0),
            phase,
            status,
        }
    }

    /// Creates a session talking to the platform over HTTP
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let repository = HttpPlatformRepository::from_config(config)?;
        Ok(Self::new(Arc::new(repository), config))
    }

    /// Validate a token and list the jobs it can see
    ///
    /// Clears the previous selection, form and results. An empty job list
    /// is not an error; the status carries the advisory message instead.
    pub async fn authenticate(&self, token: &str) -> Result<Vec<JobDefinition>> {
        let credential = Credential::new(token)?;
        let epoch = self.bump_epoch();
        self.orchestrator.cancel();

        *self.state.write().await = SessionState::default();
        self.set_phase(SessionPhase::Authenticating);

        let jobs = match self.repository.list_jobs(&credential).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!("Authentication failed: {}", err);
                if self.is_current(epoch) {
                    self.fail(SessionAction::FetchJobs, err.clone());
                }
                return Err(err);
            }
        };

        if self.is_current(epoch) {
            info!("Authenticated, {} job(s) visible", jobs.len());
            let mut state = self.state.write().await;
            state.credential = Some(credential);
            state.jobs = jobs.clone();
            self.set_phase(SessionPhase::JobsLoaded { count: jobs.len() });
        }
        Ok(jobs)
    }

    /// List the jobs again with the current credential
    pub async fn refresh_jobs(&self) -> Result<Vec<JobDefinition>> {
        let credential = self.credential().await?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.set_phase(SessionPhase::Listing);

        match self.repository.list_jobs(&credential).await {
            Ok(jobs) => {
                if self.is_current(epoch) {
                    self.state.write().await.jobs = jobs.clone();
                    self.set_phase(SessionPhase::JobsLoaded { count: jobs.len() });
                }
                Ok(jobs)
            }
            Err(err) => {
                warn!("Listing jobs failed: {}", err);
                if self.is_current(epoch) {
                    self.fail(SessionAction::FetchJobs, err.clone());
                }
                Err(err)
            }
        }
    }

    /// Select a job and load its input form
    ///
    /// Any run in flight is cancelled. Fails with
    /// [`RelayError::Precondition`] for a job that is not in the list.
    pub async fn select_job(&self, job_id: &str) -> Result<()> {
        let credential = {
            let state = self.state.read().await;
            if !state.jobs.iter().any(|job| job.id == job_id) {
                return Err(RelayError::Precondition(format!(
                    "unknown job '{}'",
                    job_id
                )));
            }
            state
                .credential
                .clone()
                .ok_or_else(|| RelayError::Precondition("no API token provided".to_string()))?
        };

        let epoch = self.bump_epoch();
        self.orchestrator.cancel();
        {
            let mut state = self.state.write().await;
            state.selected = Some(job_id.to_string());
            state.schema_ready = false;
            state.fields = Vec::new();
            state.form = FormValues::default();
        }
        self.set_phase(SessionPhase::LoadingSchema {
            job_id: job_id.to_string(),
        });

        let loaded = self
            .repository
            .fetch_schema(&credential, job_id)
            .await
            .and_then(|schema| schema.as_ref().map(normalize).transpose());

        if !self.is_current(epoch) {
            debug!("Discarding schema of job {}, selection changed", job_id);
            return Ok(());
        }

        match loaded {
            Ok(fields) => {
                let field_count = fields.as_ref().map(Vec::len);
                let fields = fields.unwrap_or_default();
                info!("Loaded {} input field(s) for job {}", fields.len(), job_id);

                let mut state = self.state.write().await;
                state.form = FormValues::initialize(&fields);
                state.fields = fields;
                state.schema_ready = true;
                self.set_phase(SessionPhase::SchemaLoaded { field_count });
                Ok(())
            }
            Err(err) => {
                warn!("Loading input schema of job {} failed: {}", job_id, err);
                self.fail(SessionAction::FetchSchema, err.clone());
                Err(err)
            }
        }
    }

    /// Apply one edit to the form
    ///
    /// A rejected edit leaves every value as it was.
    pub async fn edit_field(&self, key: &str, raw: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.form = state.form.apply_edit(key, raw)?;
        Ok(())
    }

    /// Run the selected job with the current form values
    ///
    /// Resolves once the run is done, has errored or was superseded. Status
    /// updates are published while it is in flight. Fails with
    /// [`RelayError::Precondition`] while the selected job's schema is still
    /// loading or after it failed to load.
    pub async fn run(&self) -> Result<RunOutcome> {
        let request = {
            let state = self.state.read().await;
            if state.selected.is_some() && !state.schema_ready {
                return Err(RelayError::Precondition(
                    "input schema not loaded".to_string(),
                ));
            }
            RunRequest::prepare(
                state.credential.as_ref(),
                state.selected.as_deref(),
                &state.form,
            )?
        };

        let mut updates = self.orchestrator.subscribe();
        let baseline = updates.borrow_and_update().generation;
        let mut tracked = None;

        let run = self.orchestrator.run(request);
        tokio::pin!(run);

        let mut watching = true;
        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome?,
                changed = updates.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    self.forward(snapshot, baseline, &mut tracked);
                }
            }
        };

        // The last transitions may have landed after the final wakeup
        self.forward(self.orchestrator.current(), baseline, &mut tracked);
        Ok(outcome)
    }

    /// Cancel the run in flight, if any
    pub fn cancel_run(&self) -> bool {
        self.orchestrator.cancel()
    }

    /// Current status view
    pub fn status(&self) -> StatusView {
        self.status.borrow().clone()
    }

    /// Subscribe to status views; unchanged views are not re-sent
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.status.subscribe()
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.phase.borrow().clone()
    }

    pub async fn jobs(&self) -> Vec<JobDefinition> {
        self.state.read().await.jobs.clone()
    }

    pub async fn selected_job(&self) -> Option<String> {
        self.state.read().await.selected.clone()
    }

    pub async fn fields(&self) -> Vec<FieldDescriptor> {
        self.state.read().await.fields.clone()
    }

    pub async fn form(&self) -> FormValues {
        self.state.read().await.form.clone()
    }

    /// Records of the last completed run
    pub fn results(&self) -> Option<ResultSet> {
        self.orchestrator.current().state.results().cloned()
    }

    async fn credential(&self) -> Result<Credential> {
        self.state
            .read()
            .await
            .credential
            .clone()
            .ok_or_else(|| RelayError::Precondition("no API token provided".to_string()))
    }

    /// Publish the run state of the generation this call started
    fn forward(&self, snapshot: RunSnapshot, baseline: u64, tracked: &mut Option<u64>) {
        if snapshot.generation <= baseline || snapshot.state == RunState::Idle {
            return;
        }
        let generation = *tracked.get_or_insert(snapshot.generation);
        if snapshot.generation == generation {
            self.set_phase(SessionPhase::Run(snapshot.state));
        }
    }

    fn fail(&self, action: SessionAction, error: RelayError) {
        self.set_phase(SessionPhase::Failed { action, error });
    }

    fn set_phase(&self, phase: SessionPhase) {
        let view = project(&phase);
        self.phase.send_replace(phase);
        self.status.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;
    use relay_core::domain::run::{RunStatus, RunStatusReport};
    use relay_core::status::StatusKind;
    use serde_json::json;

    fn session(platform: &Arc<FakePlatform>) -> Arc<Session> {
        Arc::new(Session::new(platform.clone(), &Config::default()))
    }

    fn jobs() -> Vec<JobDefinition> {
        vec![
            JobDefinition::new("job-1", Some("web-scraper".to_string())),
            JobDefinition::new("job-2", None),
        ]
    }

    fn report(status: RunStatus) -> Result<RunStatusReport> {
        Ok(RunStatusReport {
            status,
            default_dataset_id: Some("ds-1".to_string()),
        })
    }

    fn scraper_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": { "type": "string", "title": "Search query" },
                "maxPages": { "type": "integer", "default": 3 },
                "headless": { "type": "boolean", "default": true },
                "urls": { "type": "array" }
            }
        })
    }

    async fn ready_session(platform: &Arc<FakePlatform>) -> Arc<Session> {
        platform.set_jobs(Ok(jobs()));
        platform.set_schema("job-1", Ok(Some(scraper_schema())));
        let session = session(platform);
        session.authenticate("token").await.unwrap();
        session.select_job("job-1").await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_authenticate_lists_jobs() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        let session = session(&platform);

        let listed = session.authenticate("  token  ").await.unwrap();

        assert_eq!(listed, jobs());
        assert_eq!(session.jobs().await, jobs());
        let status = session.status();
        assert_eq!(status.kind, StatusKind::Idle);
        assert!(!status.loading);
        assert_eq!(status.message, "Jobs loaded successfully.");
    }

    #[tokio::test]
    async fn test_zero_jobs_is_advisory() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(Vec::new()));
        let session = session(&platform);

        let listed = session.authenticate("token").await.unwrap();

        assert!(listed.is_empty());
        let status = session.status();
        assert_eq!(status.kind, StatusKind::Idle);
        assert_eq!(
            status.message,
            "Authentication successful, but no jobs were found."
        );
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let platform = FakePlatform::new();
        platform.set_jobs(Err(RelayError::Auth("Invalid token".to_string())));
        let session = session(&platform);

        let err = session.authenticate("bad").await.unwrap_err();

        assert_eq!(err, RelayError::Auth("Invalid token".to_string()));
        let status = session.status();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Failed to fetch jobs: Invalid token");
        assert!(matches!(
            session.refresh_jobs().await,
            Err(RelayError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_token_is_rejected_locally() {
        let platform = FakePlatform::new();
        let session = session(&platform);

        assert!(matches!(
            session.authenticate("   ").await,
            Err(RelayError::Precondition(_))
        ));
        assert!(platform.calls().is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_refresh_jobs() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(Vec::new()));
        let session = session(&platform);
        session.authenticate("token").await.unwrap();

        platform.set_jobs(Ok(jobs()));
        assert_eq!(session.refresh_jobs().await.unwrap().len(), 2);
        assert_eq!(session.status().message, "Jobs loaded successfully.");
        assert_eq!(platform.calls(), vec!["list", "list"]);
    }

    #[tokio::test]
    async fn test_select_job_builds_form() {
        let platform = FakePlatform::new();
        let session = ready_session(&platform).await;

        let keys: Vec<String> = session.fields().await.into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["query", "maxPages", "headless", "urls"]);

        let form = session.form().await;
        assert_eq!(form.keys().collect::<Vec<_>>(), keys);
        assert_eq!(session.status().message, "Input schema loaded.");
        assert_eq!(session.selected_job().await.as_deref(), Some("job-1"));
    }

    #[tokio::test]
    async fn test_select_unknown_job() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        let session = session(&platform);
        session.authenticate("token").await.unwrap();

        assert!(matches!(
            session.select_job("job-9").await,
            Err(RelayError::Precondition(_))
        ));
        assert_eq!(session.selected_job().await, None);
    }

    #[tokio::test]
    async fn test_schema_failure_is_reported() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        platform.set_schema("job-2", Ok(Some(json!({"properties": ["not", "a", "map"]}))));
        let session = session(&platform);
        session.authenticate("token").await.unwrap();

        let err = session.select_job("job-2").await.unwrap_err();

        assert!(matches!(err, RelayError::Schema(_)));
        let status = session.status();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.message.starts_with("Failed to fetch input schema: "));
        assert!(session.fields().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_without_schema_runs_with_empty_input() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        platform.script_polls("run-1", vec![report(RunStatus::Succeeded)]);
        platform.set_results("ds-1", vec![json!({"ok": true})]);
        let session = session(&platform);
        session.authenticate("token").await.unwrap();

        session.select_job("job-2").await.unwrap();
        assert!(session.fields().await.is_empty());
        assert_eq!(session.status().message, "This job takes no parameters.");

        let outcome = session.run().await.unwrap();

        assert!(matches!(outcome, RunOutcome::Finished(RunState::Done { .. })));
        assert_eq!(platform.last_payload(), Some(serde_json::Map::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run() {
        let platform = FakePlatform::new();
        platform.script_polls(
            "run-1",
            vec![
                report(RunStatus::Running),
                report(RunStatus::Running),
                report(RunStatus::Succeeded),
            ],
        );
        platform.set_results("ds-1", vec![json!({"title": "a"}), json!({"title": "b"})]);
        let session = ready_session(&platform).await;

        session.edit_field("query", "rust async").await.unwrap();
        session.edit_field("maxPages", "10").await.unwrap();
        session.edit_field("headless", "off").await.unwrap();
        session.edit_field("urls", r#"["https://example.com"]"#).await.unwrap();

        let mut statuses = session.subscribe();
        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while statuses.changed().await.is_ok() {
                seen.push(statuses.borrow_and_update().message.clone());
            }
            seen
        });

        session.run().await.unwrap();

        let status = session.status();
        assert_eq!(status.kind, StatusKind::Succeeded);
        assert!(!status.loading);
        assert_eq!(status.message, "Run complete.");
        assert_eq!(
            session.results(),
            Some(vec![json!({"title": "a"}), json!({"title": "b"})])
        );
        assert_eq!(
            platform.last_payload().map(serde_json::Value::Object),
            Some(json!({
                "query": "rust async",
                "maxPages": 10,
                "headless": false,
                "urls": ["https://example.com"]
            }))
        );

        drop(session);
        let seen = watcher.await.unwrap();
        assert!(seen.contains(&"Run started with ID: run-1. Waiting for results...".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_status() {
        let platform = FakePlatform::new();
        platform.script_polls("run-1", vec![report(RunStatus::Failed)]);
        let session = ready_session(&platform).await;

        session.run().await.unwrap();

        let status = session.status();
        assert_eq!(status.kind, StatusKind::Failed);
        assert!(status.message.contains("failed"));
        assert_eq!(platform.result_fetches(), 0);
        assert_eq!(session.results(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_error_status() {
        let platform = FakePlatform::new();
        platform.reject_submissions("Input is not valid");
        let session = ready_session(&platform).await;

        session.run().await.unwrap();

        let status = session.status();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Failed to run job: Input is not valid");
    }

    #[tokio::test]
    async fn test_run_requires_selection() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        let session = session(&platform);

        assert!(matches!(
            session.run().await,
            Err(RelayError::Precondition(_))
        ));

        session.authenticate("token").await.unwrap();
        assert!(matches!(
            session.run().await,
            Err(RelayError::Precondition(_))
        ));
        assert!(!platform.calls().iter().any(|c| c.starts_with("submit")));
    }

    #[tokio::test]
    async fn test_run_refused_after_schema_failure() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        platform.set_schema(
            "job-1",
            Err(RelayError::Transport("connection reset".to_string())),
        );
        let session = session(&platform);
        session.authenticate("token").await.unwrap();

        assert!(session.select_job("job-1").await.is_err());
        assert_eq!(session.selected_job().await.as_deref(), Some("job-1"));

        assert_eq!(
            session.run().await.unwrap_err(),
            RelayError::Precondition("input schema not loaded".to_string())
        );
        assert!(!platform.calls().iter().any(|c| c.starts_with("submit")));
        assert_eq!(platform.last_payload(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refused_while_schema_loads() {
        let platform = FakePlatform::new();
        platform.set_jobs(Ok(jobs()));
        platform.set_schema("job-1", Ok(Some(scraper_schema())));
        platform.script_polls("run-1", vec![report(RunStatus::Succeeded)]);
        platform.set_results("ds-1", Vec::new());
        let gate = platform.hold_schema("job-1");
        let session = session(&platform);
        session.authenticate("token").await.unwrap();

        let selecting = tokio::spawn({
            let session = session.clone();
            async move { session.select_job("job-1").await }
        });
        gate.entered.notified().await;

        assert_eq!(
            session.run().await.unwrap_err(),
            RelayError::Precondition("input schema not loaded".to_string())
        );
        assert!(!platform.calls().iter().any(|c| c.starts_with("submit")));

        gate.release.notify_one();
        selecting.await.unwrap().unwrap();
        session.edit_field("query", "rust").await.unwrap();

        let outcome = session.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Finished(RunState::Done { .. })));
        assert_eq!(
            platform
                .last_payload()
                .and_then(|payload| payload.get("query").cloned()),
            Some(json!("rust"))
        );
    }

    #[tokio::test]
    async fn test_invalid_number_blocks_run() {
        let platform = FakePlatform::new();
        let session = ready_session(&platform).await;
        session.edit_field("maxPages", "ten").await.unwrap();
        let before = session.status();

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, RelayError::InvalidInput { ref key, .. } if key == "maxPages"));
        assert_eq!(session.status(), before);
        assert!(!platform.calls().iter().any(|c| c.starts_with("submit")));
    }

    #[tokio::test]
    async fn test_rejected_edit_keeps_values() {
        let platform = FakePlatform::new();
        let session = ready_session(&platform).await;
        session.edit_field("headless", "no").await.unwrap();
        let before = session.form().await;

        assert!(matches!(
            session.edit_field("headless", "maybe").await,
            Err(RelayError::InvalidInput { .. })
        ));
        assert!(matches!(
            session.edit_field("missing", "x").await,
            Err(RelayError::UnknownField(_))
        ));
        assert_eq!(session.form().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selecting_another_job_cancels_run() {
        let platform = FakePlatform::new();
        platform.script_polls("run-1", vec![report(RunStatus::Running)]);
        let session = ready_session(&platform).await;

        let mut statuses = session.subscribe();
        let run = tokio::spawn({
            let session = session.clone();
            async move { session.run().await }
        });
        statuses
            .wait_for(|view| view.message.starts_with("Run started with ID"))
            .await
            .unwrap();

        session.select_job("job-2").await.unwrap();

        assert_eq!(run.await.unwrap().unwrap(), RunOutcome::Superseded);
        assert_eq!(session.status().message, "This job takes no parameters.");
        assert_eq!(session.results(), None);
        assert_eq!(platform.polls("run-1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_run_mid_poll() {
        let platform = FakePlatform::new();
        platform.script_polls("run-1", vec![report(RunStatus::Running)]);
        platform.set_results("ds-1", vec![json!({"title": "a"})]);
        let session = ready_session(&platform).await;

        let mut statuses = session.subscribe();
        let run = tokio::spawn({
            let session = session.clone();
            async move { session.run().await }
        });
        statuses
            .wait_for(|view| view.message.starts_with("Run started with ID"))
            .await
            .unwrap();

        assert!(session.cancel_run());

        assert_eq!(run.await.unwrap().unwrap(), RunOutcome::Superseded);
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert_eq!(platform.polls("run-1"), 0);
        assert_eq!(platform.result_fetches(), 0);
        assert_eq!(session.results(), None);
        assert!(!session.cancel_run());
    }
}
