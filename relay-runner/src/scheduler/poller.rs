//! Run orchestrator
//!
//! Submits a run, then checks its status at a fixed interval until the
//! platform reports a terminal status, then fetches the results.
//!
//! State lives in a `watch` channel together with a generation counter.
//! Every transition names the generation it belongs to and is dropped when
//! a newer run (or a cancellation) has bumped the counter in the meantime,
//! so a stale answer can never overwrite newer state.

use relay_core::domain::credential::Credential;
use relay_core::domain::run::{RunFailure, RunHandle, RunState, RunStatus};
use relay_core::error::{RelayError, Result};
use relay_core::form::FormValues;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::{Config, OverlapPolicy};
use crate::repository::PlatformRepository;

/// Orchestrator state tagged with the run generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub generation: u64,
    pub state: RunState,
}

/// Everything needed to submit a run, validated up front
#[derive(Debug, Clone)]
pub struct RunRequest {
    credential: Credential,
    job_id: String,
    payload: Map<String, JsonValue>,
}

impl RunRequest {
    /// Check run preconditions and snapshot the form into a payload
    ///
    /// Fails with [`RelayError::Precondition`] when no credential or no job
    /// is available, and with the form's own error when the payload cannot
    /// be built.
    pub fn prepare(
        credential: Option<&Credential>,
        job_id: Option<&str>,
        form: &FormValues,
    ) -> Result<Self> {
        let credential = credential
            .cloned()
            .ok_or_else(|| RelayError::Precondition("no API token provided".to_string()))?;
        let job_id = job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::Precondition("no job selected".to_string()))?;
        let payload = form.to_payload()?;

        Ok(Self {
            credential,
            job_id: job_id.to_string(),
            payload,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn payload(&self) -> &Map<String, JsonValue> {
        &self.payload
    }
}

/// How a call to [`RunOrchestrator::run`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run reached `Done` or `Errored`
    Finished(RunState),
    /// A newer run or a cancellation invalidated this one
    Superseded,
}

/// Drives one run at a time from submission to results
pub struct RunOrchestrator {
    repository: Arc<dyn PlatformRepository>,
    poll_interval: Duration,
    max_poll_attempts: u32,
    overlap_policy: OverlapPolicy,
    state: watch::Sender<RunSnapshot>,
}

impl RunOrchestrator {
    /// Creates a new orchestrator
    pub fn new(repository: Arc<dyn PlatformRepository>, config: &Config) -> Self {
        let (state, _) = watch::channel(RunSnapshot {
            generation: 0,
            state: RunState::Idle,
        });

        Self {
            repository,
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
            overlap_policy: config.overlap_policy,
            state,
        }
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state.subscribe()
    }

    /// Current state
    pub fn current(&self) -> RunSnapshot {
        self.state.borrow().clone()
    }

    /// Invalidate the current run and return to `Idle`
    ///
    /// Returns whether a run was in flight.
    pub fn cancel(&self) -> bool {
        let mut was_active = false;
        self.state.send_modify(|snapshot| {
            was_active = snapshot.state.is_active();
            snapshot.generation += 1;
            snapshot.state = RunState::Idle;
        });
        if was_active {
            info!("Cancelled in-flight run");
        }
        was_active
    }

    /// Submit a run and drive it to a terminal state
    ///
    /// Remote failures end the run in `Errored` and are reported through the
    /// returned state; only a rejected start (see [`OverlapPolicy::Reject`])
    /// is returned as an error, in which case the state is left untouched.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        let generation = self.begin(&request.job_id)?;
        let RunRequest {
            credential,
            job_id,
            payload,
        } = request;

        info!("Submitting run of job {} (generation {})", job_id, generation);

        let handle = match self
            .repository
            .submit_run(&credential, &job_id, &payload)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                warn!("Run submission for job {} failed: {}", job_id, err);
                return Ok(self.finish(
                    generation,
                    RunState::Errored {
                        handle: None,
                        failure: RunFailure::Remote(err),
                    },
                ));
            }
        };

        info!("Run {} started for job {}", handle.run_id, handle.owner_job_id);
        if !self.transition(
            generation,
            RunState::Polling {
                handle: handle.clone(),
                attempts: 0,
            },
        ) {
            return Ok(RunOutcome::Superseded);
        }

        let mut attempts = 0;
        let report = loop {
            time::sleep(self.poll_interval).await;
            if self.is_stale(generation) {
                debug!("Run {} superseded, stopping poll loop", handle.run_id);
                return Ok(RunOutcome::Superseded);
            }

            let report = match self.repository.poll_run_status(&credential, &handle).await {
                Ok(report) => report,
                Err(err) => {
                    warn!("Status check of run {} failed: {}", handle.run_id, err);
                    return Ok(self.errored(generation, &handle, RunFailure::Remote(err)));
                }
            };
            attempts += 1;

            if report.status.is_terminal() {
                break report;
            }

            if attempts >= self.max_poll_attempts {
                warn!(
                    "Run {} still running after {} status checks, giving up",
                    handle.run_id, attempts
                );
                return Ok(self.errored(
                    generation,
                    &handle,
                    RunFailure::PollLimitExceeded { attempts },
                ));
            }

            debug!("Run {} still running ({} checks)", handle.run_id, attempts);
            if !self.transition(
                generation,
                RunState::Polling {
                    handle: handle.clone(),
                    attempts,
                },
            ) {
                return Ok(RunOutcome::Superseded);
            }
        };

        if report.status != RunStatus::Succeeded {
            info!("Run {} finished with status {}", handle.run_id, report.status);
            return Ok(self.errored(generation, &handle, RunFailure::Finished(report.status)));
        }

        let Some(dataset_id) = report.default_dataset_id else {
            let err = RelayError::Transport("succeeded run reported no dataset".to_string());
            return Ok(self.errored(generation, &handle, RunFailure::Remote(err)));
        };

        if !self.transition(
            generation,
            RunState::FetchingResults {
                handle: handle.clone(),
            },
        ) {
            return Ok(RunOutcome::Superseded);
        }

        match self
            .repository
            .fetch_results(&credential, &handle, &dataset_id)
            .await
        {
            Ok(results) => {
                info!("Run {} complete with {} record(s)", handle.run_id, results.len());
                Ok(self.finish(generation, RunState::Done { handle, results }))
            }
            Err(err) => {
                warn!("Fetching results of run {} failed: {}", handle.run_id, err);
                Ok(self.errored(generation, &handle, RunFailure::Remote(err)))
            }
        }
    }

    /// Open a new generation in `Submitting`, honoring the overlap policy
    fn begin(&self, job_id: &str) -> Result<u64> {
        let mut started = Err(RelayError::ConcurrentRun(String::new()));
        let policy = self.overlap_policy;

        self.state.send_if_modified(|snapshot| {
            if snapshot.state.is_active() {
                if policy == OverlapPolicy::Reject {
                    let run_id = snapshot
                        .state
                        .handle()
                        .map(|h| h.run_id.clone())
                        .unwrap_or_else(|| "pending submission".to_string());
                    started = Err(RelayError::ConcurrentRun(run_id));
                    return false;
                }
                info!("Superseding run of generation {}", snapshot.generation);
            }

            snapshot.generation += 1;
            snapshot.state = RunState::Submitting {
                job_id: job_id.to_string(),
            };
            started = Ok(snapshot.generation);
            true
        });

        started
    }

    /// Apply a state if `generation` is still current
    fn transition(&self, generation: u64, state: RunState) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.state = state;
            true
        })
    }

    fn finish(&self, generation: u64, state: RunState) -> RunOutcome {
        if self.transition(generation, state.clone()) {
            RunOutcome::Finished(state)
        } else {
            RunOutcome::Superseded
        }
    }

    fn errored(&self, generation: u64, handle: &RunHandle, failure: RunFailure) -> RunOutcome {
        self.finish(
            generation,
            RunState::Errored {
                handle: Some(handle.clone()),
                failure,
            },
        )
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.state.borrow().generation != generation
    }
}
