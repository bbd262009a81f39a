//! Platform repository
//!
//! Handles communication with the platform for everything a session needs:
//! - Listing job definitions
//! - Fetching input schemas
//! - Submitting runs, polling their status and fetching their results

use anyhow::Context;
use async_trait::async_trait;
use relay_client::{ClientError, PlatformClient};
use relay_core::domain::credential::Credential;
use relay_core::domain::job::JobDefinition;
use relay_core::domain::run::{ResultSet, RunHandle, RunStatusReport};
use relay_core::error::{RelayError, Result};
use serde_json::{Map, Value as JsonValue};

use crate::config::Config;

/// Repository trait for platform operations
///
/// Every method is a single request/response without retries.
#[async_trait]
pub trait PlatformRepository: Send + Sync {
    /// Lists the job definitions visible to the credential
    ///
    /// Fails with [`RelayError::Auth`] when the credential is rejected. An
    /// empty list is a valid answer.
    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<JobDefinition>>;

    /// Fetches the raw input schema of a job
    ///
    /// A job without a usable schema yields `Ok(None)`.
    async fn fetch_schema(&self, credential: &Credential, job_id: &str)
    -> Result<Option<JsonValue>>;

    /// Submits a run of a job
    ///
    /// Fails with [`RelayError::Submission`] when the platform rejects it.
    async fn submit_run(
        &self,
        credential: &Credential,
        job_id: &str,
        payload: &Map<String, JsonValue>,
    ) -> Result<RunHandle>;

    /// Checks the status of a run
    ///
    /// Fails with [`RelayError::Transport`] on network or decoding failure.
    async fn poll_run_status(
        &self,
        credential: &Credential,
        handle: &RunHandle,
    ) -> Result<RunStatusReport>;

    /// Fetches the output records of a succeeded run
    ///
    /// # Arguments
    /// * `handle` - The run the results belong to
    /// * `dataset_id` - The dataset reported by the succeeded status check
    async fn fetch_results(
        &self,
        credential: &Credential,
        handle: &RunHandle,
        dataset_id: &str,
    ) -> Result<ResultSet>;
}

/// HTTP implementation of PlatformRepository
pub struct HttpPlatformRepository {
    client: PlatformClient,
    list_limit: usize,
}

impl HttpPlatformRepository {
    /// Creates a new HTTP platform repository
    ///
    /// # Arguments
    /// * `client` - The platform client to send requests with
    /// * `list_limit` - Maximum number of jobs requested when listing
    pub fn new(client: PlatformClient, list_limit: usize) -> Self {
        Self { client, list_limit }
    }

    /// Creates a repository whose requests honor the configured timeout
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(
            PlatformClient::with_client(config.api_url.clone(), http_client),
            config.list_limit,
        ))
    }
}

#[async_trait]
impl PlatformRepository for HttpPlatformRepository {
    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<JobDefinition>> {
        self.client
            .list_jobs(credential, self.list_limit)
            .await
            .map_err(|err| {
                if err.is_unauthorized() {
                    RelayError::Auth(err.remote_message())
                } else {
                    transport(err)
                }
            })
    }

    async fn fetch_schema(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<Option<JsonValue>> {
        self.client
            .fetch_schema(credential, job_id)
            .await
            .map_err(|err| match err {
                ClientError::ParseError(message) => RelayError::Schema(message),
                other => transport(other),
            })
    }

    async fn submit_run(
        &self,
        credential: &Credential,
        job_id: &str,
        payload: &Map<String, JsonValue>,
    ) -> Result<RunHandle> {
        self.client
            .submit_run(credential, job_id, payload)
            .await
            .map_err(|err| match err {
                ClientError::ApiError { .. } if err.is_unauthorized() => {
                    RelayError::Auth(err.remote_message())
                }
                // An outage is not a rejection of this submission
                ClientError::ApiError { .. } if err.is_server_error() => transport(err),
                ClientError::ApiError { .. } => RelayError::Submission(err.remote_message()),
                other => transport(other),
            })
    }

    async fn poll_run_status(
        &self,
        credential: &Credential,
        handle: &RunHandle,
    ) -> Result<RunStatusReport> {
        self.client
            .get_run_status(credential, handle)
            .await
            .map_err(transport)
    }

    async fn fetch_results(
        &self,
        credential: &Credential,
        _handle: &RunHandle,
        dataset_id: &str,
    ) -> Result<ResultSet> {
        self.client
            .fetch_results(credential, dataset_id)
            .await
            .map_err(transport)
    }
}

fn transport(err: ClientError) -> RelayError {
    RelayError::Transport(err.remote_message())
}
