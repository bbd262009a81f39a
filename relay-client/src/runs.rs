//! Run lifecycle endpoints

use relay_core::domain::credential::Credential;
use relay_core::domain::run::{ResultSet, RunHandle, RunStatusReport};
use relay_core::dto::run::{RunCreated, RunDetails};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::PlatformClient;
use crate::error::Result;

impl PlatformClient {
    // =============================================================================
    // Run Lifecycle
    // =============================================================================

    /// Submit a run of a job
    ///
    /// # Arguments
    /// * `credential` - The API token
    /// * `job_id` - The job to run
    /// * `payload` - The run input, sent as the JSON body
    ///
    /// # Returns
    /// The handle identifying the new run
    ///
    /// # Example
    /// ```no_run
    /// # use relay_client::PlatformClient;
    /// # use relay_core::domain::credential::Credential;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = PlatformClient::new("http://localhost:8080");
    /// let credential = Credential::new("my-token")?;
    /// let mut payload = serde_json::Map::new();
    /// payload.insert("query".to_string(), "rust".into());
    ///
    /// let handle = client.submit_run(&credential, "web-scraper", &payload).await?;
    /// println!("Started run {}", handle.run_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit_run(
        &self,
        credential: &Credential,
        job_id: &str,
        payload: &Map<String, JsonValue>,
    ) -> Result<RunHandle> {
        let url = self.endpoint(&["jobs", job_id, "runs"])?;
        debug!("Submitting run of job {} ({} input fields)", job_id, payload.len());

        let response = self
            .authorize(self.client.post(url), credential)
            .json(payload)
            .send()
            .await?;

        let created: RunCreated = self.handle_response(response).await?;
        Ok(created.into())
    }

    /// Fetch the current status of a run
    ///
    /// # Arguments
    /// * `credential` - The API token
    /// * `handle` - The run to check
    pub async fn get_run_status(
        &self,
        credential: &Credential,
        handle: &RunHandle,
    ) -> Result<RunStatusReport> {
        let url = self.endpoint(&[
            "jobs",
            handle.owner_job_id.as_str(),
            "runs",
            handle.run_id.as_str(),
        ])?;

        let response = self
            .authorize(self.client.get(url), credential)
            .send()
            .await?;

        let details: RunDetails = self.handle_response(response).await?;
        debug!("Run {} reported status {}", handle.run_id, details.status);
        Ok(details.into())
    }

    /// Fetch the output records of a finished run
    ///
    /// # Arguments
    /// * `credential` - The API token
    /// * `dataset_id` - The dataset reported by the succeeded run
    ///
    /// # Returns
    /// The records in dataset order
    pub async fn fetch_results(&self, credential: &Credential, dataset_id: &str) -> Result<ResultSet> {
        let url = self.endpoint(&["datasets", dataset_id, "items"])?;
        debug!("Fetching items of dataset {}", dataset_id);

        let response = self
            .authorize(self.client.get(url), credential)
            .send()
            .await?;

        self.handle_raw_response(response).await
    }
}
