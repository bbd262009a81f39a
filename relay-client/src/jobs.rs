//! Job discovery endpoints

use relay_core::domain::credential::Credential;
use relay_core::domain::job::JobDefinition;
use relay_core::dto::job::JobList;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::PlatformClient;
use crate::error::{ClientError, Result};

impl PlatformClient {
    // =============================================================================
    // Job Discovery
    // =============================================================================

    /// List the job definitions visible to a credential
    ///
    /// # Arguments
    /// * `credential` - The API token
    /// * `limit` - Maximum number of jobs to return
    ///
    /// # Returns
    /// The jobs in platform order; an empty list is a valid answer
    pub async fn list_jobs(&self, credential: &Credential, limit: usize) -> Result<Vec<JobDefinition>> {
        let url = self.endpoint(&["jobs"])?;
        debug!("Listing jobs (limit {})", limit);

        let request = self.client.get(url).query(&[("limit", limit)]);
        let response = self.authorize(request, credential).send().await?;

        let list: JobList = self.handle_response(response).await?;
        Ok(list.items.into_iter().map(JobDefinition::from).collect())
    }

    /// Fetch the input schema of a job
    ///
    /// A job without a schema, one whose schema is an empty object, and a
    /// non-success answer from the schema endpoint all yield `Ok(None)`.
    /// Only transport and decoding failures are errors.
    ///
    /// # Arguments
    /// * `credential` - The API token
    /// * `job_id` - The job whose schema to fetch
    pub async fn fetch_schema(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<Option<JsonValue>> {
        let url = self.endpoint(&["jobs", job_id, "input-schema"])?;
        debug!("Fetching input schema of job {}", job_id);

        let response = self
            .authorize(self.client.get(url), credential)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Schema endpoint answered {} for job {}, treating schema as absent",
                status, job_id
            );
            return Ok(None);
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| {
                ClientError::ParseError(format!("Failed to parse input schema: {}", e.without_url()))
            })?;

        extract_schema(body)
    }
}

/// Unwrap a schema from the shapes the platform may answer with
///
/// Accepts a bare schema object, a `{data: {inputSchema}}` envelope, a
/// `{data: schema}` envelope, and a schema serialized as a JSON string.
fn extract_schema(body: JsonValue) -> Result<Option<JsonValue>> {
    let schema = match body {
        JsonValue::Object(mut map) => match map.remove("data") {
            Some(JsonValue::Object(mut data)) => match data.remove("inputSchema") {
                Some(schema) => schema,
                None => JsonValue::Object(data),
            },
            Some(other) => other,
            None => JsonValue::Object(map),
        },
        other => other,
    };

    let schema = match schema {
        JsonValue::String(text) if text.trim().is_empty() => JsonValue::Null,
        JsonValue::String(text) => serde_json::from_str(&text).map_err(|e| {
            ClientError::ParseError(format!("Input schema is not valid JSON: {}", e))
        })?,
        other => other,
    };

    match schema {
        JsonValue::Null => Ok(None),
        JsonValue::Object(map) if map.is_empty() => Ok(None),
        other => Ok(Some(other)),
    }
}
