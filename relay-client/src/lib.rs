//! Relay HTTP Client
//!
//! A simple, type-safe HTTP client for the job-execution platform API.
//!
//! Every call is a single request/response authenticated with a
//! [`Credential`] passed as the `token` query parameter. The client never
//! retries on its own; retry decisions belong to the caller.
//!
//! # Example
//!
//! ```no_run
//! use relay_client::PlatformClient;
//! use relay_core::domain::credential::Credential;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PlatformClient::new("https://api.example.com/v2");
//!     let credential = Credential::new("my-token")?;
//!
//!     for job in client.list_jobs(&credential, 100).await? {
//!         println!("{}", job);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use relay_core::domain::credential::Credential;
use relay_core::dto::Envelope;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the platform API
///
/// This client provides methods for the endpoints Relay needs, organized
/// into logical groups:
/// - Job discovery (list jobs, fetch input schema)
/// - Run lifecycle (submit, poll status, fetch results)
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// Base URL of the platform API (e.g., "https://api.example.com/v2")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl PlatformClient {
    /// Create a new platform client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the platform API
    ///
    /// # Example
    /// ```
    /// use relay_client::PlatformClient;
    ///
    /// let client = PlatformClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new platform client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use relay_client::PlatformClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = PlatformClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the platform
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL below the base URL
    ///
    /// Each segment is percent-encoded on its own, so ids containing `/`,
    /// `?` or `#` stay a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the credential to a request
    fn authorize(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request.query(&[("token", credential.expose())])
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an enveloped API response and return its `data`
    ///
    /// A non-success status or an `error` member in the body both become
    /// [`ClientError::ApiError`], carrying the platform message when present.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::api_error(status.as_u16(), fallback_message(&body)));
            }
            Err(e) => {
                return Err(ClientError::ParseError(format!(
                    "Failed to parse JSON response: {}",
                    e
                )));
            }
        };

        if !status.is_success() || envelope.error.is_some() {
            let message = envelope
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback_message(&body));
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        envelope
            .data
            .ok_or_else(|| ClientError::ParseError("Response has no `data` member".to_string()))
    }

    /// Handle an API response whose body is the payload itself
    async fn handle_raw_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&error_text)
                .ok()
                .and_then(|env| env.error_message().map(str::to_string))
                .unwrap_or(error_text);
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| {
                ClientError::ParseError(format!(
                    "Failed to parse JSON response: {}",
                    e.without_url()
                ))
            })
    }
}

fn fallback_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        "Unknown error".to_string()
    } else {
        body.to_string()
    }
}
