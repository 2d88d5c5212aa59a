//! Proofwork HTTP Client
//!
//! A typed HTTP client for the Proofwork backend API used by the field app.
//!
//! The field engine depends on the [`JobApi`] trait rather than on the HTTP
//! client directly, so the job state machine and the sync reconciler can be
//! driven by an in-memory fake in tests.
//!
//! # Example
//!
//! ```no_run
//! use proofwork_client::{FieldApiClient, JobApi};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = FieldApiClient::new("http://localhost:8080");
//!
//!     let job = client.fetch_job_detail(Uuid::new_v4()).await?;
//!     println!("Job {} is {}", job.id, job.status);
//!     Ok(())
//! }
//! ```

mod api;
mod checklist;
pub mod error;
mod jobs;
mod photos;

// Re-export commonly used types
pub use api::JobApi;
pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the Proofwork backend API
///
/// Endpoints are grouped by concern:
/// - Job lifecycle (detail, check-in, check-out, report)
/// - Photos (list, upload)
/// - Checklist (bulk update, single item toggle)
#[derive(Debug, Clone)]
pub struct FieldApiClient {
    /// Base URL of the backend (e.g., "http://localhost:8080")
    base_url: String,
    /// Opaque bearer token attached to every request
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl FieldApiClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API (e.g., "http://localhost:8080")
    ///
    /// # Example
    /// ```
    /// use proofwork_client::FieldApiClient;
    ///
    /// let client = FieldApiClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use proofwork_client::FieldApiClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = FieldApiClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    /// Handle an API response with a binary body
    async fn handle_bytes_response(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("API returned {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
