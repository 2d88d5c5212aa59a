//! Error types for the Proofwork client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the backend
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A local photo could not be read for upload
    #[error("Failed to read local file {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if the request never got an answer from the server
    ///
    /// Transport failures are the only errors worth retrying later from the
    /// outbox; anything else is a definitive answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if e.status().is_none())
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let conflict = ClientError::api_error(409, "already checked in");
        assert!(conflict.is_client_error());
        assert!(!conflict.is_server_error());
        assert!(!conflict.is_transport());

        let unavailable = ClientError::api_error(503, "maintenance");
        assert!(unavailable.is_server_error());

        assert!(ClientError::api_error(404, "no such job").is_not_found());
    }

    #[test]
    fn test_api_error_message() {
        let err = ClientError::api_error(422, "photos missing");
        assert_eq!(err.to_string(), "API error (status 422): photos missing");
    }
}
