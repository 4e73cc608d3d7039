//! Error types for the Tabula clients

use thiserror::Error;

/// Client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection refused, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Content or entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The GraphQL endpoint answered with an `errors` array
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client was configured with unusable settings
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the failure happened before the remote answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http(_))
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
