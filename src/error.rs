// Error handling module
// Defines the client error type and how API error bodies are interpreted

use thiserror::Error;

use crate::transport::{HttpResponse, TransportError};

/// Errors that can occur while talking to the H2PETRONS API
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was obtained from the server
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Server answered with a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Build an error from a failed response, preferring the server's
    /// `{"error": "..."}` message over `fallback`
    pub fn from_response(response: &HttpResponse, fallback: &str) -> Self {
        let message = response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|body| {
                body.get("error")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| fallback.to_string());

        ApiError::Api {
            status: response.status().as_u16(),
            message,
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
