//! Common error types for the gateway and the prediction nodes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Invalid backend address '{address}': {reason}")]
    InvalidBackendAddress { address: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Error encoding response: {0}")]
    Encoding(serde_json::Error),

    #[error("No backends configured")]
    NoBackends,

    #[error("Backend not live: {0}")]
    BackendUnavailable(String),

    #[error("Relay error: {0}")]
    Relay(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NoBackends | AppError::BackendUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Relay(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Csv(_)
            | AppError::Dataset(_)
            | AppError::InvalidBackendAddress { .. }
            | AppError::Encoding(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body sent to the caller.
    ///
    /// Client-facing messages stay stable and never leak upstream details.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::PayloadTooLarge(_) => "Request body too large".to_string(),
            AppError::NoBackends | AppError::BackendUnavailable(_) => {
                "Service not available".to_string()
            }
            AppError::Relay(_) => "Bad gateway".to_string(),
            AppError::Encoding(_) => "Error encoding response".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
