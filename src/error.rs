use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum NexusError {
    #[error("Connection not found: {0}")]
    NotFound(String),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Could not fetch schema: {0}")]
    Reflection(String),

    #[error("Generated SQL failed safety checks.")]
    UnsafeSql,

    #[error("Query execution error: {0}")]
    Execution(String),

    #[error("LLM generation error: {0}")]
    Generation(String),

    #[error("Invalid connection profile: {0}")]
    InvalidProfile(String),

    #[error("Credential vault error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Gemini API error: {0:?}")]
    GeminiServerError(GeminiError),
}

/// Whether an upstream failure is worth another attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for NexusError {
    fn is_retryable(&self) -> bool {
        match self {
            NexusError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            NexusError::UpstreamStatus(code) => {
                code.is_server_error() || *code == StatusCode::TOO_MANY_REQUESTS
            }
            NexusError::GeminiServerError(err) => err.error.code >= 500,
            _ => false,
        }
    }
}

impl NexusError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            NexusError::NotFound(_) => "NOT_FOUND",
            NexusError::Connection(_) => "CONNECTION_ERROR",
            NexusError::Reflection(_) => "REFLECTION_ERROR",
            NexusError::UnsafeSql => "UNSAFE_SQL",
            NexusError::Execution(_) => "EXECUTION_ERROR",
            NexusError::InvalidProfile(_) => "INVALID_PROFILE",
            NexusError::Generation(_)
            | NexusError::Reqwest(_)
            | NexusError::UpstreamStatus(_)
            | NexusError::GeminiServerError(_) => "GENERATION_ERROR",
            NexusError::Crypto(_) | NexusError::Config(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            NexusError::NotFound(_) => StatusCode::NOT_FOUND,
            NexusError::Connection(_)
            | NexusError::Reflection(_)
            | NexusError::UnsafeSql
            | NexusError::Execution(_) => StatusCode::BAD_REQUEST,
            NexusError::InvalidProfile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NexusError::Generation(_)
            | NexusError::Reqwest(_)
            | NexusError::UpstreamStatus(_)
            | NexusError::GeminiServerError(_) => StatusCode::BAD_GATEWAY,
            NexusError::Crypto(_) | NexusError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NexusError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            // Key material problems stay in the logs.
            NexusError::Crypto(_) | NexusError::Config(_) => {
                tracing::error!(error = %self, "internal error");
                "An internal server error occurred.".to_string()
            }
            _ => self.to_string(),
        };
        let body = ApiErrorBody {
            code: self.code().to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Gemini API error response structure
#[derive(Deserialize, Debug)]
pub struct GeminiError {
    pub error: GeminiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct GeminiErrorBody {
    pub code: u32,
    pub message: String,
    pub status: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
