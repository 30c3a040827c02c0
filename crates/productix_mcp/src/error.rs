//! Custom error types for the MCP server.

use axum::http::StatusCode;
use productix_core::ProductixError;
use thiserror::Error;

/// MCP server errors.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("{0}")]
    Core(#[from] ProductixError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("AI features are not configured")]
    CompletionUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            McpError::Core(e) => match e {
                ProductixError::NotFound(_) => StatusCode::NOT_FOUND,
                ProductixError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ProductixError::Conflict(_) => StatusCode::CONFLICT,
                ProductixError::Auth(_)
                | ProductixError::Upstream { .. }
                | ProductixError::MalformedResponse(_)
                | ProductixError::Http(_) => StatusCode::BAD_GATEWAY,
                ProductixError::Config(_) | ProductixError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            McpError::Validation(_) => StatusCode::BAD_REQUEST,
            McpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            McpError::Forbidden(_) => StatusCode::FORBIDDEN,
            McpError::CompletionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            McpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<McpError> for String {
    fn from(err: McpError) -> Self {
        err.to_string()
    }
}

/// Result type alias for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
