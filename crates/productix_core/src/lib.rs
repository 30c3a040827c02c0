//! Productivity aggregation engine for batch/shift production records.
//!
//! Raw shift records flow through [`normalize`] into [`aggregate`], and the
//! resulting totals feed the [`report`], [`rollup`] and [`dashboard`] views.
//! AI-backed analysis goes through the [`TextCompletion`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod analysis;
pub mod calculator;
pub mod config;
pub mod dashboard;
pub mod http_client;
pub mod model;
pub mod normalize;
pub mod observability;
pub mod ratio;
pub mod report;
pub mod retry;
pub mod rollup;
pub mod service;
pub mod store;
pub mod utils;

pub use aggregate::AggregateTotals;
pub use model::{
    AnalysisId, AnalysisKind, AnalysisRecord, Batch, BatchId, BatchStatus, BatchUpdate, FieldMap,
    FieldQuantity, NewAnalysisRecord, NewBatch, NewProduct, NewShift, NormalizedShift, OrgId,
    Product, ProductId, ProductUpdate, ShiftId, ShiftRecord, ShiftUpdate,
};
pub use report::BatchReport;
pub use service::ProductivityService;
pub use store::{InMemoryStore, ProductionStore};

#[derive(Debug, Error)]
pub enum ProductixError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProductixError {
    /// Map a non-success HTTP status from an upstream service.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => ProductixError::NotFound(body),
            401 | 403 => ProductixError::Auth(body),
            400 | 422 => ProductixError::InvalidInput(body),
            _ => ProductixError::Upstream { status, body },
        }
    }

    pub fn not_found(what: &str, id: i64) -> Self {
        ProductixError::NotFound(format!("{what} {id} not found"))
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProductixError::Http(e) => e.is_timeout() || e.is_connect(),
            ProductixError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A single prompt sent to a text-completion model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_instruction: Option<String>,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

#[async_trait]
pub trait TextCompletion: Send + Sync + 'static {
    /// Returns the raw text produced by the model.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProductixError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_known_codes() {
        assert!(matches!(
            ProductixError::from_status(404, "x".into()),
            ProductixError::NotFound(_)
        ));
        assert!(matches!(
            ProductixError::from_status(403, "x".into()),
            ProductixError::Auth(_)
        ));
        assert!(matches!(
            ProductixError::from_status(422, "x".into()),
            ProductixError::InvalidInput(_)
        ));
        assert!(matches!(
            ProductixError::from_status(503, "x".into()),
            ProductixError::Upstream { status: 503, .. }
        ));
    }

    #[test]
    fn only_throttling_and_server_errors_are_retryable() {
        assert!(ProductixError::from_status(429, String::new()).is_retryable());
        assert!(ProductixError::from_status(500, String::new()).is_retryable());
        assert!(!ProductixError::from_status(418, String::new()).is_retryable());
        assert!(!ProductixError::Conflict("closed".into()).is_retryable());
    }

    #[test]
    fn completion_request_builder() {
        let req = CompletionRequest::new("hello").with_system_instruction("be brief");
        assert_eq!(req.prompt, "hello");
        assert_eq!(req.system_instruction.as_deref(), Some("be brief"));
    }
}
