//! Error types for the planforge pipeline
//!
//! Provides the crate-wide error enum with context propagation. Validation
//! failures are not errors: they feed the next refinement iteration and only
//! surface here once a loop exhausts its iteration budget.

use thiserror::Error;

/// Main error type for the processing pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Referenced document does not exist in the store
    #[error("Document {0} not found")]
    DocumentNotFound(String),

    /// A refinement loop ran out of iterations without producing valid output
    #[error("Refinement loop exceeded {iterations} iterations. Last errors: {last_errors:?}")]
    MaxIterationsExceeded {
        iterations: usize,
        last_errors: Vec<String>,
    },

    /// Model invocation failed (transient, retried inside the loop)
    #[error("Model invocation failed: {0}")]
    Invocation(String),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Document ingestion errors
    #[error("Ingestion error: {0}")]
    Ingest(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Pipeline error: {0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Generic(err.to_string())
    }
}
