//! Error types for Weavr
//!
//! Centralized error handling using thiserror.
//!
//! Domain-level outcomes (compile errors, step failures, repair directives)
//! are modeled as data in `crate::domain` and `crate::compiler` so the
//! evaluator can classify them; this enum covers infrastructure failures.

use thiserror::Error;

/// All error types that can occur in Weavr
#[derive(Debug, Error)]
pub enum WeavrError {
    /// Job not found in storage
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Tool catalog loading or lookup error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Goal specification rejected (malformed or inconsistent revision)
    #[error("Goal error: {0}")]
    Goal(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Weavr operations
pub type Result<T> = std::result::Result<T, WeavrError>;
