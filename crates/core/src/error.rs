//! Error types for VCraft.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! vector store integrity, embedding and LLM failures.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for VCraft.
///
/// All fallible functions return `Result<T, AppError>`.
/// Configuration errors need a redeploy to fix; `Timeout`, `Llm` and
/// `InvalidResponse` are transient and may be retried (see [`AppError::is_retryable`]).
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted artifact is missing
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An embedding's width differs from the store's dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Parallel embedding/document sequences differ in length
    #[error("Length mismatch: {embeddings} embeddings for {documents} documents")]
    LengthMismatch { embeddings: usize, documents: usize },

    /// Chunker called with `overlap >= chunk_size`
    #[error("Invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap} (need 0 <= overlap < chunk_size)")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    /// The embedding model could not be loaded
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// A generation call exceeded its deadline
    #[error("LLM request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// A structured LLM reply failed to parse or validate
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Knowledge base and index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Timeout { .. } | AppError::Llm(_) | AppError::InvalidResponse(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
