//! Error types for the policydesk agent system
//!
//! One enum covers the whole failure taxonomy so every component can
//! return the crate-wide `Result` alias.

use thiserror::Error;

/// Main error type for the customer-service agent system
#[derive(Error, Debug)]
pub enum AgentError {
    /// Invalid configuration (bad chunk sizing, missing API key, ...)
    ///
    /// Fatal at startup; never produced mid-query.
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// Caller passed an unusable argument (zero top-k, blank query,
    /// purchase date in the future, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding or completion provider failure (auth, rate limit, API error)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Embedding request exceeded its configured timeout
    #[error("Embedding request timed out after {duration_ms}ms")]
    EmbeddingTimeout { duration_ms: u64 },

    /// Retrieval (query embed + store search) exceeded its configured timeout
    #[error("Retrieval timed out after {duration_ms}ms")]
    RetrievalTimeout { duration_ms: u64 },

    /// Persisted vector collection missing, corrupt, or mid-rebuild
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// Model output could not be parsed into the expected structure
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
