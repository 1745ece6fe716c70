//! Error types for the reqsynth domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all synthesis and revision operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Synthesis input ---
    #[error("Synthesis requires at least one source")]
    EmptyInput,

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Contract enforcement ---
    #[error("Response violates the document schema: {reason}")]
    SchemaViolation {
        reason: String,
        /// The offending provider output, kept for diagnostics only.
        raw: String,
    },

    // --- Session state ---
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // --- Source registry ---
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a schema violation that keeps the raw provider text.
    pub fn schema_violation(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::SchemaViolation {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// The raw provider output behind a schema violation, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::SchemaViolation { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
