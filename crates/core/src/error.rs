//! Error types for the Routewise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.
//!
//! Only [`Error::Responder`] is ever surfaced to a caller of the orchestrator.
//! [`KnowledgeError`] values are absorbed at the knowledge-source boundary and
//! unknown sessions are not an error at all.

use thiserror::Error;

/// The top-level error type for all Routewise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Responder errors ---
    #[error("Responder for '{category}' failed: {source}")]
    Responder {
        category: String,
        #[source]
        source: ProviderError,
    },

    // --- Routing errors ---
    #[error("No responder registered for category '{0}'")]
    UnknownCategory(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
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

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of a single knowledge source.
///
/// These never escape the fusion step; they are logged and turned into an
/// empty contribution.
#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Source '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("Source '{source_name}' timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("No match for '{0}'")]
    NoMatch(String),

    #[error("Ambiguous lookup for '{label}' ({} candidates)", .candidates.len())]
    Ambiguous { label: String, candidates: Vec<String> },

    #[error("Invalid response from source: {0}")]
    InvalidResponse(String),
}
