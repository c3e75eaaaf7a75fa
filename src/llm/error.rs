//! Completion-service error taxonomy
//!
//! Every failure at the completion boundary is one of four kinds. Transport
//! and service failures and malformed output are transient and retried with
//! backoff; a schema violation rarely improves on an unmodified retry, so it
//! is capped at a single retry by the client.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Network/connectivity failure, including timeouts.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Remote service error, including rate limits and quota.
    #[error("service failure: {message}")]
    Service {
        message: String,
        status: Option<u16>,
    },

    /// The response is not syntactically valid structured data.
    #[error("malformed output: {0}")]
    MalformedOutput(String),

    /// Syntactically valid but does not conform to the requested schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl CompletionError {
    /// Whether the full retry budget applies to this error kind.
    pub fn is_transient(&self) -> bool {
        !matches!(self, CompletionError::SchemaViolation(_))
    }
}
