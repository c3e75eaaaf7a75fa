//! Schema-validated completion client layer
//!
//! The backend trait and implementations produce raw completion text; the
//! client wraps them with admission gating, retries, JSON extraction, and
//! schema validation.

pub mod backend;
pub mod client;
pub mod error;
pub mod genai;
pub mod mock;
pub mod types;

pub use backend::CompletionBackend;
pub use client::{extract_json_object, CompletionClient, RetryPolicy};
pub use error::CompletionError;
pub use genai::GenAiBackend;
pub use mock::MockBackend;
pub use types::CompletionRequest;
