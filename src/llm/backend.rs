//! Completion backend trait
//!
//! The seam between the retrying, schema-validating client and whatever
//! actually produces completions. Backends return the raw response text;
//! extraction and validation happen in the client.

use super::error::CompletionError;
use super::types::CompletionRequest;
use async_trait::async_trait;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }
}
