//! Completion request type
//!
//! One structured-completion call: a prompt, the JSON Schema the response
//! must conform to, an optional per-call model hint, and a context label
//! that identifies the unit of work in logs.

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub schema: Value,
    /// Per-call model selection; callers trade capability for cost/latency.
    pub model_hint: Option<String>,
    /// Log label identifying the request source, e.g. "classify-SYS.1.1".
    pub context: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            model_hint: None,
            context: "completion".to_string(),
        }
    }

    pub fn with_model_hint(mut self, hint: Option<String>) -> Self {
        self.model_hint = hint;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}
