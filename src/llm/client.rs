//! Schema-validated completion client
//!
//! Wraps a `CompletionBackend` with the behavior every AI call site needs:
//! a counting admission gate bounding concurrent outstanding requests,
//! retry with exponential backoff and randomized jitter for transient
//! failures, JSON extraction from the raw response text, and validation
//! against the caller-supplied JSON Schema before anything is returned.
//!
//! Schema violations are capped at one retry: repeating an unmodified
//! prompt rarely changes a structurally wrong answer.

use super::backend::CompletionBackend;
use super::error::CompletionError;
use super::types::CompletionRequest;
use jsonschema::JSONSchema;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Retry behavior for transient completion failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fractional jitter applied to each delay (0.5 = +/-50%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        let jitter_factor = 1.0 + self.jitter * (rand::random::<f64>() * 2.0 - 1.0);
        exp.mul_f64(jitter_factor.max(0.0))
    }
}

/// Schema violations get at most this many total attempts.
const SCHEMA_VIOLATION_MAX_ATTEMPTS: u32 = 2;

pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    gate: Semaphore,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, max_concurrent: usize) -> Self {
        Self::with_policy(backend, max_concurrent, RetryPolicy::default())
    }

    pub fn with_policy(
        backend: Arc<dyn CompletionBackend>,
        max_concurrent: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            gate: Semaphore::new(max_concurrent.max(1)),
            policy,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Requests a completion and returns the schema-validated JSON value.
    ///
    /// The admission permit is held across retries, so backoff sleeps count
    /// against the concurrency budget the same way in-flight requests do.
    pub async fn request_structured(
        &self,
        request: CompletionRequest,
    ) -> Result<Value, CompletionError> {
        let compiled = JSONSchema::compile(&request.schema).map_err(|e| {
            CompletionError::SchemaViolation(format!("caller-supplied schema is invalid: {e}"))
        })?;

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| CompletionError::Transport("admission gate closed".to_string()))?;

        let mut schema_violations = 0u32;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(
                "[{}] attempt {}/{} via {}",
                request.context,
                attempt,
                self.policy.max_attempts,
                self.backend.name()
            );

            let error = match self.attempt_once(&request, &compiled).await {
                Ok(value) => {
                    info!(
                        "[{}] validated completion on attempt {}",
                        request.context, attempt
                    );
                    return Ok(value);
                }
                Err(error) => error,
            };

            let exhausted = if error.is_transient() {
                attempt >= self.policy.max_attempts
            } else {
                schema_violations += 1;
                schema_violations >= SCHEMA_VIOLATION_MAX_ATTEMPTS
                    || attempt >= self.policy.max_attempts
            };
            if exhausted {
                warn!(
                    "[{}] giving up after {} attempt(s): {}",
                    request.context, attempt, error
                );
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                "[{}] attempt {} failed ({}), retrying in {:?}",
                request.context, attempt, error, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt_once(
        &self,
        request: &CompletionRequest,
        compiled: &JSONSchema,
    ) -> Result<Value, CompletionError> {
        let raw = self.backend.complete(request).await?;
        let json_text = extract_json_object(&raw)?;
        let value: Value = serde_json::from_str(&json_text)
            .map_err(|e| CompletionError::MalformedOutput(format!("invalid JSON: {e}")))?;

        if let Err(errors) = compiled.validate(&value) {
            let detail = errors
                .map(|e| e.to_string())
                .take(3)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CompletionError::SchemaViolation(detail));
        }
        Ok(value)
    }
}

/// Pulls a JSON object out of the raw response text, tolerating surrounding
/// prose and fenced markdown blocks.
pub fn extract_json_object(response: &str) -> Result<String, CompletionError> {
    let trimmed = response.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed.to_string());
    }

    if trimmed.contains("```") {
        let re = Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").expect("valid literal regex");
        if let Some(captures) = re.captures(trimmed) {
            if let Some(block) = captures.get(1) {
                let inner = block.as_str().trim();
                if inner.starts_with('{') && inner.ends_with('}') {
                    return Ok(inner.to_string());
                }
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Ok(trimmed[start..=end].to_string());
        }
    }

    Err(CompletionError::MalformedOutput(
        "no JSON object found in response".to_string(),
    ))
}
