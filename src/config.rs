//! Configuration management
//!
//! Runtime settings load from environment variables with sensible defaults.
//! Provider credentials are read directly by the genai library via its
//! standard environment variables (GOOGLE_API_KEY, OPENAI_API_KEY, ...).
//!
//! # Environment Variables
//!
//! - `CROSSWALK_MODEL`: classifier model - default: "gemini-2.5-flash"
//! - `CROSSWALK_MATCHER_MODEL`: matcher model override - default: unset
//!   (the matcher uses `CROSSWALK_MODEL`)
//! - `CROSSWALK_MAX_CONCURRENT`: concurrent completion requests - default: "5"
//! - `CROSSWALK_MAX_RETRIES`: attempts per transient failure - default: "5"
//! - `CROSSWALK_REQUEST_TIMEOUT`: timeout in seconds - default: "60"
//! - `CROSSWALK_OVERWRITE_ARTIFACTS`: rebuild existing stage artifacts
//!   (true|false) - default: "false"
//! - `CROSSWALK_SAMPLE_LIMIT`: process only the first N eligible modules -
//!   default: unset (all modules)
//! - `CROSSWALK_OUTPUT_DIR`: artifact directory - default: "artifacts"
//! - `CROSSWALK_LOG_LEVEL`: logging level - default: "info"

use crate::llm::{CompletionClient, GenAiBackend, RetryPolicy};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_MAX_CONCURRENT: usize = 5;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_OUTPUT_DIR: &str = "artifacts";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct CrosswalkConfig {
    /// Model for classification and, absent an override, matching.
    pub model: String,

    /// Optional stronger model for the matching stage.
    pub matcher_model: Option<String>,

    /// Maximum concurrent completion requests.
    pub max_concurrent: usize,

    /// Attempts per request for transient failures, including the first.
    pub max_retries: u32,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Rebuild stage artifacts even when they already exist.
    pub overwrite_artifacts: bool,

    /// Process only the first N eligible modules (trial runs).
    pub sample_limit: Option<usize>,

    /// Directory the stage artifacts are written to.
    pub output_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for CrosswalkConfig {
    /// Loads from `CROSSWALK_*` environment variables with defaults for any
    /// missing value.
    fn default() -> Self {
        let model = env::var("CROSSWALK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let matcher_model = env::var("CROSSWALK_MATCHER_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let max_concurrent = env::var("CROSSWALK_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENT);

        let max_retries = env::var("CROSSWALK_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let request_timeout_secs = env::var("CROSSWALK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let overwrite_artifacts = env::var("CROSSWALK_OVERWRITE_ARTIFACTS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        let sample_limit = env::var("CROSSWALK_SAMPLE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0);

        let output_dir = env::var("CROSSWALK_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let log_level = env::var("CROSSWALK_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            model,
            matcher_model,
            max_concurrent,
            max_retries,
            request_timeout_secs,
            overwrite_artifacts,
            sample_limit,
            output_dir,
            log_level,
        }
    }
}

impl CrosswalkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name must not be empty".to_string(),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max concurrent requests must be at least 1".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max retries must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Builds the completion backend. Credentials come from the standard
    /// genai environment variables.
    pub fn create_backend(&self) -> Arc<GenAiBackend> {
        Arc::new(GenAiBackend::new(
            self.model.clone(),
            Duration::from_secs(self.request_timeout_secs),
        ))
    }

    /// Builds the schema-validated completion client over the configured
    /// backend, concurrency bound, and retry budget.
    pub fn create_client(&self) -> CompletionClient {
        let policy = RetryPolicy {
            max_attempts: self.max_retries,
            ..RetryPolicy::default()
        };
        CompletionClient::with_policy(self.create_backend(), self.max_concurrent, policy)
    }
}

impl fmt::Display for CrosswalkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Crosswalk Configuration:")?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(
            f,
            "  Matcher Model: {}",
            self.matcher_model.as_deref().unwrap_or("(same as model)")
        )?;
        writeln!(f, "  Max Concurrent: {}", self.max_concurrent)?;
        writeln!(f, "  Max Retries: {}", self.max_retries)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Overwrite Artifacts: {}", self.overwrite_artifacts)?;
        if let Some(limit) = self.sample_limit {
            writeln!(f, "  Sample Limit: {limit}")?;
        }
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn default_configuration() {
        let _guards = vec![
            EnvGuard::set("CROSSWALK_MODEL", DEFAULT_MODEL),
            EnvGuard::set("CROSSWALK_LOG_LEVEL", DEFAULT_LOG_LEVEL),
        ];

        let config = CrosswalkConfig::default();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("CROSSWALK_MODEL", "custom-model"),
            EnvGuard::set("CROSSWALK_MATCHER_MODEL", "stronger-model"),
            EnvGuard::set("CROSSWALK_MAX_CONCURRENT", "8"),
            EnvGuard::set("CROSSWALK_MAX_RETRIES", "3"),
            EnvGuard::set("CROSSWALK_REQUEST_TIMEOUT", "120"),
            EnvGuard::set("CROSSWALK_OVERWRITE_ARTIFACTS", "true"),
            EnvGuard::set("CROSSWALK_SAMPLE_LIMIT", "10"),
            EnvGuard::set("CROSSWALK_OUTPUT_DIR", "/tmp/out"),
            EnvGuard::set("CROSSWALK_LOG_LEVEL", "debug"),
        ];

        let config = CrosswalkConfig::default();

        assert_eq!(config.model, "custom-model");
        assert_eq!(config.matcher_model.as_deref(), Some("stronger-model"));
        assert_eq!(config.max_concurrent, 8);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.overwrite_artifacts);
        assert_eq!(config.sample_limit, Some(10));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let mut config = CrosswalkConfig::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_concurrency() {
        let mut config = CrosswalkConfig::default();
        config.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_unknown_log_level() {
        let mut config = CrosswalkConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_sample_limit_means_unset() {
        let _guard = EnvGuard::set("CROSSWALK_SAMPLE_LIMIT", "0");
        let config = CrosswalkConfig::default();
        assert_eq!(config.sample_limit, None);
    }

    #[test]
    fn config_display_lists_settings() {
        let config = CrosswalkConfig::default();
        let display = format!("{config}");
        assert!(display.contains("Crosswalk Configuration:"));
        assert!(display.contains("Model:"));
    }
}
