//! GenAI-backed completion backend
//!
//! Uses the `genai` crate for provider-agnostic access to completion
//! services. Provider credentials and endpoints come from the standard
//! genai environment variables; the model name selects the provider.

use super::backend::CompletionBackend;
use super::error::CompletionError;
use super::types::CompletionRequest;
use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::Client;
use std::time::Duration;
use tracing::{debug, error};

const SYSTEM_PROMPT: &str = "You are an information-security expert assisting \
with the migration of a legacy control catalog onto a modern, \
inheritance-based catalog. Answer precisely and only with the requested \
structured data.";

const COMPLETION_TEMPERATURE: f64 = 1.0;
const MAX_OUTPUT_TOKENS: u32 = 65_536;

pub struct GenAiBackend {
    client: Client,
    default_model: String,
    timeout: Duration,
}

impl GenAiBackend {
    pub fn new(default_model: String, timeout: Duration) -> Self {
        debug!("Creating GenAI backend with default model '{default_model}'");
        Self {
            client: Client::default(),
            default_model,
            timeout,
        }
    }

    fn system_message() -> String {
        let today = chrono::Utc::now().format("%Y-%m-%d");
        format!("{SYSTEM_PROMPT}\n\nImportant: today's date is {today}.")
    }

    fn render_user_prompt(request: &CompletionRequest) -> String {
        format!(
            "{}\n\nRespond with a single JSON object that conforms to this \
             JSON Schema:\n{}",
            request.prompt, request.schema
        )
    }
}

#[async_trait]
impl CompletionBackend for GenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let model = request
            .model_hint
            .as_deref()
            .unwrap_or(&self.default_model);

        let chat_request = ChatRequest::new(vec![
            ChatMessage::system(Self::system_message()),
            ChatMessage::user(Self::render_user_prompt(request)),
        ]);

        let options = ChatOptions::default()
            .with_temperature(COMPLETION_TEMPERATURE)
            .with_max_tokens(MAX_OUTPUT_TOKENS);

        let response = match tokio::time::timeout(
            self.timeout,
            self.client.exec_chat(model, chat_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!("[{}] completion request failed: {e}", request.context);
                return Err(CompletionError::Service {
                    message: format!("model '{model}' request failed: {e}"),
                    status: None,
                });
            }
            Err(_) => {
                error!(
                    "[{}] completion request timed out after {}s",
                    request.context,
                    self.timeout.as_secs()
                );
                return Err(CompletionError::Transport(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        match response.first_text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(CompletionError::MalformedOutput(
                "completion response contained no text".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "GenAI"
    }

    fn model_info(&self) -> Option<String> {
        Some(self.default_model.clone())
    }
}

impl std::fmt::Debug for GenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiBackend")
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
