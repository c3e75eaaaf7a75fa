//! Mock completion backend for tests
//!
//! Two modes: a scripted queue of canned results consumed in order, or a
//! programmable handler that computes the response from the request. The
//! handler mode makes deterministic end-to-end tests possible, e.g. a mock
//! that answers per input set regardless of batching.

use super::backend::CompletionBackend;
use super::error::CompletionError;
use super::types::CompletionRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Handler = dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync;

pub struct MockBackend {
    scripted: Mutex<VecDeque<Result<String, CompletionError>>>,
    handler: Option<Box<Handler>>,
    calls: AtomicUsize,
    name: String,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            handler: None,
            calls: AtomicUsize::new(0),
            name: "MockBackend".to_string(),
        }
    }

    /// A mock that computes its response from the request.
    pub fn with_handler(
        handler: impl Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            calls: AtomicUsize::new(0),
            name: "MockBackend".to_string(),
        }
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.scripted.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn push_json(&self, value: serde_json::Value) {
        self.push_text(value.to_string());
    }

    pub fn push_error(&self, error: CompletionError) {
        self.scripted.lock().unwrap().push_back(Err(error));
    }

    /// Number of completed `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.scripted.lock().unwrap().len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(handler) = &self.handler {
            return handler(request);
        }

        self.scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(CompletionError::Service {
                    message: "mock backend: no scripted responses remaining".to_string(),
                    status: None,
                })
            })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("calls", &self.calls())
            .field("remaining", &self.remaining())
            .finish()
    }
}
