//! Module classification
//!
//! Assigns each eligible legacy module to exactly one target object by
//! asking the completion service to pick from the enumerated candidate
//! list. The returned name is resolved to a target-object identifier by
//! case- and whitespace-normalized exact match; an unresolvable name counts
//! as a schema violation and gets the same capped retry.

use super::prompt;
use super::types::ModuleAssignment;
use crate::catalog::types::{LegacyModule, TargetObject};
use crate::llm::{CompletionClient, CompletionRequest};
use futures_util::future::join_all;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Attempts per module when the returned name does not resolve.
const RESOLUTION_MAX_ATTEMPTS: u32 = 2;

pub struct ModuleClassifier<'a> {
    client: &'a CompletionClient,
    targets: &'a [TargetObject],
    by_normalized_name: HashMap<String, Uuid>,
    model_hint: Option<String>,
}

impl<'a> ModuleClassifier<'a> {
    pub fn new(
        client: &'a CompletionClient,
        targets: &'a [TargetObject],
        model_hint: Option<String>,
    ) -> Self {
        let by_normalized_name = targets
            .iter()
            .map(|t| (normalize(&t.name), t.id))
            .collect();
        Self {
            client,
            targets,
            by_normalized_name,
            model_hint,
        }
    }

    /// Classifies all eligible modules concurrently. Modules that cannot be
    /// placed are logged and omitted; an assignment is never partial.
    pub async fn classify_all(&self, modules: &[LegacyModule]) -> Vec<ModuleAssignment> {
        let eligible: Vec<&LegacyModule> = modules.iter().filter(|m| m.is_eligible()).collect();
        let skipped = modules.len() - eligible.len();
        if skipped > 0 {
            info!("Skipping {skipped} module(s) without prose or allow-listed group");
        }

        let futures = eligible.iter().map(|module| self.classify_one(module));
        let results = join_all(futures).await;

        let assignments: Vec<ModuleAssignment> = results.into_iter().flatten().collect();
        info!(
            "Classified {}/{} eligible modules",
            assignments.len(),
            eligible.len()
        );
        assignments
    }

    /// Classifies one module. Independent calls are unordered; concurrency
    /// is bounded by the client's admission gate.
    pub async fn classify_one(&self, module: &LegacyModule) -> Option<ModuleAssignment> {
        let request = CompletionRequest::new(
            prompt::classification_prompt(module, self.targets),
            prompt::classification_schema(self.targets),
        )
        .with_model_hint(self.model_hint.clone())
        .with_context(format!("classify-{}", module.id));

        for attempt in 1..=RESOLUTION_MAX_ATTEMPTS {
            let response = match self.client.request_structured(request.clone()).await {
                Ok(value) => value,
                Err(error) => {
                    warn!(
                        "Classification of module '{}' failed: {error}",
                        module.id
                    );
                    return None;
                }
            };

            let name = response
                .get("matched_target_object")
                .and_then(|v| v.as_str())
                .unwrap_or_default();

            if let Some(&target_id) = self.by_normalized_name.get(&normalize(name)) {
                info!(
                    "Matched module '{}' to target object '{}' ({})",
                    module.id, name, target_id
                );
                return Some(ModuleAssignment {
                    module_id: module.id.clone(),
                    target_object_id: target_id,
                });
            }

            warn!(
                "Module '{}': returned name '{}' resolves to no target object \
                 (attempt {attempt}/{RESOLUTION_MAX_ATTEMPTS})",
                module.id, name
            );
        }

        warn!("Could not find a suitable match for module '{}'", module.id);
        None
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionBackend, CompletionError, MockBackend};
    use serde_json::json;
    use std::sync::Arc;

    fn targets() -> Vec<TargetObject> {
        vec![
            TargetObject {
                id: Uuid::from_u128(1),
                name: "Server".to_string(),
                definition: "A server.".to_string(),
                parent_id: None,
            },
            TargetObject {
                id: Uuid::from_u128(2),
                name: "Web Application".to_string(),
                definition: "A web application.".to_string(),
                parent_id: None,
            },
        ]
    }

    fn module(id: &str) -> LegacyModule {
        LegacyModule {
            id: id.to_string(),
            title: "General Server".to_string(),
            description: "Servers of any kind.".to_string(),
            group: "SYS".to_string(),
            requirements: Vec::new(),
        }
    }

    fn client(backend: &Arc<MockBackend>) -> CompletionClient {
        CompletionClient::with_policy(
            backend.clone() as Arc<dyn CompletionBackend>,
            2,
            crate::llm::RetryPolicy {
                max_attempts: 2,
                base_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(2),
                jitter: 0.0,
            },
        )
    }

    #[tokio::test]
    async fn resolves_name_to_assignment() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(json!({"matched_target_object": "Server"}));
        let client = client(&backend);
        let targets = targets();
        let classifier = ModuleClassifier::new(&client, &targets, None);

        let assignment = classifier.classify_one(&module("SYS.1.1")).await.unwrap();
        assert_eq!(assignment.module_id, "SYS.1.1");
        assert_eq!(assignment.target_object_id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn name_resolution_is_case_and_whitespace_normalized() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend);
        let targets = targets();
        let classifier = ModuleClassifier::new(&client, &targets, None);

        let resolved = classifier
            .by_normalized_name
            .get(&normalize("  web   APPLICATION "));
        assert_eq!(resolved, Some(&Uuid::from_u128(2)));
    }

    #[tokio::test]
    async fn failed_classification_yields_no_assignment() {
        let backend = Arc::new(MockBackend::with_handler(|_| {
            Err(CompletionError::Transport("down".into()))
        }));
        let client = client(&backend);
        let targets = targets();
        let classifier = ModuleClassifier::new(&client, &targets, None);

        assert!(classifier.classify_one(&module("SYS.1.1")).await.is_none());
    }

    #[tokio::test]
    async fn classify_all_skips_ineligible_modules() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(json!({"matched_target_object": "Server"}));
        let client = client(&backend);
        let targets = targets();
        let classifier = ModuleClassifier::new(&client, &targets, None);

        let mut no_prose = module("SYS.2.2");
        no_prose.description = String::new();
        let modules = vec![module("SYS.1.1"), no_prose];

        let assignments = classifier.classify_all(&modules).await;
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].module_id, "SYS.1.1");
        // Only the eligible module produced a call.
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Web   Application "), "web application");
    }
}
