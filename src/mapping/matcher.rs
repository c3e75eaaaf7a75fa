//! Context-bounded requirement matching
//!
//! For every (module, target object) assignment, narrows the context to the
//! module's requirements and the target object's applied-control universe,
//! asks the completion service for an exhaustive one-to-one mapping in
//! batches, validates every returned entry against that context, and
//! aggregates the batches into one `RequirementMapping` per pair.
//!
//! The narrowing is deliberate: a requirement can never be matched to a
//! control outside its target object's applicable set. That trades
//! completeness for tractable context size and per-call precision.

use super::prompt;
use super::types::{ModuleAssignment, RequirementMapping};
use crate::catalog::types::{Control, LegacyModule, TargetObject};
use crate::hierarchy::AppliedControls;
use crate::llm::{CompletionClient, CompletionRequest};
use futures_util::future::join_all;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

/// Requirement lists longer than this are split into successive batches.
pub const MATCH_BATCH_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct BatchResponse {
    mapping: BTreeMap<String, String>,
    #[serde(default)]
    unmatched_requirements: Vec<String>,
    // Per-batch unmatched controls are not independently meaningful; the
    // pair-level set is computed after all batches complete.
    #[serde(default)]
    #[allow(dead_code)]
    unmatched_controls: Vec<String>,
}

/// The outcome of one batch: which requirements it covered and what the
/// model returned, or nothing if the batch exhausted its retries.
struct BatchOutcome {
    input_ids: BTreeSet<String>,
    response: Option<BatchResponse>,
}

pub struct RequirementMatcher<'a> {
    client: &'a CompletionClient,
    model_hint: Option<String>,
    batch_size: usize,
}

impl<'a> RequirementMatcher<'a> {
    pub fn new(client: &'a CompletionClient, model_hint: Option<String>) -> Self {
        Self {
            client,
            model_hint,
            batch_size: MATCH_BATCH_SIZE,
        }
    }

    /// Overrides the default batch size. Splitting only changes call
    /// granularity, never the aggregated result.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Matches every assignment. Pairs are independent and run concurrently;
    /// the client's admission gate bounds outstanding completion requests.
    pub async fn match_all(
        &self,
        assignments: &[ModuleAssignment],
        modules: &[LegacyModule],
        targets: &[TargetObject],
        controls: &[Control],
        applied: &AppliedControls,
    ) -> Vec<RequirementMapping> {
        let modules_by_id: HashMap<&str, &LegacyModule> =
            modules.iter().map(|m| (m.id.as_str(), m)).collect();
        let targets_by_id: HashMap<uuid::Uuid, &TargetObject> =
            targets.iter().map(|t| (t.id, t)).collect();
        let controls_by_id: HashMap<&str, &Control> =
            controls.iter().map(|c| (c.id.as_str(), c)).collect();

        let futures = assignments.iter().filter_map(|assignment| {
            let module = match modules_by_id.get(assignment.module_id.as_str()) {
                Some(module) => *module,
                None => {
                    warn!(
                        "Assignment references unknown module '{}', skipping",
                        assignment.module_id
                    );
                    return None;
                }
            };
            let target = match targets_by_id.get(&assignment.target_object_id) {
                Some(target) => *target,
                None => {
                    warn!(
                        "Assignment for module '{}' references unknown target object {}, skipping",
                        assignment.module_id, assignment.target_object_id
                    );
                    return None;
                }
            };
            Some(self.match_pair(module, target, &controls_by_id, applied))
        });

        let results = join_all(futures).await;
        info!("Matched {} module/target pairs", results.len());
        results
    }

    /// Produces the aggregated mapping for one pair. Batches share the same
    /// read-only control universe and run concurrently; aggregation waits
    /// for all of them.
    pub async fn match_pair(
        &self,
        module: &LegacyModule,
        target: &TargetObject,
        controls_by_id: &HashMap<&str, &Control>,
        applied: &AppliedControls,
    ) -> RequirementMapping {
        let mut universe = applied.for_target(target.id);
        if module.is_process_oriented() {
            universe.extend(applied.process_bucket());
        }

        let requirement_ids: BTreeSet<String> = module.requirement_ids().into_iter().collect();

        if universe.is_empty() {
            warn!(
                "No applicable controls for target object '{}' (module '{}'); \
                 all {} requirements left unmatched",
                target.name,
                module.id,
                requirement_ids.len()
            );
            return RequirementMapping {
                module_id: module.id.clone(),
                target_object_id: target.id,
                target_object_name: target.name.clone(),
                mapping: BTreeMap::new(),
                unmatched_controls: BTreeSet::new(),
                unmatched_requirements: requirement_ids,
            };
        }

        let universe_controls: Vec<&Control> = universe
            .iter()
            .filter_map(|id| controls_by_id.get(id.as_str()).copied())
            .collect();

        let batches: Vec<Vec<&crate::catalog::types::LegacyRequirement>> = module
            .requirements
            .chunks(self.batch_size)
            .map(|chunk| chunk.iter().collect())
            .collect();
        if batches.len() > 1 {
            info!(
                "Module '{}': {} requirements split into {} batches",
                module.id,
                module.requirements.len(),
                batches.len()
            );
        }

        let batch_futures = batches.iter().enumerate().map(|(index, batch)| {
            self.run_batch(module, target, batch, &universe_controls, index)
        });
        let outcomes = join_all(batch_futures).await;

        self.aggregate(module, target, &requirement_ids, &universe, outcomes)
    }

    async fn run_batch(
        &self,
        module: &LegacyModule,
        target: &TargetObject,
        batch: &[&crate::catalog::types::LegacyRequirement],
        universe_controls: &[&Control],
        index: usize,
    ) -> BatchOutcome {
        let input_ids: BTreeSet<String> = batch.iter().map(|r| r.id.clone()).collect();

        let request = CompletionRequest::new(
            prompt::matching_prompt(module, batch, universe_controls),
            prompt::matching_schema(),
        )
        .with_model_hint(self.model_hint.clone())
        .with_context(format!("match-{}-{}-b{}", module.id, target.name, index));

        match self.client.request_structured(request).await {
            Ok(value) => match serde_json::from_value::<BatchResponse>(value) {
                Ok(response) => BatchOutcome {
                    input_ids,
                    response: Some(response),
                },
                Err(e) => {
                    // Shape drift past the schema; treat like a failed batch.
                    warn!(
                        "Module '{}' batch {index}: response did not deserialize: {e}",
                        module.id
                    );
                    BatchOutcome {
                        input_ids,
                        response: None,
                    }
                }
            },
            Err(error) => {
                warn!(
                    "Module '{}' batch {index} failed after retries: {error}; \
                     its requirements go to the unmatched list",
                    module.id
                );
                BatchOutcome {
                    input_ids,
                    response: None,
                }
            }
        }
    }

    /// Merges batch outcomes in batch order. The first successful mapping
    /// of a requirement wins; later duplicates are a validation error and
    /// are discarded. Entries referencing identifiers outside the batch
    /// input or the control universe are dropped and logged, never kept.
    fn aggregate(
        &self,
        module: &LegacyModule,
        target: &TargetObject,
        requirement_ids: &BTreeSet<String>,
        universe: &BTreeSet<String>,
        outcomes: Vec<BatchOutcome>,
    ) -> RequirementMapping {
        let mut mapping: BTreeMap<String, String> = BTreeMap::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let response = match outcome.response {
                Some(response) => response,
                None => continue,
            };

            for (requirement_id, control_id) in response.mapping {
                if !outcome.input_ids.contains(&requirement_id) {
                    warn!(
                        "Module '{}' batch {index}: mapped requirement '{}' is \
                         not in the batch input; entry dropped",
                        module.id, requirement_id
                    );
                    continue;
                }
                if !universe.contains(&control_id) {
                    warn!(
                        "Module '{}' batch {index}: control '{}' is outside the \
                         applicable set for '{}'; requirement '{}' left unmatched",
                        module.id, control_id, target.name, requirement_id
                    );
                    continue;
                }
                if mapping.contains_key(&requirement_id) {
                    warn!(
                        "Module '{}' batch {index}: requirement '{}' already \
                         mapped by an earlier batch; duplicate discarded",
                        module.id, requirement_id
                    );
                    continue;
                }
                mapping.insert(requirement_id, control_id);
            }
        }

        let mapped_controls: BTreeSet<String> = mapping.values().cloned().collect();
        let unmatched_controls: BTreeSet<String> =
            universe.difference(&mapped_controls).cloned().collect();
        let mapped_requirements: BTreeSet<String> = mapping.keys().cloned().collect();
        let unmatched_requirements: BTreeSet<String> = requirement_ids
            .difference(&mapped_requirements)
            .cloned()
            .collect();

        info!(
            "Module '{}' -> '{}': {} mapped, {} requirements unmatched, {} controls unclaimed",
            module.id,
            target.name,
            mapping.len(),
            unmatched_requirements.len(),
            unmatched_controls.len()
        );

        RequirementMapping {
            module_id: module.id.clone(),
            target_object_id: target.id,
            target_object_name: target.name.clone(),
            mapping,
            unmatched_controls,
            unmatched_requirements,
        }
    }
}
