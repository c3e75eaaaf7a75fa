//! Mapping result types
//!
//! The two AI-produced artifacts: module assignments (one legacy module
//! bound to exactly one target object) and requirement mappings (the
//! one-to-one requirement/control binding per pair, plus the explicit
//! unmatched remainders).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// One legacy module bound to exactly one target object. Never partial,
/// never many-valued; modules the classifier could not place are omitted
/// entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAssignment {
    pub module_id: String,
    pub target_object_id: Uuid,
}

/// The aggregated mapping for one (module, target object) pair.
///
/// `mapping` keys are requirement identifiers of the module, each bound to
/// exactly one control from the pair's applicable-control universe. The two
/// unmatched sets make incompleteness explicit: controls of the universe
/// that received no requirement, and requirements that received no control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementMapping {
    pub module_id: String,
    pub target_object_id: Uuid,
    pub target_object_name: String,
    pub mapping: BTreeMap<String, String>,
    pub unmatched_controls: BTreeSet<String>,
    pub unmatched_requirements: BTreeSet<String>,
}

impl RequirementMapping {
    /// Mapping keys and unmatched requirements are disjoint and together
    /// cover the module's requirement set; useful as a test invariant.
    pub fn is_exhaustive_over(&self, requirement_ids: &BTreeSet<String>) -> bool {
        let mapped: BTreeSet<String> = self.mapping.keys().cloned().collect();
        mapped.is_disjoint(&self.unmatched_requirements)
            && mapped
                .union(&self.unmatched_requirements)
                .cloned()
                .collect::<BTreeSet<_>>()
                == *requirement_ids
    }
}
