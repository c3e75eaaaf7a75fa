//! Stage artifacts
//!
//! Each pipeline stage persists exactly one JSON artifact. Artifact
//! existence doubles as the completion marker for idempotent restarts, so
//! writes go through a temp file and an atomic rename: a crash mid-write
//! must never leave a half-written file that a later run would trust.

use crate::hierarchy::AppliedControls;
use crate::mapping::{ModuleAssignment, RequirementMapping};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub const APPLIED_CONTROLS_FILE: &str = "applied_controls.json";
pub const ASSIGNMENTS_FILE: &str = "module_assignments.json";
pub const MAPPINGS_FILE: &str = "requirement_mappings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedControlsArtifact {
    pub generated_at: DateTime<Utc>,
    pub applied: AppliedControls,
}

/// Stage-one output: module id to target-object id, sorted by module id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentsArtifact {
    pub generated_at: DateTime<Utc>,
    pub assignments: BTreeMap<String, Uuid>,
}

impl AssignmentsArtifact {
    pub fn from_assignments(assignments: Vec<ModuleAssignment>) -> Self {
        Self {
            generated_at: Utc::now(),
            assignments: assignments
                .into_iter()
                .map(|a| (a.module_id, a.target_object_id))
                .collect(),
        }
    }

    pub fn to_assignments(&self) -> Vec<ModuleAssignment> {
        self.assignments
            .iter()
            .map(|(module_id, &target_object_id)| ModuleAssignment {
                module_id: module_id.clone(),
                target_object_id,
            })
            .collect()
    }
}

/// Stage-two output: one aggregated mapping per (module, target) pair,
/// sorted by module id for stable diffs between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingsArtifact {
    pub generated_at: DateTime<Utc>,
    pub mappings: Vec<RequirementMapping>,
}

impl MappingsArtifact {
    pub fn from_mappings(mut mappings: Vec<RequirementMapping>) -> Self {
        mappings.sort_by(|a, b| a.module_id.cmp(&b.module_id));
        Self {
            generated_at: Utc::now(),
            mappings,
        }
    }
}

pub fn artifact_path(output_dir: &Path, file: &str) -> PathBuf {
    output_dir.join(file)
}

pub fn save_json<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(artifact).context("serializing artifact")?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("moving {} into place", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
