//! Core catalog data model
//!
//! These types are the flattened, immutable view of the reference data:
//! modern controls with their target-object applicability tags, the
//! target-object hierarchy, and the legacy modules with their requirements.
//! They are loaded once per pipeline run and never mutated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Legacy main groups describing asset-oriented modules.
pub const ASSET_GROUPS: [&str; 5] = ["SYS", "INF", "IND", "APP", "NET"];

/// Legacy main groups describing process-oriented modules.
pub const PROCESS_GROUPS: [&str; 5] = ["ISMS", "ORP", "CON", "OPS", "DER"];

/// Reserved key in the applied-controls map for controls that carry no
/// target-object tag at all (the global/process-level bucket).
pub const PROCESS_BUCKET_ID: Uuid = Uuid::nil();

/// One normative requirement in the modern catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    /// Identifier, unique within the catalog.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Prose statement of the control.
    #[serde(default)]
    pub statement: String,
    /// Optional control parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ControlParameter>,
    /// Names of the target objects this control is declared for. Empty means
    /// the control is untagged and lands in the process-level bucket.
    #[serde(default)]
    pub target_objects: Vec<String>,
}

/// A parameter attached to a control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlParameter {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

/// A node in the modern classification hierarchy. Controls declared for a
/// target object are inherited by all of its descendants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetObject {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name; applicability tags on controls reference this.
    pub name: String,
    /// Short definition used as classification context.
    #[serde(default)]
    pub definition: String,
    /// Parent node, if any. The hierarchy forms a forest.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// A grouping of legacy requirements ("Baustein").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyModule {
    pub id: String,
    pub title: String,
    /// Descriptive prose; modules without prose cannot be classified.
    #[serde(default)]
    pub description: String,
    /// Main group tag (e.g. "SYS", "ISMS").
    pub group: String,
    #[serde(default)]
    pub requirements: Vec<LegacyRequirement>,
}

impl LegacyModule {
    /// A module is eligible for mapping when its group is allow-listed and
    /// it carries descriptive prose.
    pub fn is_eligible(&self) -> bool {
        self.has_prose()
            && (ASSET_GROUPS.contains(&self.group.as_str())
                || PROCESS_GROUPS.contains(&self.group.as_str()))
    }

    pub fn has_prose(&self) -> bool {
        !self.description.trim().is_empty()
    }

    /// Process-oriented modules additionally draw from the process-level
    /// control bucket during requirement matching.
    pub fn is_process_oriented(&self) -> bool {
        PROCESS_GROUPS.contains(&self.group.as_str())
    }

    pub fn requirement_ids(&self) -> Vec<String> {
        self.requirements.iter().map(|r| r.id.clone()).collect()
    }
}

/// An individual requirement within a legacy module ("Anforderung").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRequirement {
    /// Identifier, scoped to the owning module (e.g. "SYS.1.1.A3").
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub prose: String,
    /// Maturity/level metadata, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}
