//! Pipeline orchestration and persisted stage artifacts.

pub mod artifacts;
pub mod orchestrator;

pub use artifacts::{
    AppliedControlsArtifact, AssignmentsArtifact, MappingsArtifact, APPLIED_CONTROLS_FILE,
    ASSIGNMENTS_FILE, MAPPINGS_FILE,
};
pub use orchestrator::{Pipeline, PipelinePaths, Stage};
