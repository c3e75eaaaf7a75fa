//! AI-assisted mapping stages
//!
//! Stage one classifies each eligible legacy module to a target object;
//! stage two matches the module's requirements against the pair's
//! applicable controls. Both stages go through the schema-validated
//! completion client and never emit partial or fabricated identifiers.

pub mod classifier;
pub mod matcher;
pub mod prompt;
pub mod types;

pub use classifier::ModuleClassifier;
pub use matcher::{RequirementMatcher, MATCH_BATCH_SIZE};
pub use types::{ModuleAssignment, RequirementMapping};
