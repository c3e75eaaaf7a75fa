//! crosswalk - AI-assisted catalog crosswalk
//!
//! This library maps a legacy, module-based security catalog onto a modern,
//! inheritance-based control catalog. It combines one deterministic stage
//! with two AI-assisted stages:
//!
//! - **Hierarchy resolution**: walks the modern catalog's target-object
//!   hierarchy and computes, per object, the union of controls declared for
//!   it and all its ancestors. Deterministic; runs before any AI call.
//! - **Classification**: binds each eligible legacy module to the single
//!   best-matching target object, chosen by a completion model from the
//!   enumerated candidate list.
//! - **Matching**: maps each module's requirements one-to-one onto the
//!   applicable controls of its target object, in batches, with every
//!   returned identifier validated against the narrowed context.
//!
//! Completion responses are schema-validated before use; transient
//! failures are retried with exponential backoff, structurally wrong
//! answers are not. Each stage persists a JSON artifact whose existence
//! marks the stage complete, so interrupted runs resume without repeating
//! paid requests.
//!
//! # Example Usage
//!
//! ```ignore
//! use crosswalk::config::CrosswalkConfig;
//! use crosswalk::pipeline::{Pipeline, PipelinePaths, Stage};
//! use std::path::PathBuf;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = CrosswalkConfig::default();
//!     config.validate()?;
//!
//!     let paths = PipelinePaths {
//!         controls: PathBuf::from("modern.json"),
//!         target_objects: PathBuf::from("objects.json"),
//!         legacy: PathBuf::from("legacy.json"),
//!     };
//!
//!     Pipeline::new(config, paths).run(Stage::Full).await
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`catalog`]: reference-data loading and flattening
//! - [`hierarchy`]: deterministic applied-control resolution
//! - [`llm`]: schema-validated completion client and backends
//! - [`mapping`]: the two AI-assisted stages
//! - [`pipeline`]: orchestration and persisted artifacts

pub mod catalog;
pub mod cli;
pub mod config;
pub mod hierarchy;
pub mod llm;
pub mod mapping;
pub mod pipeline;

pub use config::CrosswalkConfig;
pub use hierarchy::{AppliedControls, HierarchyResolver};
pub use llm::{CompletionBackend, CompletionClient, CompletionError};
pub use mapping::{ModuleAssignment, RequirementMapping};
pub use pipeline::{Pipeline, PipelinePaths, Stage};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
