//! Stage orchestration
//!
//! Drives the three stages in order: hierarchy resolution, module
//! classification, requirement matching. Each stage persists one artifact
//! and is skipped on restart when its artifact already exists, so an
//! interrupted run resumes from the last completed stage without repeating
//! paid AI calls. Hierarchy errors abort the run before any completion
//! request is issued.

use super::artifacts::{
    self, AppliedControlsArtifact, AssignmentsArtifact, MappingsArtifact, APPLIED_CONTROLS_FILE,
    ASSIGNMENTS_FILE, MAPPINGS_FILE,
};
use crate::catalog::loader;
use crate::catalog::types::{Control, LegacyModule, TargetObject};
use crate::config::CrosswalkConfig;
use crate::hierarchy::HierarchyResolver;
use crate::llm::CompletionClient;
use crate::mapping::{ModuleClassifier, RequirementMatcher};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

/// Which part of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Hierarchy,
    Classify,
    Match,
    Full,
}

/// The three reference-data input files.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub controls: PathBuf,
    pub target_objects: PathBuf,
    pub legacy: PathBuf,
}

pub struct Pipeline {
    config: CrosswalkConfig,
    paths: PipelinePaths,
    client: CompletionClient,
}

impl Pipeline {
    pub fn new(config: CrosswalkConfig, paths: PipelinePaths) -> Self {
        let client = config.create_client();
        Self {
            config,
            paths,
            client,
        }
    }

    /// Same pipeline over a caller-supplied client; used by tests to run
    /// against a mock backend.
    pub fn with_client(
        config: CrosswalkConfig,
        paths: PipelinePaths,
        client: CompletionClient,
    ) -> Self {
        Self {
            config,
            paths,
            client,
        }
    }

    pub async fn run(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Hierarchy => {
                self.run_hierarchy()?;
            }
            Stage::Classify => {
                self.run_classify().await?;
            }
            Stage::Match => {
                self.run_match().await?;
            }
            Stage::Full => {
                self.run_hierarchy()?;
                self.run_classify().await?;
                self.run_match().await?;
            }
        }
        Ok(())
    }

    fn artifact_path(&self, file: &str) -> PathBuf {
        artifacts::artifact_path(&self.config.output_dir, file)
    }

    /// An existing artifact marks its stage as complete unless overwriting
    /// was requested.
    fn load_existing<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.artifact_path(file);
        if self.config.overwrite_artifacts || !path.exists() {
            return Ok(None);
        }
        info!("{} already exists, skipping stage", path.display());
        let artifact = artifacts::load_json(&path)
            .with_context(|| format!("loading existing artifact {}", path.display()))?;
        Ok(Some(artifact))
    }

    fn load_controls(&self) -> Result<Vec<Control>> {
        loader::load_controls(&self.paths.controls).context("loading modern control catalog")
    }

    fn load_targets(&self) -> Result<Vec<TargetObject>> {
        loader::load_target_objects(&self.paths.target_objects)
            .context("loading target-object hierarchy")
    }

    fn load_modules(&self) -> Result<Vec<LegacyModule>> {
        let (mut eligible, _filtered) =
            loader::load_legacy_modules(&self.paths.legacy).context("loading legacy catalog")?;
        if let Some(limit) = self.config.sample_limit {
            if eligible.len() > limit {
                info!("Sample limit {limit}: truncating {} modules", eligible.len());
                eligible.truncate(limit);
            }
        }
        Ok(eligible)
    }

    fn run_hierarchy(&self) -> Result<AppliedControlsArtifact> {
        if let Some(existing) = self.load_existing(APPLIED_CONTROLS_FILE)? {
            return Ok(existing);
        }

        let controls = self.load_controls()?;
        let targets = self.load_targets()?;

        let resolver = HierarchyResolver::new(&targets, &controls)
            .context("building hierarchy resolver")?;
        let applied = resolver
            .resolve_all()
            .context("resolving applied controls")?;

        let artifact = AppliedControlsArtifact {
            generated_at: Utc::now(),
            applied,
        };
        artifacts::save_json(&self.artifact_path(APPLIED_CONTROLS_FILE), &artifact)?;
        Ok(artifact)
    }

    async fn run_classify(&self) -> Result<AssignmentsArtifact> {
        if let Some(existing) = self.load_existing(ASSIGNMENTS_FILE)? {
            return Ok(existing);
        }

        let targets = self.load_targets()?;
        let modules = self.load_modules()?;

        let classifier = ModuleClassifier::new(&self.client, &targets, None);
        let assignments = classifier.classify_all(&modules).await;

        let artifact = AssignmentsArtifact::from_assignments(assignments);
        artifacts::save_json(&self.artifact_path(ASSIGNMENTS_FILE), &artifact)?;
        Ok(artifact)
    }

    async fn run_match(&self) -> Result<MappingsArtifact> {
        if let Some(existing) = self.load_existing(MAPPINGS_FILE)? {
            return Ok(existing);
        }

        // Earlier stage artifacts are inputs here, so a match-only run
        // restarts from whatever the previous run persisted.
        let applied: AppliedControlsArtifact = self.require_artifact(APPLIED_CONTROLS_FILE)?;
        let assignments: AssignmentsArtifact = self.require_artifact(ASSIGNMENTS_FILE)?;

        let controls = self.load_controls()?;
        let targets = self.load_targets()?;
        let modules = self.load_modules()?;

        let matcher = RequirementMatcher::new(&self.client, self.config.matcher_model.clone());
        let mappings = matcher
            .match_all(
                &assignments.to_assignments(),
                &modules,
                &targets,
                &controls,
                &applied.applied,
            )
            .await;

        let artifact = MappingsArtifact::from_mappings(mappings);
        artifacts::save_json(&self.artifact_path(MAPPINGS_FILE), &artifact)?;
        Ok(artifact)
    }

    fn require_artifact<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.artifact_path(file);
        anyhow::ensure!(
            path.exists(),
            "required artifact {} is missing; run the earlier stage first",
            path.display()
        );
        artifacts::load_json(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionBackend, MockBackend, RetryPolicy};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    fn write_fixtures(dir: &Path) -> PipelinePaths {
        let controls = dir.join("controls.json");
        fs::write(
            &controls,
            r#"{"catalog": {"groups": [
                {"id": "G1", "controls": [
                    {"id": "GPP.1.1", "title": "Patching",
                     "parts": [{"name": "statement", "prose": "Patch.",
                                "props": [{"name": "target_objects", "value": "Server"}]}]}
                ]}
            ]}}"#,
        )
        .unwrap();

        let target_objects = dir.join("target_objects.json");
        fs::write(
            &target_objects,
            r#"{"target_objects": [
                {"id": "11111111-1111-1111-1111-111111111111",
                 "name": "Server", "definition": "A server."}
            ]}"#,
        )
        .unwrap();

        let legacy = dir.join("legacy.json");
        fs::write(
            &legacy,
            r#"{"catalog": {"groups": [
                {"id": "SYS", "groups": [
                    {"id": "SYS.1.1", "title": "General Server", "class": "module",
                     "parts": [{"name": "description", "prose": "Servers."}],
                     "controls": [
                        {"id": "SYS.1.1.A1", "title": "Access",
                         "parts": [{"name": "requirement", "class": "maturity-level-defined",
                                    "parts": [{"name": "statement", "prose": "Restrict."}]}]}
                     ]}
                ]}
            ]}}"#,
        )
        .unwrap();

        PipelinePaths {
            controls,
            target_objects,
            legacy,
        }
    }

    fn test_config(output_dir: &Path) -> CrosswalkConfig {
        let mut config = CrosswalkConfig::default();
        config.output_dir = output_dir.to_path_buf();
        config.overwrite_artifacts = false;
        config.sample_limit = None;
        config
    }

    fn scripted_client(backend: &Arc<MockBackend>) -> CompletionClient {
        CompletionClient::with_policy(
            backend.clone() as Arc<dyn CompletionBackend>,
            2,
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                jitter: 0.0,
            },
        )
    }

    #[tokio::test]
    async fn full_run_produces_all_three_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_fixtures(dir.path());
        let out = dir.path().join("out");

        let backend = Arc::new(MockBackend::new());
        backend.push_json(serde_json::json!({"matched_target_object": "Server"}));
        backend.push_json(serde_json::json!({
            "mapping": {"SYS.1.1.A1": "GPP.1.1"},
            "unmatched_requirements": []
        }));

        let pipeline =
            Pipeline::with_client(test_config(&out), paths, scripted_client(&backend));
        pipeline.run(Stage::Full).await.unwrap();

        assert!(out.join(APPLIED_CONTROLS_FILE).exists());
        assert!(out.join(ASSIGNMENTS_FILE).exists());
        assert!(out.join(MAPPINGS_FILE).exists());

        let mappings: MappingsArtifact =
            artifacts::load_json(&out.join(MAPPINGS_FILE)).unwrap();
        assert_eq!(mappings.mappings.len(), 1);
        assert_eq!(mappings.mappings[0].mapping["SYS.1.1.A1"], "GPP.1.1");
        assert!(mappings.mappings[0].unmatched_requirements.is_empty());
    }

    #[tokio::test]
    async fn completed_stages_are_skipped_on_restart() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_fixtures(dir.path());
        let out = dir.path().join("out");

        let backend = Arc::new(MockBackend::new());
        backend.push_json(serde_json::json!({"matched_target_object": "Server"}));
        backend.push_json(serde_json::json!({
            "mapping": {"SYS.1.1.A1": "GPP.1.1"},
            "unmatched_requirements": []
        }));
        let pipeline = Pipeline::with_client(
            test_config(&out),
            paths.clone(),
            scripted_client(&backend),
        );
        pipeline.run(Stage::Full).await.unwrap();
        assert_eq!(backend.calls(), 2);

        // Second run with an empty mock: no stage may issue a request.
        let idle = Arc::new(MockBackend::new());
        let pipeline =
            Pipeline::with_client(test_config(&out), paths, scripted_client(&idle));
        pipeline.run(Stage::Full).await.unwrap();
        assert_eq!(idle.calls(), 0);
    }

    #[tokio::test]
    async fn match_stage_requires_earlier_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_fixtures(dir.path());
        let out = dir.path().join("out");

        let backend = Arc::new(MockBackend::new());
        let pipeline =
            Pipeline::with_client(test_config(&out), paths, scripted_client(&backend));

        let err = pipeline.run(Stage::Match).await.unwrap_err();
        assert!(format!("{err:#}").contains("run the earlier stage first"));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn hierarchy_stage_alone_issues_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_fixtures(dir.path());
        let out = dir.path().join("out");

        let backend = Arc::new(MockBackend::new());
        let pipeline =
            Pipeline::with_client(test_config(&out), paths, scripted_client(&backend));
        pipeline.run(Stage::Hierarchy).await.unwrap();

        assert!(out.join(APPLIED_CONTROLS_FILE).exists());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn overwrite_reruns_a_completed_stage() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_fixtures(dir.path());
        let out = dir.path().join("out");

        let backend = Arc::new(MockBackend::new());
        backend.push_json(serde_json::json!({"matched_target_object": "Server"}));
        let pipeline = Pipeline::with_client(
            test_config(&out),
            paths.clone(),
            scripted_client(&backend),
        );
        pipeline.run(Stage::Classify).await.unwrap();
        assert_eq!(backend.calls(), 1);

        let mut config = test_config(&out);
        config.overwrite_artifacts = true;
        let backend = Arc::new(MockBackend::new());
        backend.push_json(serde_json::json!({"matched_target_object": "Server"}));
        let pipeline = Pipeline::with_client(config, paths, scripted_client(&backend));
        pipeline.run(Stage::Classify).await.unwrap();
        assert_eq!(backend.calls(), 1);
    }
}
