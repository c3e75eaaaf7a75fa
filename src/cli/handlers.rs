//! Command handlers
//!
//! Bridges parsed CLI arguments to the pipeline: environment configuration
//! with CLI overrides applied on top, then one pipeline run. Returns a
//! process exit code instead of propagating errors, so `main` stays a thin
//! wrapper.

use super::commands::RunArgs;
use crate::config::CrosswalkConfig;
use crate::pipeline::{Pipeline, PipelinePaths};
use tracing::{debug, error, info};

pub async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    let mut config = CrosswalkConfig::default();
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(matcher_model) = &args.matcher_model {
        config.matcher_model = Some(matcher_model.clone());
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if args.force {
        config.overwrite_artifacts = true;
    }
    if let Some(limit) = args.sample_limit {
        config.sample_limit = Some(limit).filter(|&n| n > 0);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return 2;
    }
    debug!("{config}");

    let paths = PipelinePaths {
        controls: args.controls.clone(),
        target_objects: args.target_objects.clone(),
        legacy: args.legacy.clone(),
    };

    let pipeline = Pipeline::new(config, paths);
    match pipeline.run(args.stage.into()).await {
        Ok(()) => {
            if !quiet {
                info!("Pipeline run completed");
            }
            0
        }
        Err(e) => {
            error!("Pipeline run failed: {e:#}");
            1
        }
    }
}
