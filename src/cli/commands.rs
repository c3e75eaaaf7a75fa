use crate::pipeline::Stage;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AI-assisted crosswalk between a legacy and a modern security catalog
#[derive(Parser, Debug)]
#[command(
    name = "crosswalk",
    about = "AI-assisted crosswalk between a legacy and a modern security catalog",
    version,
    author,
    long_about = "crosswalk resolves the modern catalog's target-object hierarchy into \
                  per-object applied-control sets, classifies each legacy module to its \
                  best-matching target object, and matches the module's requirements \
                  against the applicable controls. Every stage persists a JSON artifact \
                  and is skipped on restart when its artifact already exists."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose output (debug logging)")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the mapping pipeline",
        long_about = "Runs the selected pipeline stage (or all stages in order).\n\n\
                      Examples:\n  \
                      crosswalk run --controls modern.json --target-objects objects.json --legacy legacy.json\n  \
                      crosswalk run --stage hierarchy --controls modern.json --target-objects objects.json --legacy legacy.json\n  \
                      crosswalk run --stage match --force --matcher-model gemini-3-pro-preview \\\n    \
                      --controls modern.json --target-objects objects.json --legacy legacy.json"
    )]
    Run(RunArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageArg {
    /// Resolve the target-object hierarchy into applied-control sets
    Hierarchy,
    /// Classify legacy modules to target objects
    Classify,
    /// Match requirements against applicable controls
    Match,
    /// All stages in order
    Full,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Hierarchy => Stage::Hierarchy,
            StageArg::Classify => Stage::Classify,
            StageArg::Match => Stage::Match,
            StageArg::Full => Stage::Full,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        short = 's',
        long,
        value_enum,
        default_value = "full",
        help = "Pipeline stage to run"
    )]
    pub stage: StageArg,

    #[arg(long, value_name = "FILE", help = "Modern control catalog (JSON)")]
    pub controls: PathBuf,

    #[arg(long, value_name = "FILE", help = "Target-object hierarchy table (JSON)")]
    pub target_objects: PathBuf,

    #[arg(long, value_name = "FILE", help = "Legacy catalog (JSON)")]
    pub legacy: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Artifact output directory (default: CROSSWALK_OUTPUT_DIR or ./artifacts)"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Rebuild stage artifacts even when they already exist")]
    pub force: bool,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model for classification and matching (default: CROSSWALK_MODEL)"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "MODEL",
        help = "Stronger model for the matching stage only (default: CROSSWALK_MATCHER_MODEL)"
    )]
    pub matcher_model: Option<String>,

    #[arg(
        long,
        value_name = "N",
        help = "Process only the first N eligible modules (trial runs)"
    )]
    pub sample_limit: Option<usize>,
}
