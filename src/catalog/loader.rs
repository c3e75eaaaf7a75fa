//! Reference-data file loading
//!
//! Thin wrappers around `serde_json` that read the three reference inputs
//! and surface missing or unreadable files as fatal configuration errors.

use super::parser::{self, RawCatalog, RawTargetObjectTable};
use super::types::{Control, LegacyModule, TargetObject};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading reference data. All of these are fatal for
/// the run: the pipeline cannot proceed on partial reference data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("missing required reference file: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::MissingFile(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the modern control catalog and flattens it into `Control` records.
pub fn load_controls(path: &Path) -> Result<Vec<Control>, CatalogError> {
    let raw: RawCatalog = read_json(path)?;
    let controls = parser::parse_modern_controls(&raw);
    info!(
        "Loaded {} controls from {}",
        controls.len(),
        path.display()
    );
    Ok(controls)
}

/// Loads the target-object hierarchy table.
pub fn load_target_objects(path: &Path) -> Result<Vec<TargetObject>, CatalogError> {
    let raw: RawTargetObjectTable = read_json(path)?;
    info!(
        "Loaded {} target objects from {}",
        raw.target_objects.len(),
        path.display()
    );
    Ok(raw.target_objects)
}

/// Loads the legacy catalog and flattens it into modules. Returns the
/// eligible modules and those filtered out by the group allow-list.
pub fn load_legacy_modules(
    path: &Path,
) -> Result<(Vec<LegacyModule>, Vec<LegacyModule>), CatalogError> {
    let raw: RawCatalog = read_json(path)?;
    let (eligible, filtered) = parser::parse_legacy_modules(&raw);
    info!(
        "Loaded {} eligible legacy modules from {} ({} filtered out)",
        eligible.len(),
        path.display(),
        filtered.len()
    );
    Ok((eligible, filtered))
}
