pub mod loader;
pub mod parser;
pub mod types;

pub use loader::{load_controls, load_legacy_modules, load_target_objects, CatalogError};
pub use types::{
    Control, ControlParameter, LegacyModule, LegacyRequirement, TargetObject, ASSET_GROUPS,
    PROCESS_BUCKET_ID, PROCESS_GROUPS,
};
