pub mod resolver;

pub use resolver::{AppliedControls, HierarchyError, HierarchyResolver};
