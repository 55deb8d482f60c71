//! Working-tree discovery: exclusion rules, walking, and classification.

pub mod exclude;
pub mod walker;

pub use exclude::ExclusionFilter;
pub use walker::{ClassifiedFile, TreeWalker, WalkStats};
