//! Snapshot rendering: canonical text, path ordering, tree listing.

pub mod canonical;
pub mod pathsort;
pub mod tree;

pub use canonical::{format_files, BANNER_WIDTH};
pub use pathsort::{compare_paths, sort_paths};
pub use tree::render_tree;
