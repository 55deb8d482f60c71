//! Shared helpers for paths, encodings, and media-type classification.

pub mod classify;
pub mod encoding;
pub mod paths;

pub use classify::{classify_file, FileKind};
pub use encoding::{decode_text, is_binary_sample};
pub use paths::normalize_path;
