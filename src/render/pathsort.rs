//! Directory-aware ordering of slash-separated paths.

use std::cmp::Ordering;

/// Compare two paths segment by segment, ignoring case.
///
/// When two paths agree on a segment, the one with fewer segments sorts first,
/// so `src/main.rs` precedes `src/bin/tool.rs` and a leaf precedes a
/// same-named directory.
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    let a: Vec<&str> = a.split('/').collect();
    let b: Vec<&str> = b.split('/').collect();

    for i in 0..a.len().max(b.len()) {
        let (Some(left), Some(right)) = (a.get(i), b.get(i)) else {
            return a.len().cmp(&b.len());
        };
        match left.to_uppercase().cmp(&right.to_uppercase()) {
            Ordering::Equal => {}
            other => return other,
        }
        match a.len().cmp(&b.len()) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Stable sort of `paths` by [`compare_paths`].
pub fn sort_paths(mut paths: Vec<String>) -> Vec<String> {
    paths.sort_by(|a, b| compare_paths(a, b));
    paths
}
