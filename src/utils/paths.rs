//! Path normalization

/// Normalize a repository-relative path to the stored form.
///
/// Backslashes become forward slashes, leading `/` and `./` are dropped, and
/// empty or `.` segments are removed.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
