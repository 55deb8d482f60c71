//! Built-in exclusion rules with gitignore semantics.

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

use crate::utils::normalize_path;

/// Dependency directories, build outputs, VCS metadata, caches, lockfiles and
/// binary artifacts across common ecosystems. Images and most dotfiles are
/// deliberately absent: images get described and dotfiles carry project context.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    // Python
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "__pycache__",
    ".pytest_cache",
    ".coverage",
    ".tox",
    ".nox",
    ".mypy_cache",
    ".ruff_cache",
    ".hypothesis",
    "poetry.lock",
    "Pipfile.lock",
    // JavaScript
    "node_modules",
    "bower_components",
    "package-lock.json",
    "yarn.lock",
    ".npm",
    ".yarn",
    ".pnpm-store",
    "bun.lock",
    "bun.lockb",
    // Java
    "*.class",
    "*.jar",
    "*.war",
    "*.ear",
    "*.nar",
    ".gradle/",
    "build/",
    ".settings/",
    ".classpath",
    "gradle-app.setting",
    "*.gradle",
    ".project",
    // C/C++
    "*.o",
    "*.obj",
    "*.dll",
    "*.dylib",
    "*.exe",
    "*.lib",
    "*.out",
    "*.a",
    "*.pdb",
    // Swift/Xcode
    ".build/",
    "*.xcodeproj/",
    "*.xcworkspace/",
    "*.pbxuser",
    "*.mode1v3",
    "*.mode2v3",
    "*.perspectivev3",
    "*.xcuserstate",
    "xcuserdata/",
    ".swiftpm/",
    // Ruby
    "*.gem",
    ".bundle/",
    "vendor/bundle",
    "Gemfile.lock",
    ".ruby-version",
    ".ruby-gemset",
    ".rvmrc",
    // Rust
    "Cargo.lock",
    "**/*.rs.bk",
    "target/",
    // Go
    "pkg/",
    // .NET
    "obj/",
    "*.suo",
    "*.user",
    "*.userosscache",
    "*.sln.docstates",
    "packages/",
    "*.nupkg",
    "bin/",
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Virtual environments
    "venv",
    ".venv",
    "env",
    "virtualenv",
    // Temporary and cache files
    "*.log",
    "*.bak",
    "*.swp",
    "*.tmp",
    "*.temp",
    ".cache",
    ".sass-cache",
    ".eslintcache",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // Build directories and artifacts
    "build",
    "dist",
    "target",
    "out",
    "*.egg-info",
    "*.egg",
    "*.whl",
    "*.so",
    // Documentation site builds
    "site-packages",
    ".docusaurus",
    ".next",
    ".nuxt",
    // Minified files and source maps
    "*.min.js",
    "*.min.css",
    "*.map",
    // Terraform
    ".terraform",
    "*.tfstate*",
    // Vendored dependencies
    "vendor/",
];

/// Immutable exclusion matcher, built once and shared by reference.
#[derive(Debug)]
pub struct ExclusionFilter {
    matcher: Gitignore,
    pattern_count: usize,
}

impl ExclusionFilter {
    /// Built-in patterns only.
    pub fn builtin() -> Result<Self> {
        Self::with_extra::<&str>(&[])
    }

    /// Built-in patterns followed by `extra`, in order.
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new("");
        let mut pattern_count = 0usize;

        let patterns =
            DEFAULT_EXCLUDE_PATTERNS.iter().copied().chain(extra.iter().map(|p| p.as_ref()));
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .with_context(|| format!("Invalid exclusion pattern: {pattern}"))?;
            pattern_count += 1;
        }

        let matcher = builder.build().context("Failed to build exclusion matcher")?;
        Ok(Self { matcher, pattern_count })
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Whether a repository-relative path is excluded.
    ///
    /// A trailing `/` marks the path as a directory. The path is also excluded
    /// when any of its ancestor directories is.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        let is_dir = relative_path.ends_with('/') || relative_path.ends_with('\\');
        self.matches(relative_path, is_dir)
    }

    /// Like [`is_excluded`](Self::is_excluded) with the entry kind known.
    pub fn matches(&self, relative_path: &str, is_dir: bool) -> bool {
        let normalized = normalize_path(relative_path);
        if normalized.is_empty() {
            return false;
        }
        self.matcher.matched_path_or_any_parents(Path::new(&normalized), is_dir).is_ignore()
    }
}
