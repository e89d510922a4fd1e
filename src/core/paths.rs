//! core::paths
//!
//! Path policies shared by every backend.
//!
//! # Repository paths
//!
//! Every path crossing the backend boundary is **repository-relative** and
//! **`/`-separated**, with no `.` components, no leading `./`, and no
//! trailing `/`. Backends pass what git reports through [`git_path`], which
//! never rewrites a character: on Unix `\` is an ordinary filename byte.
//! The repository normalizes what callers pass in with
//! [`normalize_repo_path`], which also accepts `\` as a separator on
//! Windows, so a path looked up by a caller compares equal to the path a
//! diff reported.
//!
//! # Storage
//!
//! Crate-owned files (repo config, workspace lock) live under
//! `<git_dir>/vcscope/`. All such locations are computed by [`ScopePaths`].
//!
//! # Example
//!
//! ```
//! use vcscope::core::paths::normalize_repo_path;
//!
//! assert_eq!(normalize_repo_path("./src//lib.rs").as_deref(), Some("src/lib.rs"));
//! assert_eq!(normalize_repo_path("docs/"), Some("docs".to_string()));
//! assert_eq!(normalize_repo_path("../outside"), None);
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Normalize a caller-supplied path to the repository-relative form.
///
/// Returns `None` for paths that cannot name an entry inside the
/// repository: empty paths, the root itself, and paths escaping it via
/// `..`. A leading `/` is read as "from the repository root". On Windows
/// `\` is also a separator.
pub fn normalize_repo_path(raw: &str) -> Option<String> {
    clean_components(&unify_separators(raw))
}

/// A path as git reported it, in the repository-relative form.
///
/// Only `/` separates components; every other byte is kept. `None` for
/// paths that cannot name an entry (empty, `.` or `..` components).
pub fn git_path(raw: &str) -> Option<String> {
    clean_components(raw)
}

#[cfg(windows)]
fn unify_separators(raw: &str) -> Cow<'_, str> {
    Cow::Owned(raw.replace('\\', "/"))
}

#[cfg(not(windows))]
fn unify_separators(raw: &str) -> Cow<'_, str> {
    Cow::Borrowed(raw)
}

fn clean_components(path: &str) -> Option<String> {
    let mut components = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => return None,
            c => components.push(c),
        }
    }

    if components.is_empty() {
        None
    } else {
        Some(components.join("/"))
    }
}

/// Normalize a list of pathspec filters.
///
/// Leading `./` is removed and glob characters are left alone. On Windows
/// `\` is read as a separator; elsewhere it stays a glob escape. Filters
/// that select the whole tree (`""`, `"."`, `"./"`) are dropped, so an
/// empty result means "everything".
///
/// # Example
///
/// ```
/// use vcscope::core::paths::normalize_pathspecs;
///
/// let specs = normalize_pathspecs(&[".", "./app/*.rs", "lib/"]);
/// assert_eq!(specs, ["app/*.rs", "lib"]);
/// ```
pub fn normalize_pathspecs<S: AsRef<str>>(specs: &[S]) -> Vec<String> {
    specs
        .iter()
        .filter_map(|spec| {
            let unified = unify_separators(spec.as_ref());
            let mut trimmed: &str = &unified;
            while let Some(rest) = trimmed.strip_prefix("./") {
                trimmed = rest;
            }
            let trimmed = trimmed.trim_end_matches('/');
            if trimmed.is_empty() || trimmed == "." {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Locations of crate-owned files inside a repository's git directory.
///
/// # Example
///
/// ```
/// use vcscope::core::paths::ScopePaths;
/// use std::path::PathBuf;
///
/// let paths = ScopePaths::new(PathBuf::from("/repo/.git"));
/// assert_eq!(paths.config_path(), PathBuf::from("/repo/.git/vcscope/config.toml"));
/// assert_eq!(paths.lock_path(), PathBuf::from("/repo/.git/vcscope/lock"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePaths {
    git_dir: PathBuf,
}

impl ScopePaths {
    /// Create paths rooted at a git directory.
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    /// The git directory itself.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// `<git_dir>/vcscope`
    pub fn scope_dir(&self) -> PathBuf {
        self.git_dir.join("vcscope")
    }

    /// `<git_dir>/vcscope/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.scope_dir().join("config.toml")
    }

    /// `<git_dir>/vcscope/lock`
    pub fn lock_path(&self) -> PathBuf {
        self.scope_dir().join("lock")
    }

    /// Create the scope directory if it doesn't exist.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.scope_dir())
    }
}
