//! git::factory
//!
//! Backend selection and creation.
//!
//! # Design
//!
//! Callers use [`create_backend`] instead of naming a concrete backend type,
//! so [`Repository`](super::Repository) and the CLI stay independent of how
//! git is reached. The choice comes from configuration (`backend = "cli"`)
//! or the `--backend` flag.
//!
//! # Example
//!
//! ```ignore
//! use vcscope::core::config::Config;
//! use vcscope::git::{create_backend, BackendKind};
//! use std::path::Path;
//!
//! let config = Config::load(None)?;
//! let backend = create_backend(BackendKind::Cli, Path::new("."), &config)?;
//! println!("using {}", backend.name());
//! ```

use std::path::Path;

use super::backend::Backend;
use super::cli::CliBackend;
use super::error::BackendError;
use super::libgit2::Git2Backend;
use crate::core::config::Config;

/// Available backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Linked libgit2 (default)
    #[default]
    Libgit2,
    /// Spawned `git` executable
    Cli,
}

impl BackendKind {
    /// Every backend, in preference order.
    ///
    /// # Example
    ///
    /// ```
    /// use vcscope::git::BackendKind;
    ///
    /// assert_eq!(BackendKind::all()[0], BackendKind::Libgit2);
    /// ```
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Libgit2, BackendKind::Cli]
    }

    /// Name used in configuration files and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Libgit2 => "libgit2",
            BackendKind::Cli => "cli",
        }
    }

    /// Parse a backend from its name.
    ///
    /// # Example
    ///
    /// ```
    /// use vcscope::git::BackendKind;
    ///
    /// assert_eq!(BackendKind::from_name("cli"), Some(BackendKind::Cli));
    /// assert_eq!(BackendKind::from_name("LIBGIT2"), Some(BackendKind::Libgit2));
    /// assert_eq!(BackendKind::from_name("hg"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "libgit2" | "git2" => Some(BackendKind::Libgit2),
            "cli" | "git" => Some(BackendKind::Cli),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Canonical backend names, for validation messages and CLI help.
pub fn valid_backend_names() -> Vec<&'static str> {
    BackendKind::all().iter().map(|k| k.name()).collect()
}

/// Open the repository containing `path` with the given backend.
///
/// The cli backend runs `config.git_binary()`.
///
/// # Errors
///
/// Whatever the backend's `open` reports: not a repository, bare
/// repository, or an unusable git executable.
pub fn create_backend(
    kind: BackendKind,
    path: &Path,
    config: &Config,
) -> Result<Box<dyn Backend>, BackendError> {
    log::debug!("opening {} with the {} backend", path.display(), kind);
    match kind {
        BackendKind::Libgit2 => Ok(Box::new(Git2Backend::open(path)?)),
        BackendKind::Cli => Ok(Box::new(CliBackend::open(path, config.git_binary())?)),
    }
}
