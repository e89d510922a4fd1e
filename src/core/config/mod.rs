//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes:
//! - **Global**: user-level settings
//! - **Repo**: per-repository overrides
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (applied by the caller via [`Config::with_backend`])
//!
//! # Global Config Locations
//!
//! Searched in order, first existing file wins:
//! 1. `$VCSCOPE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/vcscope/config.toml`
//! 3. `~/.vcscope/config.toml`
//!
//! # Repo Config Location
//!
//! `<git_dir>/vcscope/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use vcscope::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//! println!("backend: {}", config.backend());
//! println!("renames: {}", config.detect_renames());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::paths::ScopePaths;
use crate::git::BackendKind;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: repo config overrides global config, and
/// both fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if a repo was given and has one)
    pub repo: Option<RepoConfig>,
    /// Backend chosen on the command line
    backend_override: Option<BackendKind>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// If `git_dir` is provided, also loads the repo config stored there.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated. Missing files are not an error.
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(&Self::global_candidates(), git_dir)
    }

    /// Load configuration from explicit global candidates.
    ///
    /// The first candidate that exists is read. This is the environment-free
    /// core of [`Config::load`].
    pub fn load_from(global_candidates: &[PathBuf], git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let (global, global_path) = match global_candidates.iter().find(|p| p.exists()) {
            Some(path) => (read_toml::<GlobalConfig>(path)?, Some(path.clone())),
            None => (GlobalConfig::default(), None),
        };

        let (repo, repo_path) = match git_dir.map(|d| ScopePaths::new(d.to_path_buf()).config_path()) {
            Some(path) if path.exists() => (Some(read_toml::<RepoConfig>(&path)?), Some(path)),
            _ => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        log::debug!(
            "config loaded (global: {:?}, repo: {:?})",
            global_path,
            repo_path
        );

        Ok(Config {
            global,
            repo,
            backend_override: None,
            global_path,
            repo_path,
        })
    }

    /// Global config locations in search order.
    fn global_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(path) = std::env::var_os("VCSCOPE_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Some(xdg_home) = std::env::var_os("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("vcscope/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".vcscope/config.toml"));
        }

        candidates
    }

    /// Override the backend, as a CLI flag does.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend_override = Some(backend);
        self
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// The backend to open repositories with.
    ///
    /// Defaults to [`BackendKind::Libgit2`].
    pub fn backend(&self) -> BackendKind {
        if let Some(kind) = self.backend_override {
            return kind;
        }

        self.repo
            .as_ref()
            .and_then(|r| r.backend.as_deref())
            .or(self.global.backend.as_deref())
            .and_then(BackendKind::from_name)
            .unwrap_or_default()
    }

    /// Path to the git executable for the cli backend.
    ///
    /// Defaults to `git` (looked up on `PATH`).
    pub fn git_binary(&self) -> &Path {
        self.global
            .git_binary
            .as_deref()
            .unwrap_or_else(|| Path::new("git"))
    }

    /// Whether diffs report renames and copies.
    ///
    /// Defaults to `false`: a moved file is a deletion plus an addition.
    pub fn detect_renames(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.detect_renames)
            .or(self.global.detect_renames)
            .unwrap_or(false)
    }

    /// Path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
