//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$VCSCOPE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/vcscope/config.toml`
//! 3. `~/.vcscope/config.toml`
//!
//! # Repo Config
//!
//! Located at `<git_dir>/vcscope/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing (e.g., `backend` must name a known
//! backend, `git_binary` must not be empty).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// backend = "cli"
/// git_binary = "/usr/local/bin/git"
/// detect_renames = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Backend name ("libgit2" or "cli")
    pub backend: Option<String>,

    /// Path to the git executable used by the cli backend
    pub git_binary: Option<PathBuf>,

    /// Report renames and copies instead of delete/add pairs
    pub detect_renames: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend(self.backend.as_deref())?;

        if let Some(binary) = &self.git_binary {
            if binary.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_binary cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// backend = "libgit2"
/// detect_renames = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Backend override for this repository
    pub backend: Option<String>,

    /// Rename detection override for this repository
    pub detect_renames: Option<bool>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend(self.backend.as_deref())
    }
}

fn validate_backend(backend: Option<&str>) -> Result<(), ConfigError> {
    if let Some(name) = backend {
        let valid = crate::git::valid_backend_names();
        if !valid.contains(&name) {
            return Err(ConfigError::InvalidValue(format!(
                "invalid backend '{}', must be one of: {}",
                name,
                valid.join(", ")
            )));
        }
    }
    Ok(())
}
