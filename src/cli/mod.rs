//! cli
//!
//! Command-line interface layer for vcscope.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and open the repository
//! - Take the workspace lock each command needs
//! - Delegate to command handlers and report errors with their class
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers call [`Repository`] operations and format
//! what comes back; `anyhow` is used only at this boundary.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::lock::{LockMode, WorkspaceLock};
use crate::core::paths::ScopePaths;
use crate::git::{BackendKind, DiffOptions, ErrorClass, Repository, VcsError};
use crate::ui::output::{self, Verbosity};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory to run in (current directory if `None`)
    pub cwd: Option<PathBuf>,
    /// Output verbosity
    pub verbosity: Verbosity,
    /// Print results as JSON
    pub json: bool,
    /// Backend chosen with `--backend`
    pub backend: Option<BackendKind>,
}

/// An open repository plus the lock taken for the command.
///
/// The lock is released when the session is dropped.
#[derive(Debug)]
pub struct Session {
    /// The repository
    pub repo: Repository,
    /// Configuration the repository was opened with
    pub config: Config,
    _lock: WorkspaceLock,
}

impl Context {
    /// Directory the command runs in.
    pub fn working_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("failed to read the current directory"),
        }
    }

    pub(crate) fn apply_flags(&self, config: Config) -> Config {
        match self.backend {
            Some(kind) => config.with_backend(kind),
            None => config,
        }
    }

    /// Load configuration without a repository (global file and flags only).
    pub fn global_config(&self) -> Result<Config> {
        Ok(self.apply_flags(Config::load(None)?))
    }

    /// Open the repository and take the workspace lock.
    ///
    /// The repository config lives inside the `.git` directory, so the
    /// repository is first opened with the global config, then reopened if
    /// the repository config selects a different backend.
    pub fn open(&self, mode: LockMode) -> Result<Session> {
        let dir = self.working_dir()?;
        let global = self.global_config()?;
        let probe = Repository::open(&dir, &global)?;

        let config = self.apply_flags(Config::load(Some(probe.git_dir()))?);
        let repo = if config.backend() != global.backend() {
            output::debug(
                format!("repository config selects the {} backend", config.backend()),
                self.verbosity,
            );
            Repository::open(&dir, &config)?
        } else {
            probe.with_diff_options(DiffOptions {
                detect_renames: config.detect_renames(),
            })
        };

        let paths = ScopePaths::new(repo.git_dir().to_path_buf());
        let lock = WorkspaceLock::acquire(&paths, mode)
            .with_context(|| format!("cannot lock {}", repo.path().display()))?;

        output::debug(
            format!("opened {} with {}", repo.path().display(), repo.backend_name()),
            self.verbosity,
        );
        Ok(Session {
            repo,
            config,
            _lock: lock,
        })
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    output::init_logging(verbosity);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        verbosity,
        json: cli.json,
        backend: cli.backend,
    };

    commands::dispatch(cli.command, &ctx)
}

/// The repository error behind a CLI failure, if there is one.
pub fn vcs_error(err: &anyhow::Error) -> Option<&VcsError> {
    err.chain().find_map(|cause| cause.downcast_ref::<VcsError>())
}

/// One-line description of a failure, prefixed with its error class.
pub fn describe_error(err: &anyhow::Error) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        parts.push(cause.to_string());
        // A VcsError message already includes its own sources
        if let Some(vcs) = cause.downcast_ref::<VcsError>() {
            return format!("{}: {}", vcs.class(), parts.join(": "));
        }
    }
    parts.join(": ")
}

/// Process exit code for a failure.
///
/// | class | code |
/// |---|---|
/// | internal, or not a repository error | 1 |
/// | not-found | 2 |
/// | unsafe | 3 |
/// | disjoint | 4 |
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match vcs_error(err).map(VcsError::class) {
        Some(ErrorClass::NotFound) => 2,
        Some(ErrorClass::Unsafe) => 3,
        Some(ErrorClass::Disjoint) => 4,
        Some(ErrorClass::Internal) | None => 1,
    }
}
