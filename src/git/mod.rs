//! git
//!
//! Backend-independent access to git repositories.
//!
//! # Architecture
//!
//! [`Repository`] is the only type callers need. It speaks to git through
//! the [`Backend`] trait, which has three implementations:
//!
//! - [`Git2Backend`] - linked libgit2 (default)
//! - [`CliBackend`] - the `git` executable, one process per query
//! - [`mock::MockBackend`] - in-memory, for tests
//!
//! No other module imports `git2` or spawns `git`.
//!
//! # Errors
//!
//! Backends report [`BackendError`]. `Repository` classifies every failure
//! into one of four [`ErrorClass`]es (not-found, unsafe, disjoint, internal)
//! so callers can decide what to do without knowing which backend ran.
//!
//! # Example
//!
//! ```ignore
//! use vcscope::core::config::Config;
//! use vcscope::git::Repository;
//! use std::path::Path;
//!
//! let repo = Repository::open(Path::new("."), &Config::load(None)?)?;
//! let head = repo.current_branch_commit()?;
//! for delta in repo.changes(&head)? {
//!     println!("{}", delta);
//! }
//! ```

mod backend;
mod cli;
mod error;
mod factory;
mod libgit2;
pub mod mock;
mod repository;

pub use backend::{Backend, DiffOptions, Head, RepoState, WorkspaceOptions};
pub use cli::CliBackend;
pub use error::{BackendError, ErrorClass, VcsError};
pub use factory::{create_backend, valid_backend_names, BackendKind};
pub use libgit2::Git2Backend;
pub use repository::Repository;
