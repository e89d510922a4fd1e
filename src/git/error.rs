//! git::error
//!
//! Backend failures and their semantic classification.
//!
//! # Two layers
//!
//! - [`BackendError`] is what a [`Backend`](super::Backend) returns. Its
//!   variants describe *what went wrong mechanically* (a process exited
//!   non-zero, libgit2 reported a code, HEAD is detached).
//! - [`VcsError`] is what [`Repository`](super::Repository) returns. Every
//!   backend failure is classified into exactly one of four classes before it
//!   leaves the repository:
//!
//! | Class | Meaning | Caller reaction |
//! |---|---|---|
//! | [`ErrorClass::NotFound`] | identifier, path or branch does not exist | expected, branch on it |
//! | [`ErrorClass::Unsafe`] | workspace state precludes the operation | fatal to the operation |
//! | [`ErrorClass::Disjoint`] | no common ancestor | expected, branch on it |
//! | [`ErrorClass::Internal`] | anything else | surface as-is |
//!
//! `Internal` keeps the backend error as its [`std::error::Error::source`]
//! so the cause is available for diagnostics. Nothing is retried.

use std::path::PathBuf;

use thiserror::Error;

use super::backend::RepoState;
use crate::core::types::TypeError;

/// Mechanical failure reported by a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested object, ref, branch or path does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// HEAD points at an unborn branch (no commits yet).
    #[error("branch '{branch}' has no commits yet")]
    Unborn {
        /// The unborn branch name
        branch: String,
    },

    /// HEAD is not on a branch.
    #[error("HEAD is detached")]
    Detached,

    /// Checkout refused because local changes would be overwritten.
    #[error("checkout would overwrite local changes: {message}")]
    CheckoutConflict {
        /// Backend detail
        message: String,
    },

    /// Repository index or ref is locked by another process.
    #[error("repository is locked: {message}")]
    Locked {
        /// Backend detail
        message: String,
    },

    /// libgit2 reported an error.
    #[error("{context}: {message}")]
    Library {
        /// Operation being attempted
        context: String,
        /// libgit2 message
        message: String,
    },

    /// The git executable could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The git executable exited unsuccessfully.
    #[error("`git {args}` failed ({status}): {stderr}")]
    CommandFailed {
        /// Arguments passed to git
        args: String,
        /// Exit status description (`exit 128`, `killed by signal`)
        status: String,
        /// Trimmed stderr output
        stderr: String,
    },

    /// Backend output could not be interpreted.
    #[error("unexpected backend output: {message}")]
    Parse {
        /// What was wrong
        message: String,
    },

    /// Filesystem access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Build a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        BackendError::NotFound { what: what.into() }
    }

    /// Build a `Parse` error.
    pub fn parse(message: impl Into<String>) -> Self {
        BackendError::Parse {
            message: message.into(),
        }
    }

    /// Whether this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }
}

impl From<TypeError> for BackendError {
    fn from(err: TypeError) -> Self {
        BackendError::Parse {
            message: err.to_string(),
        }
    }
}

/// The four semantic error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Identifier, path or branch does not exist
    NotFound,
    /// Workspace state precludes the operation
    Unsafe,
    /// No common ancestor
    Disjoint,
    /// Unclassified backend failure
    Internal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::NotFound => write!(f, "not-found"),
            ErrorClass::Unsafe => write!(f, "unsafe"),
            ErrorClass::Disjoint => write!(f, "disjoint"),
            ErrorClass::Internal => write!(f, "internal"),
        }
    }
}

/// Classified error returned by every [`Repository`](super::Repository) operation.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Identifier, path or branch does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Workspace state precludes the operation.
    #[error("unsafe workspace: {reason}")]
    Unsafe {
        /// Why the workspace is unsafe
        reason: String,
    },

    /// The two commits share no history.
    #[error("no common ancestor between {from} and {to}")]
    Disjoint {
        /// First commit id
        from: String,
        /// Second commit id
        to: String,
    },

    /// Unclassified backend failure.
    #[error("{context}: {source}")]
    Internal {
        /// Operation being attempted
        context: String,
        /// Original backend error
        #[source]
        source: BackendError,
    },
}

impl VcsError {
    /// The semantic class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            VcsError::NotFound { .. } => ErrorClass::NotFound,
            VcsError::Unsafe { .. } => ErrorClass::Unsafe,
            VcsError::Disjoint { .. } => ErrorClass::Disjoint,
            VcsError::Internal { .. } => ErrorClass::Internal,
        }
    }

    /// Classify a backend failure.
    ///
    /// `context` names the operation (e.g. `"diff abc123..def456"`); it is
    /// kept on `Internal` errors and used as the subject of `NotFound` errors
    /// that carry no subject of their own.
    pub fn classify(context: impl Into<String>, err: BackendError) -> Self {
        let context = context.into();
        match err {
            BackendError::NotFound { what } => VcsError::NotFound { what },
            BackendError::Unborn { branch } => VcsError::NotFound {
                what: format!("commit on unborn branch '{}'", branch),
            },
            BackendError::Detached => VcsError::Unsafe {
                reason: format!("{}: HEAD is detached", context),
            },
            BackendError::CheckoutConflict { message } => VcsError::Unsafe {
                reason: format!("{}: local changes would be overwritten: {}", context, message),
            },
            BackendError::Locked { message } => VcsError::Unsafe {
                reason: format!("{}: repository is locked: {}", context, message),
            },
            other => VcsError::Internal {
                context,
                source: other,
            },
        }
    }

    /// Unsafe error for an in-progress operation.
    pub fn in_progress(state: &RepoState) -> Self {
        VcsError::Unsafe {
            reason: format!("{} in progress", state),
        }
    }

    /// Whether this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}
