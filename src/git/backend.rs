//! git::backend
//!
//! The capability every backend provides.
//!
//! # Contract
//!
//! A [`Backend`] answers narrow questions about one working copy: resolve a
//! commit, list a tree, diff two trees, list working-tree changes, compute
//! merge bases, read a blob, inspect HEAD, check out. It returns
//! [`BackendError`] and knows nothing about error classes; classification
//! happens once, in [`Repository`](super::Repository).
//!
//! Paths in and out are repository-relative and `/`-separated (see
//! [`crate::core::paths`]). Ids are full lowercase hex.
//!
//! Implementations:
//! - [`Git2Backend`](super::libgit2::Git2Backend): linked libgit2
//! - [`CliBackend`](super::cli::CliBackend): spawned `git` processes
//! - [`MockBackend`](super::mock::MockBackend): scripted, for tests

use std::path::Path;

use super::error::BackendError;
use crate::core::types::{BranchName, DiffDelta, Oid, TreeEntry};

/// What HEAD currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// HEAD is a local branch with at least one commit.
    Branch {
        /// The branch
        name: BranchName,
        /// Its tip
        oid: Oid,
    },
    /// HEAD points directly at a commit.
    Detached(Oid),
    /// HEAD names a branch that has no commits yet.
    Unborn {
        /// The branch HEAD will create
        name: String,
    },
}

impl Head {
    /// The commit HEAD resolves to, if any.
    pub fn oid(&self) -> Option<&Oid> {
        match self {
            Head::Branch { oid, .. } | Head::Detached(oid) => Some(oid),
            Head::Unborn { .. } => None,
        }
    }
}

/// Repository operation state.
///
/// Anything other than `Clean` means a multi-step operation was started and
/// not finished; the working copy is not in a state this crate will touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoState {
    /// No operation in progress.
    Clean,

    /// Rebase in progress.
    Rebase {
        /// Current step in the rebase (1-indexed), if available.
        current: Option<usize>,
        /// Total steps in the rebase, if available.
        total: Option<usize>,
    },

    /// Merge in progress.
    Merge,

    /// Cherry-pick in progress.
    CherryPick,

    /// Revert in progress.
    Revert,

    /// Bisect in progress.
    Bisect,

    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl RepoState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use vcscope::git::RepoState;
    ///
    /// assert!(!RepoState::Clean.is_in_progress());
    /// assert!(RepoState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, RepoState::Clean)
    }

    /// Short name of the state.
    pub fn description(&self) -> &'static str {
        match self {
            RepoState::Clean => "clean",
            RepoState::Rebase { .. } => "rebase",
            RepoState::Merge => "merge",
            RepoState::CherryPick => "cherry-pick",
            RepoState::Revert => "revert",
            RepoState::Bisect => "bisect",
            RepoState::ApplyMailbox => "apply-mailbox",
        }
    }

    /// Detect an in-progress operation from the marker files git leaves in
    /// its directory.
    ///
    /// Used by backends that have no library call for it.
    pub fn from_git_dir(git_dir: &Path) -> Self {
        let rebase_merge = git_dir.join("rebase-merge");
        if rebase_merge.is_dir() {
            return RepoState::Rebase {
                current: read_counter(&rebase_merge.join("msgnum")),
                total: read_counter(&rebase_merge.join("end")),
            };
        }

        let rebase_apply = git_dir.join("rebase-apply");
        if rebase_apply.is_dir() {
            // rebase-apply is shared by `git am` and the apply rebase backend
            if rebase_apply.join("applying").exists() {
                return RepoState::ApplyMailbox;
            }
            return RepoState::Rebase {
                current: read_counter(&rebase_apply.join("next")),
                total: read_counter(&rebase_apply.join("last")),
            };
        }

        if git_dir.join("MERGE_HEAD").exists() {
            RepoState::Merge
        } else if git_dir.join("CHERRY_PICK_HEAD").exists() {
            RepoState::CherryPick
        } else if git_dir.join("REVERT_HEAD").exists() {
            RepoState::Revert
        } else if git_dir.join("BISECT_LOG").exists() {
            RepoState::Bisect
        } else {
            RepoState::Clean
        }
    }
}

fn read_counter(path: &Path) -> Option<usize> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

impl std::fmt::Display for RepoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            _ => write!(f, "{}", self.description()),
        }
    }
}

/// Options for tree-to-tree and index-to-workdir diffs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Pair deletions with additions of similar content as renames/copies.
    pub detect_renames: bool,
}

/// Options for working-tree queries.
///
/// Both flags default to `true`. With `recurse_untracked_dirs` off, a new
/// directory is reported as a single entry instead of one entry per file,
/// which is never what a change-set consumer wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceOptions {
    /// Report files that are not tracked (and not ignored).
    pub include_untracked: bool,
    /// Expand untracked directories into their files.
    pub recurse_untracked_dirs: bool,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            include_untracked: true,
            recurse_untracked_dirs: true,
        }
    }
}

/// One way of answering questions about a working copy.
///
/// Methods take `&self`; a backend keeps no state between calls that would
/// make one answer depend on the previous one.
pub trait Backend: Send {
    /// Short backend name (`libgit2`, `cli`, `mock`).
    fn name(&self) -> &'static str;

    /// Root of the working directory.
    fn workdir(&self) -> &Path;

    /// The `.git` directory.
    fn git_dir(&self) -> &Path;

    /// Resolve a revision to a commit id and verify its tree is readable.
    ///
    /// Unknown revisions and revisions that do not name a commit are
    /// [`BackendError::NotFound`].
    fn resolve_commit(&self, spec: &str) -> Result<Oid, BackendError>;

    /// Parent ids of a commit, first parent first.
    fn commit_parents(&self, commit: &Oid) -> Result<Vec<Oid>, BackendError>;

    /// Every non-directory entry under the commit's tree, recursively.
    fn tree_entries(&self, commit: &Oid) -> Result<Vec<TreeEntry>, BackendError>;

    /// The tree entry at `path` in the commit's tree.
    fn entry(&self, commit: &Oid, path: &str) -> Result<TreeEntry, BackendError>;

    /// Raw contents of a blob.
    fn read_blob(&self, blob: &Oid) -> Result<Vec<u8>, BackendError>;

    /// Path-level diff between two commits' trees.
    ///
    /// `old = None` diffs against the empty tree.
    fn diff_trees(
        &self,
        old: Option<&Oid>,
        new: &Oid,
        opts: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError>;

    /// Index-to-workdir changes, sorted by [`DiffDelta::path`].
    ///
    /// Untracked files are reported as `Untracked` deltas when
    /// `workspace.include_untracked` is set.
    fn workspace_changes(
        &self,
        workspace: &WorkspaceOptions,
        diff: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError>;

    /// Files present in the working directory, filtered by pathspecs.
    ///
    /// An empty pathspec list selects everything. Ignored files and tracked
    /// files deleted from disk are excluded.
    fn workspace_files(
        &self,
        pathspecs: &[String],
        workspace: &WorkspaceOptions,
    ) -> Result<Vec<String>, BackendError>;

    /// All best common ancestors of two commits. Empty when histories are
    /// disjoint.
    fn merge_bases(&self, a: &Oid, b: &Oid) -> Result<Vec<Oid>, BackendError>;

    /// What HEAD points at.
    fn head(&self) -> Result<Head, BackendError>;

    /// Tip of a local branch.
    fn branch_commit(&self, branch: &BranchName) -> Result<Oid, BackendError>;

    /// In-progress operation, if any.
    fn state(&self) -> Result<RepoState, BackendError>;

    /// Whether the index has unresolved conflicts.
    fn has_conflicts(&self) -> Result<bool, BackendError>;

    /// Safely check out a commit and detach HEAD at it.
    fn checkout_commit(&self, commit: &Oid) -> Result<(), BackendError>;

    /// Safely check out a local branch and make it the active branch.
    fn checkout_branch(&self, branch: &BranchName) -> Result<(), BackendError>;

    /// Whether the repository has no commits.
    fn is_empty(&self) -> Result<bool, BackendError>;
}
