//! git::repository
//!
//! The backend-independent repository abstraction.
//!
//! # Overview
//!
//! [`Repository`] owns one working copy and a boxed [`Backend`]. Every
//! operation translates into one or more backend calls, normalizes what
//! comes back into the shared [`Commit`]/[`Blob`]/[`DiffDelta`] model, and
//! classifies failures into a [`VcsError`] before returning. The same
//! request gives the same answer whichever backend is plugged in.
//!
//! # Policies
//!
//! - Paths passed in are normalized with
//!   [`normalize_repo_path`](crate::core::paths::normalize_repo_path).
//! - Working-tree diffs always recurse into untracked directories.
//! - When two commits have several best common ancestors, the smallest id
//!   is the merge base.
//! - Identifiers starting with `-` never reach a backend.
//!
//! # Concurrency
//!
//! The repository is stateless between calls and holds no lock. Reads may
//! run concurrently, but `checkout` and `checkout_reference` rewrite the
//! working directory, so callers must not run them alongside anything else
//! (see [`WorkspaceLock`](crate::core::lock::WorkspaceLock)).
//!
//! # Example
//!
//! ```ignore
//! use vcscope::core::config::Config;
//! use vcscope::git::Repository;
//! use std::path::Path;
//!
//! let repo = Repository::open(Path::new("."), &Config::load(None)?)?;
//! let from = repo.get_commit("origin/main")?;
//! let to = repo.current_branch_commit()?;
//! for delta in repo.diff_merge_base(&from, &to)? {
//!     println!("{}", delta);
//! }
//! ```

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::Path;

use super::backend::{Backend, DiffOptions, Head, WorkspaceOptions};
use super::error::{BackendError, VcsError};
use super::factory::create_backend;
use crate::core::config::Config;
use crate::core::paths::{normalize_pathspecs, normalize_repo_path};
use crate::core::types::{Blob, BranchName, Commit, DiffDelta, Reference};

fn classified(context: String) -> impl FnOnce(BackendError) -> VcsError {
    move |err| VcsError::classify(context, err)
}

/// One working copy, reached through one backend.
pub struct Repository {
    backend: Box<dyn Backend>,
    diff_options: DiffOptions,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("backend", &self.backend.name())
            .field("path", &self.backend.workdir())
            .field("diff_options", &self.diff_options)
            .finish()
    }
}

impl Repository {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Open the repository containing `path` with the configured backend.
    ///
    /// # Errors
    ///
    /// `Internal` if no usable repository is found at `path`.
    pub fn open(path: &Path, config: &Config) -> Result<Self, VcsError> {
        let backend = create_backend(config.backend(), path, config)
            .map_err(classified(format!("open {}", path.display())))?;

        Ok(Self::with_backend(backend).with_diff_options(DiffOptions {
            detect_renames: config.detect_renames(),
        }))
    }

    /// Wrap an already opened backend.
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            diff_options: DiffOptions::default(),
        }
    }

    /// Replace the options used for every diff.
    pub fn with_diff_options(mut self, options: DiffOptions) -> Self {
        self.diff_options = options;
        self
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Root of the working copy.
    pub fn path(&self) -> &Path {
        self.backend.workdir()
    }

    /// The `.git` directory.
    pub fn git_dir(&self) -> &Path {
        self.backend.git_dir()
    }

    // =========================================================================
    // Commit & Reference Resolution
    // =========================================================================

    /// Resolve an identifier (full or abbreviated id, branch, tag, or any
    /// revision the backend accepts) to a commit whose tree is readable.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the identifier does not name a commit
    /// - `Internal` if the backend fails
    pub fn get_commit(&self, identifier: &str) -> Result<Commit, VcsError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || identifier.starts_with('-') {
            return Err(VcsError::NotFound {
                what: format!("revision '{}'", identifier),
            });
        }

        log::debug!("[{}] resolve {}", self.backend.name(), identifier);
        self.backend
            .resolve_commit(identifier)
            .map(Commit::new)
            .map_err(classified(format!("resolve '{}'", identifier)))
    }

    /// Tip of a local branch.
    ///
    /// # Errors
    ///
    /// `NotFound` if the branch does not exist (or cannot be a branch name).
    pub fn branch_commit(&self, name: &str) -> Result<Commit, VcsError> {
        let branch = BranchName::new(name).map_err(|_| VcsError::NotFound {
            what: format!("branch '{}'", name),
        })?;

        log::debug!("[{}] branch tip {}", self.backend.name(), branch);
        self.backend
            .branch_commit(&branch)
            .map(Commit::new)
            .map_err(classified(format!("branch '{}'", branch)))
    }

    fn head(&self) -> Result<Head, VcsError> {
        self.backend.head().map_err(classified("read HEAD".to_string()))
    }

    /// Name of the checked-out branch.
    ///
    /// On an unborn branch (no commits yet) this is the branch HEAD will
    /// create.
    ///
    /// # Errors
    ///
    /// `Unsafe` if HEAD is detached.
    pub fn current_branch(&self) -> Result<String, VcsError> {
        match self.head()? {
            Head::Branch { name, .. } => Ok(name.to_string()),
            Head::Unborn { name } => Ok(name),
            Head::Detached(_) => Err(VcsError::classify("current branch", BackendError::Detached)),
        }
    }

    /// Tip of the checked-out branch.
    ///
    /// # Errors
    ///
    /// - `Unsafe` if HEAD is detached
    /// - `NotFound` if the branch has no commits yet
    pub fn current_branch_commit(&self) -> Result<Commit, VcsError> {
        match self.head()? {
            Head::Branch { oid, .. } => Ok(Commit::new(oid)),
            Head::Unborn { name } => Err(VcsError::classify(
                "current branch commit",
                BackendError::Unborn { branch: name },
            )),
            Head::Detached(_) => Err(VcsError::classify(
                "current branch commit",
                BackendError::Detached,
            )),
        }
    }

    /// HEAD as a reference: the branch, or `HEAD` itself when detached.
    ///
    /// Pair with [`Repository::checkout_reference`] to restore HEAD after a
    /// [`Repository::checkout`].
    pub fn head_reference(&self) -> Result<Reference, VcsError> {
        match self.head()? {
            Head::Branch { name, .. } => Ok(Reference::branch(&name)),
            Head::Unborn { name } => Ok(Reference::new(format!("refs/heads/{}", name), Some(name))),
            Head::Detached(_) => Ok(Reference::detached_head()),
        }
    }

    /// The merge base of two commits.
    ///
    /// With several best common ancestors (criss-cross merges), the one
    /// with the smallest id is returned, whichever backend computed them.
    ///
    /// # Errors
    ///
    /// `Disjoint` if the commits share no history.
    pub fn merge_base(&self, a: &Commit, b: &Commit) -> Result<Commit, VcsError> {
        log::debug!("[{}] merge-base {} {}", self.backend.name(), a.short(), b.short());
        let bases = self
            .backend
            .merge_bases(a.id(), b.id())
            .map_err(classified(format!("merge base of {} and {}", a.short(), b.short())))?;

        if bases.len() > 1 {
            log::debug!("{} merge bases, taking the smallest id", bases.len());
        }

        bases
            .into_iter()
            .min()
            .map(Commit::new)
            .ok_or_else(|| VcsError::Disjoint {
                from: a.to_string(),
                to: b.to_string(),
            })
    }

    // =========================================================================
    // Diffing
    // =========================================================================

    /// Paths that differ between two commits.
    ///
    /// Works in either direction; `diff(b, a)` reports the same paths with
    /// the sides swapped. Order is whatever the backend produces.
    pub fn diff(&self, a: &Commit, b: &Commit) -> Result<Vec<DiffDelta>, VcsError> {
        log::debug!("[{}] diff {}..{}", self.backend.name(), a.short(), b.short());
        self.backend
            .diff_trees(Some(a.id()), b.id(), &self.diff_options)
            .map_err(classified(format!("diff {}..{}", a.short(), b.short())))
    }

    /// Changes on `to` since it diverged from `from`.
    ///
    /// Equivalent to `diff(merge_base(from, to), to)`.
    ///
    /// # Errors
    ///
    /// `Disjoint` if the commits share no history; never an empty result in
    /// that case.
    pub fn diff_merge_base(&self, from: &Commit, to: &Commit) -> Result<Vec<DiffDelta>, VcsError> {
        let base = self.merge_base(from, to)?;
        self.diff(&base, to)
    }

    /// Uncommitted changes: index against working directory, including
    /// untracked files.
    ///
    /// Untracked directories are expanded, so a new directory with two files
    /// yields two [`DeltaStatus::Untracked`](crate::core::types::DeltaStatus)
    /// deltas.
    /// Deltas are sorted by path.
    pub fn diff_workspace(&self) -> Result<Vec<DiffDelta>, VcsError> {
        let workspace = WorkspaceOptions {
            include_untracked: true,
            recurse_untracked_dirs: true,
        };
        log::debug!("[{}] diff workspace", self.backend.name());
        self.backend
            .workspace_changes(&workspace, &self.diff_options)
            .map_err(classified("diff workspace".to_string()))
    }

    /// What a single commit changed, relative to its first parent.
    ///
    /// A root commit is compared with the empty tree, so every path in it is
    /// added.
    pub fn changes(&self, commit: &Commit) -> Result<Vec<DiffDelta>, VcsError> {
        let context = format!("changes in {}", commit.short());
        let parents = self
            .backend
            .commit_parents(commit.id())
            .map_err(classified(context.clone()))?;

        log::debug!(
            "[{}] changes {} ({} parents)",
            self.backend.name(),
            commit.short(),
            parents.len()
        );
        self.backend
            .diff_trees(parents.first(), commit.id(), &self.diff_options)
            .map_err(classified(context))
    }

    // =========================================================================
    // Tree & Blob Access
    // =========================================================================

    /// Visit every file (and symlink) in the commit's tree.
    ///
    /// Submodules are skipped. Returning `ControlFlow::Break` from the
    /// callback ends the walk early; that is not an error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use std::ops::ControlFlow;
    ///
    /// let mut rust_files = 0;
    /// repo.walk_blobs(&commit, |blob| {
    ///     if blob.path().ends_with(".rs") {
    ///         rust_files += 1;
    ///     }
    ///     ControlFlow::Continue(())
    /// })?;
    /// ```
    pub fn walk_blobs<F>(&self, commit: &Commit, mut visit: F) -> Result<(), VcsError>
    where
        F: FnMut(&Blob) -> ControlFlow<()>,
    {
        log::debug!("[{}] walk {}", self.backend.name(), commit.short());
        let entries = self
            .backend
            .tree_entries(commit.id())
            .map_err(classified(format!("walk {}", commit.short())))?;

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            if !entry.kind.has_contents() {
                continue;
            }
            if !seen.insert(entry.path.clone()) {
                log::warn!("'{}' listed twice in {}, skipping", entry.path, commit.short());
                continue;
            }

            let blob = Blob::new(commit.id().clone(), entry.path, entry.id);
            if visit(&blob).is_break() {
                log::debug!("walk stopped at '{}'", blob.path());
                break;
            }
        }

        Ok(())
    }

    /// Contents of a blob reached through [`Repository::walk_blobs`].
    ///
    /// # Errors
    ///
    /// `NotFound` if the object is gone.
    pub fn blob_contents(&self, blob: &Blob) -> Result<Vec<u8>, VcsError> {
        self.backend
            .read_blob(blob.id())
            .map_err(classified(format!("read '{}'", blob.path())))
    }

    /// Contents of the file at `path` in the commit's tree.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not exist or names a directory.
    pub fn blob_contents_from_tree(&self, commit: &Commit, path: &str) -> Result<Vec<u8>, VcsError> {
        let entry = self.lookup(commit, path)?;
        if !entry.kind.has_contents() {
            return Err(VcsError::NotFound {
                what: format!("file '{}' in {} (not a file)", entry.path, commit.short()),
            });
        }

        self.backend
            .read_blob(&entry.id)
            .map_err(classified(format!("read '{}'", entry.path)))
    }

    /// Id of the tree entry at `path`, without reading its contents.
    ///
    /// Directories have ids too.
    pub fn entry_id(&self, commit: &Commit, path: &str) -> Result<String, VcsError> {
        Ok(self.lookup(commit, path)?.id.to_string())
    }

    fn lookup(
        &self,
        commit: &Commit,
        path: &str,
    ) -> Result<crate::core::types::TreeEntry, VcsError> {
        let normalized = normalize_repo_path(path).ok_or_else(|| VcsError::NotFound {
            what: format!("'{}' in {}", path, commit.short()),
        })?;

        log::debug!("[{}] entry {}:{}", self.backend.name(), commit.short(), normalized);
        self.backend
            .entry(commit.id(), &normalized)
            .map_err(classified(format!("look up '{}'", normalized)))
    }

    // =========================================================================
    // Workspace Safety & Discovery
    // =========================================================================

    /// Fail unless the working copy is in a state mutating operations may
    /// touch.
    ///
    /// # Errors
    ///
    /// `Unsafe` if a merge, rebase, cherry-pick, revert, bisect or mailbox
    /// apply is in progress, or the index has unresolved conflicts.
    pub fn ensure_safe_workspace(&self) -> Result<(), VcsError> {
        let state = self
            .backend
            .state()
            .map_err(classified("repository state".to_string()))?;
        if state.is_in_progress() {
            return Err(VcsError::in_progress(&state));
        }

        let conflicts = self
            .backend
            .has_conflicts()
            .map_err(classified("index conflicts".to_string()))?;
        if conflicts {
            return Err(VcsError::Unsafe {
                reason: "index has unresolved conflicts".to_string(),
            });
        }

        Ok(())
    }

    /// Files in the working directory as they exist now: tracked and
    /// untracked, not ignored, not deleted.
    ///
    /// `pathspecs` are glob filters; empty selects everything. The result is
    /// sorted and free of duplicates.
    pub fn find_all_files_in_workspace<S: AsRef<str>>(
        &self,
        pathspecs: &[S],
    ) -> Result<Vec<String>, VcsError> {
        let specs = normalize_pathspecs(pathspecs);
        log::debug!("[{}] workspace files {:?}", self.backend.name(), specs);

        let mut files = self
            .backend
            .workspace_files(&specs, &WorkspaceOptions::default())
            .map_err(classified("list workspace files".to_string()))?;

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Whether the repository has no commits yet.
    pub fn is_empty(&self) -> Result<bool, VcsError> {
        self.backend
            .is_empty()
            .map_err(classified("check for commits".to_string()))
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Check out a commit, detaching HEAD at it.
    ///
    /// The target is verified and the workspace checked before anything is
    /// touched. Local changes the checkout would overwrite abort it.
    ///
    /// Returns the resulting head reference (always `HEAD`); save
    /// [`Repository::head_reference`] beforehand to restore the previous one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the commit does not exist
    /// - `Unsafe` if the workspace is unsafe or local changes would be lost
    pub fn checkout(&self, commit: &Commit) -> Result<Reference, VcsError> {
        let context = format!("checkout {}", commit.short());
        self.backend
            .resolve_commit(commit.id().as_str())
            .map_err(classified(context.clone()))?;
        self.ensure_safe_workspace()?;

        log::debug!("[{}] checkout {}", self.backend.name(), commit);
        self.backend
            .checkout_commit(commit.id())
            .map_err(classified(context))?;

        Ok(Reference::detached_head())
    }

    /// Check out a reference.
    ///
    /// - a local branch (`refs/heads/*`, or a short name such as `main` that
    ///   names an existing local branch) becomes the active branch
    /// - `HEAD` leaves everything as is, after the safety check
    /// - anything else (a tag, a remote branch) is resolved and checked out
    ///   detached
    ///
    /// # Errors
    ///
    /// - `NotFound` if the reference does not resolve
    /// - `Unsafe` if the workspace is unsafe or local changes would be lost
    pub fn checkout_reference(&self, reference: &Reference) -> Result<(), VcsError> {
        let context = format!("checkout {}", reference);

        if reference.is_detached() {
            return self.ensure_safe_workspace();
        }

        let branch = if reference.is_branch() {
            let branch = reference.branch_name().ok_or_else(|| VcsError::NotFound {
                what: format!("branch '{}'", reference.name()),
            })?;
            self.backend
                .branch_commit(&branch)
                .map_err(classified(context.clone()))?;
            Some(branch)
        } else {
            self.local_branch(reference.name())
        };

        if let Some(branch) = branch {
            self.ensure_safe_workspace()?;

            log::debug!("[{}] checkout branch {}", self.backend.name(), branch);
            return self
                .backend
                .checkout_branch(&branch)
                .map_err(classified(context));
        }

        let commit = self.get_commit(reference.name())?;
        self.ensure_safe_workspace()?;

        log::debug!("[{}] checkout {} at {}", self.backend.name(), reference, commit.short());
        self.backend
            .checkout_commit(commit.id())
            .map_err(classified(context))
    }

    /// The local branch a short name refers to, if one exists.
    fn local_branch(&self, name: &str) -> Option<BranchName> {
        let branch = BranchName::new(name).ok()?;
        self.backend.branch_commit(&branch).ok().map(|_| branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DeltaStatus, EntryKind, Oid};
    use crate::git::backend::RepoState;
    use crate::git::error::ErrorClass;
    use crate::git::mock::{FailOn, Failure, MockBackend, MockOperation};

    /// C1: a.txt; C2: a.txt modified, b/c.txt added. `main` at C2.
    fn scenario() -> (MockBackend, Repository, Commit, Commit) {
        let mock = MockBackend::new();
        let c1 = mock.add_commit(&[], &[("a.txt", "one")]);
        let c2 = mock.add_commit(&[c1.clone()], &[("a.txt", "two"), ("b/c.txt", "new")]);
        mock.set_branch("main", &c2);

        let repo = Repository::with_backend(Box::new(mock.clone()));
        (mock, repo, Commit::new(c1), Commit::new(c2))
    }

    fn sorted_paths(deltas: &[DiffDelta]) -> Vec<String> {
        let mut paths: Vec<String> = deltas.iter().map(|d| d.path().to_string()).collect();
        paths.sort();
        paths
    }

    mod resolution {
        use super::*;

        #[test]
        fn get_commit_by_id_and_branch() {
            let (_, repo, c1, c2) = scenario();
            assert_eq!(repo.get_commit(c1.id().as_str()).unwrap(), c1);
            assert_eq!(repo.get_commit("main").unwrap(), c2);
            assert_eq!(repo.get_commit("HEAD").unwrap(), c2);
        }

        #[test]
        fn unknown_identifier_is_not_found() {
            let (_, repo, _, _) = scenario();
            let err = repo.get_commit("deadbeef").unwrap_err();
            assert_eq!(err.class(), ErrorClass::NotFound);
        }

        #[test]
        fn option_like_identifier_never_reaches_backend() {
            let (mock, repo, _, _) = scenario();
            let err = repo.get_commit("--all").unwrap_err();
            assert_eq!(err.class(), ErrorClass::NotFound);
            assert!(mock.operations().is_empty());
        }

        #[test]
        fn backend_failure_is_internal() {
            let (mock, repo, _, _) = scenario();
            let _mock = mock.fail_on(FailOn::ResolveCommit(Failure::Command("corrupt".into())));
            let err = repo.get_commit("main").unwrap_err();
            assert_eq!(err.class(), ErrorClass::Internal);
        }

        #[test]
        fn branch_commit() {
            let (_, repo, _, c2) = scenario();
            assert_eq!(repo.branch_commit("main").unwrap(), c2);
            assert!(repo.branch_commit("nope").unwrap_err().is_not_found());
            assert!(repo.branch_commit("bad..name").unwrap_err().is_not_found());
        }

        #[test]
        fn current_branch_on_branch() {
            let (_, repo, _, c2) = scenario();
            assert_eq!(repo.current_branch().unwrap(), "main");
            assert_eq!(repo.current_branch_commit().unwrap(), c2);
            assert_eq!(repo.head_reference().unwrap().name(), "refs/heads/main");
        }

        #[test]
        fn detached_head_is_unsafe() {
            let (mock, repo, c1, _) = scenario();
            mock.set_head(Head::Detached(c1.id().clone()));

            assert_eq!(repo.current_branch().unwrap_err().class(), ErrorClass::Unsafe);
            assert_eq!(
                repo.current_branch_commit().unwrap_err().class(),
                ErrorClass::Unsafe
            );
            assert!(repo.head_reference().unwrap().is_detached());
        }

        #[test]
        fn unborn_branch() {
            let mock = MockBackend::new();
            let repo = Repository::with_backend(Box::new(mock));

            assert_eq!(repo.current_branch().unwrap(), "main");
            assert!(repo.current_branch_commit().unwrap_err().is_not_found());
            assert!(repo.is_empty().unwrap());
            assert!(repo.get_commit("HEAD").unwrap_err().is_not_found());
        }
    }

    mod diffing {
        use super::*;

        #[test]
        fn scenario_diff() {
            let (_, repo, c1, c2) = scenario();
            let deltas = repo.diff(&c1, &c2).unwrap();

            assert_eq!(deltas.len(), 2);
            assert!(deltas.contains(&DiffDelta::modified("a.txt")));
            assert!(deltas.contains(&DiffDelta::added("b/c.txt")));
        }

        #[test]
        fn diff_is_symmetric_in_paths() {
            let (_, repo, c1, c2) = scenario();
            let forward = repo.diff(&c1, &c2).unwrap();
            let backward = repo.diff(&c2, &c1).unwrap();

            assert_eq!(sorted_paths(&forward), sorted_paths(&backward));
            assert!(backward.contains(&DiffDelta::deleted("b/c.txt")));
        }

        #[test]
        fn diff_uses_configured_options() {
            let (mock, repo, c1, c2) = scenario();
            let repo = repo.with_diff_options(DiffOptions {
                detect_renames: true,
            });
            repo.diff(&c1, &c2).unwrap();

            assert!(mock.operations().contains(&MockOperation::DiffTrees {
                old: Some(c1.id().clone()),
                new: c2.id().clone(),
                detect_renames: true,
            }));
        }

        #[test]
        fn changes_against_first_parent() {
            let (_, repo, c1, c2) = scenario();
            assert_eq!(repo.changes(&c2).unwrap(), repo.diff(&c1, &c2).unwrap());
        }

        #[test]
        fn root_commit_changes_add_everything() {
            let (_, repo, c1, _) = scenario();
            assert_eq!(repo.changes(&c1).unwrap(), vec![DiffDelta::added("a.txt")]);
        }

        #[test]
        fn diff_failure_is_internal() {
            let (mock, repo, c1, c2) = scenario();
            let _mock = mock.fail_on(FailOn::DiffTrees(Failure::Command("boom".into())));
            assert_eq!(repo.diff(&c1, &c2).unwrap_err().class(), ErrorClass::Internal);
        }
    }

    mod merge_base {
        use super::*;

        #[test]
        fn diff_merge_base_matches_diff_from_base() {
            let mock = MockBackend::new();
            let base = mock.add_commit(&[], &[("f", "0")]);
            let left = mock.add_commit(&[base.clone()], &[("f", "0"), ("left", "l")]);
            let right = mock.add_commit(&[base.clone()], &[("f", "1")]);
            let repo = Repository::with_backend(Box::new(mock));

            let (left, right) = (Commit::new(left), Commit::new(right));
            let merge_base = repo.merge_base(&left, &right).unwrap();
            assert_eq!(merge_base.id(), &base);
            assert_eq!(
                repo.diff_merge_base(&left, &right).unwrap(),
                repo.diff(&merge_base, &right).unwrap()
            );
            assert_eq!(
                repo.diff_merge_base(&left, &right).unwrap(),
                vec![DiffDelta::modified("f")]
            );
        }

        #[test]
        fn disjoint_histories() {
            let mock = MockBackend::new();
            let a = Commit::new(mock.add_commit(&[], &[("a", "a")]));
            let b = Commit::new(mock.add_commit(&[], &[("b", "b")]));
            let repo = Repository::with_backend(Box::new(mock));

            let err = repo.diff_merge_base(&a, &b).unwrap_err();
            assert_eq!(err.class(), ErrorClass::Disjoint);
        }

        #[test]
        fn criss_cross_picks_smallest_id() {
            let mock = MockBackend::new();
            let root = mock.add_commit(&[], &[("f", "0")]);
            let a = mock.add_commit(&[root.clone()], &[("f", "a")]);
            let b = mock.add_commit(&[root], &[("f", "b")]);
            let x = mock.add_commit(&[a.clone(), b.clone()], &[("f", "x")]);
            let y = mock.add_commit(&[b.clone(), a.clone()], &[("f", "y")]);
            let repo = Repository::with_backend(Box::new(mock));

            let smallest = a.clone().min(b);
            let base = repo.merge_base(&Commit::new(x), &Commit::new(y)).unwrap();
            assert_eq!(base.id(), &smallest);
        }
    }

    mod workspace {
        use super::*;

        #[test]
        fn diff_workspace_always_recurses() {
            let (mock, repo, _, _) = scenario();
            mock.set_workspace(
                vec![
                    DiffDelta::modified("a.txt"),
                    DiffDelta::untracked("new/one.txt"),
                    DiffDelta::untracked("new/two.txt"),
                ],
                Vec::new(),
            );

            let deltas = repo.diff_workspace().unwrap();
            let untracked: Vec<_> = deltas
                .iter()
                .filter(|d| d.status() == DeltaStatus::Untracked)
                .collect();
            assert_eq!(untracked.len(), 2);

            assert!(mock.operations().contains(&MockOperation::WorkspaceChanges {
                options: WorkspaceOptions {
                    include_untracked: true,
                    recurse_untracked_dirs: true,
                },
                detect_renames: false,
            }));
        }

        #[test]
        fn diff_workspace_sorted_by_path() {
            let (mock, repo, _, _) = scenario();
            mock.set_workspace(
                vec![
                    DiffDelta::untracked("z/new.txt"),
                    DiffDelta::modified("a.txt"),
                    DiffDelta::deleted("m.txt"),
                ],
                Vec::new(),
            );

            let paths: Vec<_> = repo
                .diff_workspace()
                .unwrap()
                .iter()
                .map(|d| d.path().to_string())
                .collect();
            assert_eq!(paths, ["a.txt", "m.txt", "z/new.txt"]);
        }

        #[test]
        fn files_sorted_and_deduplicated() {
            let (mock, repo, _, _) = scenario();
            mock.set_workspace(
                Vec::new(),
                vec!["z.txt".into(), "a.txt".into(), "m/x.rs".into(), "a.txt".into()],
            );

            let files = repo.find_all_files_in_workspace::<&str>(&[]).unwrap();
            assert_eq!(files, ["a.txt", "m/x.rs", "z.txt"]);
        }

        #[test]
        fn pathspecs_normalized_before_backend() {
            let (mock, repo, _, _) = scenario();
            mock.set_workspace(Vec::new(), vec!["m/x.rs".into(), "a.txt".into()]);

            let files = repo.find_all_files_in_workspace(&["./m/", "."]).unwrap();
            assert_eq!(files, ["m/x.rs"]);
            assert!(mock.operations().contains(&MockOperation::WorkspaceFiles {
                pathspecs: vec!["m".to_string()],
            }));
        }

        #[test]
        fn safe_when_clean() {
            let (_, repo, _, _) = scenario();
            assert!(repo.ensure_safe_workspace().is_ok());
        }

        #[test]
        fn unsafe_during_operations() {
            let (mock, repo, _, _) = scenario();
            for state in [
                RepoState::Merge,
                RepoState::Rebase {
                    current: Some(1),
                    total: Some(3),
                },
                RepoState::CherryPick,
                RepoState::Revert,
                RepoState::Bisect,
                RepoState::ApplyMailbox,
            ] {
                mock.set_state(state.clone());
                let err = repo.ensure_safe_workspace().unwrap_err();
                assert_eq!(err.class(), ErrorClass::Unsafe, "{state}");
            }
        }

        #[test]
        fn unsafe_with_conflicts() {
            let (mock, repo, _, _) = scenario();
            mock.set_conflicts(true);
            let err = repo.ensure_safe_workspace().unwrap_err();
            assert_eq!(err.class(), ErrorClass::Unsafe);
            assert!(err.to_string().contains("conflicts"));
        }
    }

    mod blobs {
        use super::*;

        #[test]
        fn walk_visits_every_file_once() {
            let (_, repo, _, c2) = scenario();
            let mut seen = Vec::new();
            repo.walk_blobs(&c2, |blob| {
                assert_eq!(blob.commit(), c2.id());
                seen.push(blob.path().to_string());
                ControlFlow::Continue(())
            })
            .unwrap();

            assert_eq!(seen, ["a.txt", "b/c.txt"]);
        }

        #[test]
        fn walk_stops_on_break() {
            let (_, repo, _, c2) = scenario();
            let mut visits = 0;
            repo.walk_blobs(&c2, |_| {
                visits += 1;
                ControlFlow::Break(())
            })
            .unwrap();
            assert_eq!(visits, 1);
        }

        #[test]
        fn walk_skips_submodules_keeps_links() {
            let (mock, repo, _, c2) = scenario();
            mock.add_entry(c2.id(), "vendor/lib", EntryKind::Submodule);
            mock.add_entry(c2.id(), "link", EntryKind::Link);

            let mut seen = Vec::new();
            repo.walk_blobs(&c2, |blob| {
                seen.push(blob.path().to_string());
                ControlFlow::Continue(())
            })
            .unwrap();
            assert_eq!(seen, ["a.txt", "b/c.txt", "link"]);
        }

        #[test]
        fn blob_contents_round_trip() {
            let (_, repo, _, c2) = scenario();
            let mut contents = Vec::new();
            repo.walk_blobs(&c2, |blob| {
                contents.push(repo.blob_contents(blob).unwrap());
                ControlFlow::Continue(())
            })
            .unwrap();
            assert_eq!(contents, [b"two".to_vec(), b"new".to_vec()]);
        }

        #[test]
        fn missing_blob_is_not_found() {
            let (_, repo, _, c2) = scenario();
            let ghost = Blob::new(c2.id().clone(), "ghost", Oid::new("f".repeat(40)).unwrap());
            assert!(repo.blob_contents(&ghost).unwrap_err().is_not_found());
        }

        #[test]
        fn contents_from_tree() {
            let (_, repo, c1, c2) = scenario();
            assert_eq!(repo.blob_contents_from_tree(&c1, "a.txt").unwrap(), b"one");
            assert_eq!(repo.blob_contents_from_tree(&c2, "./b/c.txt").unwrap(), b"new");
        }

        #[test]
        fn contents_from_tree_errors() {
            let (_, repo, c1, c2) = scenario();
            assert!(repo
                .blob_contents_from_tree(&c1, "b/c.txt")
                .unwrap_err()
                .is_not_found());

            let err = repo.blob_contents_from_tree(&c2, "b").unwrap_err();
            assert!(err.is_not_found());
            assert!(err.to_string().contains("not a file"));

            assert!(repo
                .blob_contents_from_tree(&c2, "../escape")
                .unwrap_err()
                .is_not_found());
        }

        #[test]
        fn entry_id_matches_walk() {
            let (_, repo, _, c2) = scenario();
            let mut walked = None;
            repo.walk_blobs(&c2, |blob| {
                if blob.path() == "b/c.txt" {
                    walked = Some(blob.id().to_string());
                }
                ControlFlow::Continue(())
            })
            .unwrap();

            assert_eq!(Some(repo.entry_id(&c2, "b/c.txt").unwrap()), walked);
            assert!(repo.entry_id(&c2, "b").is_ok());
            assert!(repo.entry_id(&c2, "nope").unwrap_err().is_not_found());
        }
    }

    mod checkout {
        use super::*;

        #[test]
        fn checkout_detaches_and_returns_head() {
            let (mock, repo, c1, _) = scenario();
            let previous = repo.head_reference().unwrap();

            let head = repo.checkout(&c1).unwrap();
            assert!(head.is_detached());
            assert_eq!(mock.current_head(), Head::Detached(c1.id().clone()));

            repo.checkout_reference(&previous).unwrap();
            assert_eq!(repo.current_branch().unwrap(), "main");
        }

        #[test]
        fn checkout_refused_when_unsafe() {
            let (mock, repo, c1, _) = scenario();
            mock.set_state(RepoState::Merge);

            let err = repo.checkout(&c1).unwrap_err();
            assert_eq!(err.class(), ErrorClass::Unsafe);
            assert!(!mock
                .operations()
                .iter()
                .any(|op| matches!(op, MockOperation::CheckoutCommit { .. })));
        }

        #[test]
        fn checkout_of_missing_commit_is_not_found() {
            let (mock, repo, _, _) = scenario();
            let ghost = Commit::new(Oid::new("e".repeat(40)).unwrap());

            assert!(repo.checkout(&ghost).unwrap_err().is_not_found());
            assert!(!mock
                .operations()
                .iter()
                .any(|op| matches!(op, MockOperation::CheckoutCommit { .. })));
        }

        #[test]
        fn overwrite_conflict_is_unsafe() {
            let (mock, repo, c1, _) = scenario();
            let _mock = mock.fail_on(FailOn::Checkout(Failure::Conflict("a.txt".into())));
            assert_eq!(repo.checkout(&c1).unwrap_err().class(), ErrorClass::Unsafe);
        }

        #[test]
        fn head_reference_is_a_safety_checked_no_op() {
            let (mock, repo, _, _) = scenario();
            repo.checkout_reference(&Reference::detached_head()).unwrap();
            assert!(!mock.operations().iter().any(|op| matches!(
                op,
                MockOperation::CheckoutCommit { .. } | MockOperation::CheckoutBranch { .. }
            )));

            mock.set_conflicts(true);
            assert_eq!(
                repo.checkout_reference(&Reference::detached_head())
                    .unwrap_err()
                    .class(),
                ErrorClass::Unsafe
            );
        }

        #[test]
        fn tag_reference_checks_out_detached() {
            let (mock, repo, c1, _) = scenario();
            mock.add_alias("refs/tags/v1", c1.id());

            repo.checkout_reference(&Reference::new("refs/tags/v1", Some("v1".into())))
                .unwrap();
            assert_eq!(mock.current_head(), Head::Detached(c1.id().clone()));
        }

        #[test]
        fn short_branch_name_switches_branch() {
            let (mock, repo, c1, _) = scenario();
            mock.set_branch("feature", c1.id());

            repo.checkout_reference(&Reference::new("feature", None)).unwrap();
            assert_eq!(repo.current_branch().unwrap(), "feature");
            assert!(mock.operations().iter().any(|op| matches!(
                op,
                MockOperation::CheckoutBranch { .. }
            )));
        }

        #[test]
        fn short_name_without_branch_checks_out_detached() {
            let (mock, repo, c1, _) = scenario();
            mock.add_alias("v1", c1.id());

            repo.checkout_reference(&Reference::new("v1", None)).unwrap();
            assert_eq!(mock.current_head(), Head::Detached(c1.id().clone()));
        }

        #[test]
        fn missing_branch_reference_is_not_found() {
            let (_, repo, _, _) = scenario();
            let reference = Reference::branch(&BranchName::new("gone").unwrap());
            assert!(repo.checkout_reference(&reference).unwrap_err().is_not_found());
        }
    }
}
