//! git::mock
//!
//! In-memory backend for deterministic testing.
//!
//! # Design
//!
//! The mock backend holds a tiny commit graph (commits with parents and a
//! flat path -> blob map) plus scripted workspace state. Diffs and merge bases
//! are computed from that graph, so tests of [`Repository`](super::Repository)
//! exercise real logic without touching disk. Failures can be injected per
//! operation, and every call is recorded for verification.
//!
//! Ids are generated sequentially; blob ids are interned by content, so two
//! commits holding the same file contents share the blob id.
//!
//! # Example
//!
//! ```
//! use vcscope::git::mock::MockBackend;
//! use vcscope::git::Repository;
//!
//! let mock = MockBackend::new();
//! let c1 = mock.add_commit(&[], &[("a.txt", "one")]);
//! let c2 = mock.add_commit(&[c1.clone()], &[("a.txt", "two"), ("b/c.txt", "new")]);
//! mock.set_branch("main", &c2);
//!
//! let repo = Repository::with_backend(Box::new(mock.clone()));
//! let a = repo.get_commit(c1.as_str()).unwrap();
//! let b = repo.get_commit("main").unwrap();
//! assert_eq!(repo.diff(&a, &b).unwrap().len(), 2);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::{Backend, DiffOptions, Head, RepoState, WorkspaceOptions};
use super::error::BackendError;
use crate::core::types::{BranchName, DeltaStatus, DiffDelta, EntryKind, Oid, TreeEntry};

/// Mock backend for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state,
/// so a test can keep a handle after boxing one into a `Repository`.
#[derive(Debug, Clone)]
pub struct MockBackend {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    tree: BTreeMap<String, (Oid, EntryKind)>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockInner {
    next_id: u64,
    commits: HashMap<Oid, MockCommit>,
    blobs: HashMap<Oid, Vec<u8>>,
    blob_ids: HashMap<Vec<u8>, Oid>,
    branches: BTreeMap<String, Oid>,
    aliases: HashMap<String, Oid>,
    head: Head,
    state: RepoState,
    conflicts: bool,
    workspace_changes: Vec<DiffDelta>,
    workspace_files: Vec<String>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Error to inject.
#[derive(Debug, Clone)]
pub enum Failure {
    /// `BackendError::NotFound` with the given subject
    NotFound(String),
    /// `BackendError::CheckoutConflict`
    Conflict(String),
    /// `BackendError::Locked`
    Locked,
    /// `BackendError::CommandFailed` with the given stderr
    Command(String),
}

impl Failure {
    fn to_error(&self, op: &str) -> BackendError {
        match self {
            Failure::NotFound(what) => BackendError::not_found(what.clone()),
            Failure::Conflict(message) => BackendError::CheckoutConflict {
                message: message.clone(),
            },
            Failure::Locked => BackendError::Locked {
                message: "index.lock exists".to_string(),
            },
            Failure::Command(stderr) => BackendError::CommandFailed {
                args: op.to_string(),
                status: "exit 128".to_string(),
                stderr: stderr.clone(),
            },
        }
    }
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail resolve_commit.
    ResolveCommit(Failure),
    /// Fail tree_entries.
    TreeEntries(Failure),
    /// Fail read_blob.
    ReadBlob(Failure),
    /// Fail diff_trees.
    DiffTrees(Failure),
    /// Fail workspace_changes.
    WorkspaceChanges(Failure),
    /// Fail merge_bases.
    MergeBases(Failure),
    /// Fail checkout_commit and checkout_branch.
    Checkout(Failure),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ResolveCommit { spec: String },
    CommitParents { commit: Oid },
    TreeEntries { commit: Oid },
    Entry { commit: Oid, path: String },
    ReadBlob { blob: Oid },
    DiffTrees { old: Option<Oid>, new: Oid, detect_renames: bool },
    WorkspaceChanges { options: WorkspaceOptions, detect_renames: bool },
    WorkspaceFiles { pathspecs: Vec<String> },
    MergeBases { a: Oid, b: Oid },
    Head,
    BranchCommit { branch: String },
    State,
    HasConflicts,
    CheckoutCommit { commit: Oid },
    CheckoutBranch { branch: String },
    IsEmpty,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty repository with an unborn `main`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                next_id: 1,
                commits: HashMap::new(),
                blobs: HashMap::new(),
                blob_ids: HashMap::new(),
                branches: BTreeMap::new(),
                aliases: HashMap::new(),
                head: Head::Unborn {
                    name: "main".to_string(),
                },
                state: RepoState::Clean,
                conflicts: false,
                workspace_changes: Vec::new(),
                workspace_files: Vec::new(),
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    fn inner(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a commit holding exactly `files` (path, contents).
    ///
    /// Paths are taken as given; use repository-relative `/` paths.
    pub fn add_commit(&self, parents: &[Oid], files: &[(&str, &str)]) -> Oid {
        let mut inner = self.inner();
        let mut tree = BTreeMap::new();
        for (path, contents) in files {
            let id = inner.intern_blob(contents.as_bytes());
            tree.insert(path.to_string(), (id, EntryKind::Blob));
        }
        let oid = inner.next_oid();
        inner.commits.insert(
            oid.clone(),
            MockCommit {
                parents: parents.to_vec(),
                tree,
            },
        );
        oid
    }

    /// Add a tree entry of a non-file kind (link, submodule) to a commit.
    pub fn add_entry(&self, commit: &Oid, path: &str, kind: EntryKind) {
        let mut inner = self.inner();
        let id = inner.intern_blob(path.as_bytes());
        if let Some(c) = inner.commits.get_mut(commit) {
            c.tree.insert(path.to_string(), (id, kind));
        }
    }

    /// Point a local branch at a commit. If HEAD is on (or unborn at) that
    /// branch, HEAD follows.
    pub fn set_branch(&self, name: &str, oid: &Oid) {
        let mut inner = self.inner();
        inner.branches.insert(name.to_string(), oid.clone());
        let follows = match &inner.head {
            Head::Branch { name: current, .. } => current.as_str() == name,
            Head::Unborn { name: current } => current == name,
            Head::Detached(_) => false,
        };
        if follows {
            if let Ok(branch) = BranchName::new(name) {
                inner.head = Head::Branch {
                    name: branch,
                    oid: oid.clone(),
                };
            }
        }
    }

    /// Make `rev` resolve to `oid` (tags, `HEAD~1`, abbreviations).
    pub fn add_alias(&self, rev: &str, oid: &Oid) {
        self.inner().aliases.insert(rev.to_string(), oid.clone());
    }

    /// Set HEAD directly.
    pub fn set_head(&self, head: Head) {
        self.inner().head = head;
    }

    /// Set the in-progress operation.
    pub fn set_state(&self, state: RepoState) {
        self.inner().state = state;
    }

    /// Set whether the index has conflicts.
    pub fn set_conflicts(&self, conflicts: bool) {
        self.inner().conflicts = conflicts;
    }

    /// Script the working-tree answers.
    pub fn set_workspace(&self, changes: Vec<DiffDelta>, files: Vec<String>) {
        let mut inner = self.inner();
        inner.workspace_changes = changes;
        inner.workspace_files = files;
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use vcscope::git::mock::{FailOn, Failure, MockBackend};
    ///
    /// let mock = MockBackend::new().fail_on(FailOn::Checkout(Failure::Conflict("a.txt".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.inner().operations.clear();
    }

    /// Current HEAD, as the mock sees it.
    pub fn current_head(&self) -> Head {
        self.inner().head.clone()
    }

    /// Record the operation and return the injected failure, if any.
    fn begin(&self, op: MockOperation) -> Result<MutexGuard<'_, MockInner>, BackendError> {
        let mut inner = self.inner();
        let failure = match (&inner.fail_on, &op) {
            (Some(FailOn::ResolveCommit(f)), MockOperation::ResolveCommit { .. }) => Some(f.to_error("rev-parse")),
            (Some(FailOn::TreeEntries(f)), MockOperation::TreeEntries { .. }) => Some(f.to_error("ls-tree")),
            (Some(FailOn::ReadBlob(f)), MockOperation::ReadBlob { .. }) => Some(f.to_error("cat-file")),
            (Some(FailOn::DiffTrees(f)), MockOperation::DiffTrees { .. }) => Some(f.to_error("diff-tree")),
            (Some(FailOn::WorkspaceChanges(f)), MockOperation::WorkspaceChanges { .. }) => Some(f.to_error("diff")),
            (Some(FailOn::MergeBases(f)), MockOperation::MergeBases { .. }) => Some(f.to_error("merge-base")),
            (
                Some(FailOn::Checkout(f)),
                MockOperation::CheckoutCommit { .. } | MockOperation::CheckoutBranch { .. },
            ) => Some(f.to_error("checkout")),
            _ => None,
        };
        inner.operations.push(op);
        match failure {
            Some(err) => Err(err),
            None => Ok(inner),
        }
    }
}

impl MockInner {
    fn next_oid(&mut self) -> Oid {
        let id = self.next_id;
        self.next_id += 1;
        // 40 hex digits, always a valid id
        Oid::new(format!("{:040x}", id)).unwrap_or_else(|e| unreachable!("{e}"))
    }

    fn intern_blob(&mut self, contents: &[u8]) -> Oid {
        if let Some(id) = self.blob_ids.get(contents) {
            return id.clone();
        }
        let id = self.next_oid();
        self.blob_ids.insert(contents.to_vec(), id.clone());
        self.blobs.insert(id.clone(), contents.to_vec());
        id
    }

    fn commit(&self, oid: &Oid) -> Result<&MockCommit, BackendError> {
        self.commits
            .get(oid)
            .ok_or_else(|| BackendError::not_found(format!("commit {}", oid)))
    }

    fn resolve(&self, spec: &str) -> Option<Oid> {
        if let Some(oid) = self.aliases.get(spec) {
            return Some(oid.clone());
        }
        if spec == "HEAD" {
            return self.head.oid().cloned();
        }
        if let Some(oid) = self.branches.get(spec.strip_prefix("refs/heads/").unwrap_or(spec)) {
            return Some(oid.clone());
        }
        if spec.len() >= 4 && spec.chars().all(|c| c.is_ascii_hexdigit()) {
            let spec = spec.to_ascii_lowercase();
            let mut matches = self.commits.keys().filter(|oid| oid.as_str().starts_with(&spec));
            if let (Some(oid), None) = (matches.next(), matches.next()) {
                return Some(oid.clone());
            }
        }
        None
    }

    /// A commit and everything reachable from it.
    fn ancestors(&self, oid: &Oid) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([oid.clone()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&next) {
                queue.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn workdir(&self) -> &Path {
        Path::new("/mock")
    }

    fn git_dir(&self) -> &Path {
        Path::new("/mock/.git")
    }

    fn resolve_commit(&self, spec: &str) -> Result<Oid, BackendError> {
        let inner = self.begin(MockOperation::ResolveCommit {
            spec: spec.to_string(),
        })?;
        inner
            .resolve(spec)
            .filter(|oid| inner.commits.contains_key(oid))
            .ok_or_else(|| BackendError::not_found(format!("revision '{}'", spec)))
    }

    fn commit_parents(&self, commit: &Oid) -> Result<Vec<Oid>, BackendError> {
        let inner = self.begin(MockOperation::CommitParents {
            commit: commit.clone(),
        })?;
        Ok(inner.commit(commit)?.parents.clone())
    }

    fn tree_entries(&self, commit: &Oid) -> Result<Vec<TreeEntry>, BackendError> {
        let inner = self.begin(MockOperation::TreeEntries {
            commit: commit.clone(),
        })?;
        Ok(inner
            .commit(commit)?
            .tree
            .iter()
            .map(|(path, (id, kind))| TreeEntry {
                path: path.clone(),
                id: id.clone(),
                kind: *kind,
            })
            .collect())
    }

    fn entry(&self, commit: &Oid, path: &str) -> Result<TreeEntry, BackendError> {
        let inner = self.begin(MockOperation::Entry {
            commit: commit.clone(),
            path: path.to_string(),
        })?;
        let tree = &inner.commit(commit)?.tree;

        if let Some((id, kind)) = tree.get(path) {
            return Ok(TreeEntry {
                path: path.to_string(),
                id: id.clone(),
                kind: *kind,
            });
        }

        // Directories are implied by the paths beneath them
        let prefix = format!("{}/", path);
        if tree.keys().any(|p| p.starts_with(&prefix)) {
            let mut inner = inner;
            let id = inner.intern_blob(prefix.as_bytes());
            return Ok(TreeEntry {
                path: path.to_string(),
                id,
                kind: EntryKind::Tree,
            });
        }

        Err(BackendError::not_found(format!("'{}' in {}", path, commit.short(7))))
    }

    fn read_blob(&self, blob: &Oid) -> Result<Vec<u8>, BackendError> {
        let inner = self.begin(MockOperation::ReadBlob { blob: blob.clone() })?;
        inner
            .blobs
            .get(blob)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("blob {}", blob)))
    }

    fn diff_trees(
        &self,
        old: Option<&Oid>,
        new: &Oid,
        opts: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        let inner = self.begin(MockOperation::DiffTrees {
            old: old.cloned(),
            new: new.clone(),
            detect_renames: opts.detect_renames,
        })?;

        let empty = BTreeMap::new();
        let old_tree = match old {
            Some(oid) => &inner.commit(oid)?.tree,
            None => &empty,
        };
        let new_tree = &inner.commit(new)?.tree;

        let paths: BTreeSet<&String> = old_tree.keys().chain(new_tree.keys()).collect();
        let mut deltas = Vec::new();
        for path in paths {
            match (old_tree.get(path), new_tree.get(path)) {
                (None, Some(_)) => deltas.push(DiffDelta::added(path.as_str())),
                (Some(_), None) => deltas.push(DiffDelta::deleted(path.as_str())),
                (Some((_, old_kind)), Some((_, new_kind))) if old_kind != new_kind => {
                    deltas.push(DiffDelta::type_changed(path.as_str()))
                }
                (Some((old_id, _)), Some((new_id, _))) if old_id != new_id => {
                    deltas.push(DiffDelta::modified(path.as_str()))
                }
                _ => {}
            }
        }
        Ok(deltas)
    }

    fn workspace_changes(
        &self,
        workspace: &WorkspaceOptions,
        diff: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        let inner = self.begin(MockOperation::WorkspaceChanges {
            options: *workspace,
            detect_renames: diff.detect_renames,
        })?;
        let mut deltas: Vec<DiffDelta> = inner
            .workspace_changes
            .iter()
            .filter(|d| workspace.include_untracked || d.status() != DeltaStatus::Untracked)
            .cloned()
            .collect();
        deltas.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(deltas)
    }

    fn workspace_files(
        &self,
        pathspecs: &[String],
        _workspace: &WorkspaceOptions,
    ) -> Result<Vec<String>, BackendError> {
        let inner = self.begin(MockOperation::WorkspaceFiles {
            pathspecs: pathspecs.to_vec(),
        })?;
        // Prefix matching only; globs are the real backends' business
        Ok(inner
            .workspace_files
            .iter()
            .filter(|file| {
                pathspecs.is_empty()
                    || pathspecs
                        .iter()
                        .any(|spec| *file == spec || file.starts_with(&format!("{}/", spec)))
            })
            .cloned()
            .collect())
    }

    fn merge_bases(&self, a: &Oid, b: &Oid) -> Result<Vec<Oid>, BackendError> {
        let inner = self.begin(MockOperation::MergeBases {
            a: a.clone(),
            b: b.clone(),
        })?;
        inner.commit(a)?;
        inner.commit(b)?;

        let from_a = inner.ancestors(a);
        let from_b = inner.ancestors(b);
        let common: HashSet<Oid> = from_a.intersection(&from_b).cloned().collect();

        // Best common ancestors: not reachable from another common ancestor
        let mut bases: Vec<Oid> = common
            .iter()
            .filter(|candidate| {
                !common
                    .iter()
                    .any(|other| other != *candidate && inner.ancestors(other).contains(*candidate))
            })
            .cloned()
            .collect();
        bases.sort();
        Ok(bases)
    }

    fn head(&self) -> Result<Head, BackendError> {
        let inner = self.begin(MockOperation::Head)?;
        Ok(inner.head.clone())
    }

    fn branch_commit(&self, branch: &BranchName) -> Result<Oid, BackendError> {
        let inner = self.begin(MockOperation::BranchCommit {
            branch: branch.to_string(),
        })?;
        inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("branch '{}'", branch)))
    }

    fn state(&self) -> Result<RepoState, BackendError> {
        let inner = self.begin(MockOperation::State)?;
        Ok(inner.state.clone())
    }

    fn has_conflicts(&self) -> Result<bool, BackendError> {
        let inner = self.begin(MockOperation::HasConflicts)?;
        Ok(inner.conflicts)
    }

    fn checkout_commit(&self, commit: &Oid) -> Result<(), BackendError> {
        let mut inner = self.begin(MockOperation::CheckoutCommit {
            commit: commit.clone(),
        })?;
        inner.commit(commit)?;
        inner.head = Head::Detached(commit.clone());
        Ok(())
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), BackendError> {
        let mut inner = self.begin(MockOperation::CheckoutBranch {
            branch: branch.to_string(),
        })?;
        let oid = inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("branch '{}'", branch)))?;
        inner.head = Head::Branch {
            name: branch.clone(),
            oid,
        };
        Ok(())
    }

    fn is_empty(&self) -> Result<bool, BackendError> {
        let inner = self.begin(MockOperation::IsEmpty)?;
        Ok(inner.commits.is_empty())
    }
}
