//! git::libgit2
//!
//! Backend implementation using the linked libgit2 library (`git2`).
//!
//! This is the only module that imports `git2`. Every libgit2 error is turned
//! into a [`BackendError`] by [`from_git2`] before it leaves this file.
//!
//! # Example
//!
//! ```ignore
//! use vcscope::git::{Backend, Git2Backend};
//! use std::path::Path;
//!
//! let backend = Git2Backend::open(Path::new("."))?;
//! let oid = backend.resolve_commit("HEAD")?;
//! println!("HEAD is at {}", oid.short(7));
//! ```

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{BranchType, Delta, ErrorCode, StatusOptions, TreeWalkMode, TreeWalkResult};

use super::backend::{Backend, DiffOptions, Head, RepoState, WorkspaceOptions};
use super::error::BackendError;
use crate::core::paths::git_path;
use crate::core::types::{BranchName, DiffDelta, EntryKind, Oid, TreeEntry};

/// Map a libgit2 error onto a backend error.
///
/// `context` names what was being looked up; it becomes the subject of
/// `NotFound` errors.
fn from_git2(err: git2::Error, context: &str) -> BackendError {
    match err.code() {
        ErrorCode::NotFound
        | ErrorCode::InvalidSpec
        | ErrorCode::Ambiguous
        | ErrorCode::Peel
        | ErrorCode::UnbornBranch => BackendError::not_found(context),
        ErrorCode::Conflict | ErrorCode::Uncommitted | ErrorCode::IndexDirty => {
            BackendError::CheckoutConflict {
                message: err.message().to_string(),
            }
        }
        ErrorCode::Locked => BackendError::Locked {
            message: err.message().to_string(),
        },
        _ => BackendError::Library {
            context: context.to_string(),
            message: err.message().to_string(),
        },
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, BackendError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| from_git2(e, oid.as_str()))
}

fn from_git2_oid(oid: git2::Oid) -> Result<Oid, BackendError> {
    Ok(Oid::new(oid.to_string())?)
}

/// A repository opened through libgit2.
pub struct Git2Backend {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl std::fmt::Debug for Git2Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git2Backend")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git2Backend {
    /// Open the repository containing `path`.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the working copy.
    ///
    /// # Errors
    ///
    /// - [`BackendError::NotARepo`] if no repository is found
    /// - [`BackendError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let repo = git2::Repository::discover(path).map_err(|_| BackendError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let workdir = match repo.workdir() {
            Some(dir) if !repo.is_bare() => dir.to_path_buf(),
            _ => return Err(BackendError::BareRepo),
        };

        Ok(Self { repo, workdir })
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, BackendError> {
        self.repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| from_git2(e, &format!("commit {}", oid)))
    }

    fn commit_tree(&self, oid: &Oid) -> Result<git2::Tree<'_>, BackendError> {
        self.find_commit(oid)?
            .tree()
            .map_err(|e| from_git2(e, &format!("tree of {}", oid)))
    }

    fn index(&self) -> Result<git2::Index, BackendError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| from_git2(e, "index"))?;
        index.read(false).map_err(|e| from_git2(e, "index"))?;
        Ok(index)
    }

    fn collect_deltas(
        &self,
        mut diff: git2::Diff<'_>,
        opts: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        if opts.detect_renames {
            let mut find = git2::DiffFindOptions::new();
            find.renames(true);
            diff.find_similar(Some(&mut find))
                .map_err(|e| from_git2(e, "rename detection"))?;
        }

        Ok(diff.deltas().filter_map(convert_delta).collect())
    }

    fn safe_checkout(&self, target: &git2::Object<'_>) -> Result<(), BackendError> {
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(target, Some(&mut checkout))
            .map_err(|e| from_git2(e, "checkout"))
    }

    fn unborn_branch_name(&self) -> Result<String, BackendError> {
        let head = self
            .repo
            .find_reference("HEAD")
            .map_err(|e| from_git2(e, "HEAD"))?;
        let target = head
            .symbolic_target()
            .ok_or_else(|| BackendError::parse("unborn HEAD is not symbolic"))?;
        Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
    }
}

fn repo_path(path: Option<&Path>) -> Option<String> {
    path.and_then(|p| p.to_str()).and_then(git_path)
}

fn convert_delta(delta: git2::DiffDelta<'_>) -> Option<DiffDelta> {
    let old = repo_path(delta.old_file().path());
    let new = repo_path(delta.new_file().path());

    let converted = match delta.status() {
        Delta::Added => new.map(DiffDelta::added),
        Delta::Deleted => old.map(DiffDelta::deleted),
        Delta::Modified | Delta::Conflicted | Delta::Unreadable => {
            new.or(old).map(DiffDelta::modified)
        }
        Delta::Typechange => new.or(old).map(DiffDelta::type_changed),
        Delta::Renamed => old.zip(new).map(|(o, n)| DiffDelta::renamed(o, n)),
        Delta::Copied => old.zip(new).map(|(o, n)| DiffDelta::copied(o, n)),
        Delta::Untracked => new.map(DiffDelta::untracked),
        Delta::Unmodified | Delta::Ignored => return None,
    };

    if converted.is_none() {
        log::warn!(
            "skipping {:?} delta with unrepresentable path ({:?} -> {:?})",
            delta.status(),
            delta.old_file().path(),
            delta.new_file().path()
        );
    }
    converted
}

impl Backend for Git2Backend {
    fn name(&self) -> &'static str {
        "libgit2"
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    fn resolve_commit(&self, spec: &str) -> Result<Oid, BackendError> {
        let context = format!("revision '{}'", spec);
        let commit = self
            .repo
            .revparse_single(spec)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| from_git2(e, &context))?;

        // A commit whose tree cannot be read is as good as missing
        commit.tree().map_err(|e| from_git2(e, &context))?;

        from_git2_oid(commit.id())
    }

    fn commit_parents(&self, commit: &Oid) -> Result<Vec<Oid>, BackendError> {
        self.find_commit(commit)?
            .parent_ids()
            .map(from_git2_oid)
            .collect()
    }

    fn tree_entries(&self, commit: &Oid) -> Result<Vec<TreeEntry>, BackendError> {
        let tree = self.commit_tree(commit)?;

        let mut raw = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Tree) {
                return TreeWalkResult::Ok;
            }
            match entry.name().and_then(|name| git_path(&format!("{}{}", root, name))) {
                Some(path) => raw.push((path, entry.id(), entry.filemode())),
                None => log::warn!("skipping unrepresentable tree entry under '{}'", root),
            }
            TreeWalkResult::Ok
        })
        .map_err(|e| from_git2(e, &format!("tree of {}", commit)))?;

        let mut entries = Vec::with_capacity(raw.len());
        for (path, id, mode) in raw {
            let Some(kind) = EntryKind::from_mode(mode as u32) else {
                log::warn!("skipping '{}' with unknown mode {:o}", path, mode);
                continue;
            };
            entries.push(TreeEntry {
                path,
                id: from_git2_oid(id)?,
                kind,
            });
        }

        Ok(entries)
    }

    fn entry(&self, commit: &Oid, path: &str) -> Result<TreeEntry, BackendError> {
        let tree = self.commit_tree(commit)?;
        let entry = tree
            .get_path(Path::new(path))
            .map_err(|e| from_git2(e, &format!("'{}' in {}", path, commit.short(7))))?;

        let kind = EntryKind::from_mode(entry.filemode() as u32).ok_or_else(|| {
            BackendError::parse(format!("unknown mode {:o} for '{}'", entry.filemode(), path))
        })?;

        Ok(TreeEntry {
            path: path.to_string(),
            id: from_git2_oid(entry.id())?,
            kind,
        })
    }

    fn read_blob(&self, blob: &Oid) -> Result<Vec<u8>, BackendError> {
        let found = self
            .repo
            .find_blob(to_git2(blob)?)
            .map_err(|e| from_git2(e, &format!("blob {}", blob)))?;

        Ok(found.content().to_vec())
    }

    fn diff_trees(
        &self,
        old: Option<&Oid>,
        new: &Oid,
        opts: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        let old_tree = old.map(|oid| self.commit_tree(oid)).transpose()?;
        let new_tree = self.commit_tree(new)?;

        let mut diff_opts = git2::DiffOptions::new();
        diff_opts.include_typechange(true);

        let diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), Some(&mut diff_opts))
            .map_err(|e| from_git2(e, "diff trees"))?;

        self.collect_deltas(diff, opts)
    }

    fn workspace_changes(
        &self,
        workspace: &WorkspaceOptions,
        diff: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        let index = self.index()?;

        let mut diff_opts = git2::DiffOptions::new();
        diff_opts
            .include_typechange(true)
            .include_untracked(workspace.include_untracked)
            .recurse_untracked_dirs(workspace.recurse_untracked_dirs)
            .include_ignored(false);

        let changes = self
            .repo
            .diff_index_to_workdir(Some(&index), Some(&mut diff_opts))
            .map_err(|e| from_git2(e, "diff index to workdir"))?;

        let mut deltas = self.collect_deltas(changes, diff)?;
        deltas.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(deltas)
    }

    fn workspace_files(
        &self,
        pathspecs: &[String],
        workspace: &WorkspaceOptions,
    ) -> Result<Vec<String>, BackendError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(workspace.include_untracked)
            .recurse_untracked_dirs(workspace.recurse_untracked_dirs)
            .include_unmodified(true)
            .include_ignored(false);
        for spec in pathspecs {
            opts.pathspec(spec.as_str());
        }

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| from_git2(e, "workspace status"))?;

        let mut files = Vec::new();
        for entry in statuses.iter() {
            if entry.status().is_ignored() || entry.status().is_wt_deleted() {
                continue;
            }
            let Some(path) = entry.path().and_then(git_path) else {
                continue;
            };
            // Staged deletions have no worktree flag; the disk is authoritative
            if self.workdir.join(&path).symlink_metadata().is_ok() {
                files.push(path);
            }
        }

        Ok(files)
    }

    fn merge_bases(&self, a: &Oid, b: &Oid) -> Result<Vec<Oid>, BackendError> {
        match self.repo.merge_bases(to_git2(a)?, to_git2(b)?) {
            Ok(bases) => bases.iter().copied().map(from_git2_oid).collect(),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(Vec::new()),
            Err(e) => Err(from_git2(e, &format!("merge base of {} and {}", a, b))),
        }
    }

    fn head(&self) -> Result<Head, BackendError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                return Ok(Head::Unborn {
                    name: self.unborn_branch_name()?,
                });
            }
            Err(e) => return Err(from_git2(e, "HEAD")),
        };

        let oid = head
            .peel_to_commit()
            .map_err(|e| from_git2(e, "HEAD"))
            .and_then(|c| from_git2_oid(c.id()))?;

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Head::Branch {
                    name: BranchName::new(name)?,
                    oid,
                });
            }
        }

        Ok(Head::Detached(oid))
    }

    fn branch_commit(&self, branch: &BranchName) -> Result<Oid, BackendError> {
        let context = format!("branch '{}'", branch);
        let commit = self
            .repo
            .find_branch(branch.as_str(), BranchType::Local)
            .and_then(|b| b.get().peel_to_commit())
            .map_err(|e| from_git2(e, &context))?;

        from_git2_oid(commit.id())
    }

    fn state(&self) -> Result<RepoState, BackendError> {
        let state = match self.repo.state() {
            git2::RepositoryState::Clean => RepoState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => {
                // libgit2 has no progress API; the marker files carry it
                match RepoState::from_git_dir(self.repo.path()) {
                    rebase @ RepoState::Rebase { .. } => rebase,
                    _ => RepoState::Rebase {
                        current: None,
                        total: None,
                    },
                }
            }
            git2::RepositoryState::Merge => RepoState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                RepoState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                RepoState::Revert
            }
            git2::RepositoryState::Bisect => RepoState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                RepoState::ApplyMailbox
            }
        };
        Ok(state)
    }

    fn has_conflicts(&self) -> Result<bool, BackendError> {
        Ok(self.index()?.has_conflicts())
    }

    fn checkout_commit(&self, commit: &Oid) -> Result<(), BackendError> {
        let target = self.find_commit(commit)?;
        self.safe_checkout(target.as_object())?;
        self.repo
            .set_head_detached(target.id())
            .map_err(|e| from_git2(e, "detach HEAD"))
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), BackendError> {
        let context = format!("branch '{}'", branch);
        let refname = branch.refname();
        let target = self
            .repo
            .find_reference(&refname)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| from_git2(e, &context))?;

        self.safe_checkout(target.as_object())?;
        self.repo
            .set_head(&refname)
            .map_err(|e| from_git2(e, &context))
    }

    fn is_empty(&self) -> Result<bool, BackendError> {
        // Unborn HEAD and no refs, whatever the default branch is called
        if !matches!(self.head()?, Head::Unborn { .. }) {
            return Ok(false);
        }
        let mut refs = self
            .repo
            .references()
            .map_err(|e| from_git2(e, "references"))?;
        Ok(refs.next().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes_map_to_not_found() {
        for code in [ErrorCode::NotFound, ErrorCode::InvalidSpec, ErrorCode::Ambiguous] {
            let err = git2::Error::new(code, git2::ErrorClass::Reference, "nope");
            assert!(from_git2(err, "refs/heads/x").is_not_found());
        }
    }

    #[test]
    fn checkout_conflict_mapped() {
        let err = git2::Error::new(ErrorCode::Conflict, git2::ErrorClass::Checkout, "1 conflict");
        assert!(matches!(
            from_git2(err, "checkout"),
            BackendError::CheckoutConflict { .. }
        ));
    }

    #[test]
    fn other_codes_keep_context() {
        let err = git2::Error::new(ErrorCode::GenericError, git2::ErrorClass::Os, "disk on fire");
        match from_git2(err, "diff trees") {
            BackendError::Library { context, message } => {
                assert_eq!(context, "diff trees");
                assert_eq!(message, "disk on fire");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn open_outside_repo_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        // A fresh temp dir may still sit under a repository on dev machines
        if git2::Repository::discover(temp.path()).is_err() {
            assert!(matches!(
                Git2Backend::open(temp.path()),
                Err(BackendError::NotARepo { .. })
            ));
        }
    }

    #[test]
    fn fresh_repository_is_empty_and_unborn() {
        let temp = tempfile::TempDir::new().unwrap();
        git2::Repository::init(temp.path()).unwrap();

        let backend = Git2Backend::open(temp.path()).unwrap();
        assert!(backend.is_empty().unwrap());
        assert!(matches!(backend.head().unwrap(), Head::Unborn { .. }));
        assert!(backend.resolve_commit("HEAD").unwrap_err().is_not_found());
    }
}
