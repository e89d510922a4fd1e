//! git::cli
//!
//! Backend implementation that spawns the `git` executable.
//!
//! # Invocation policy
//!
//! - Every command runs with the working-copy root as its current directory.
//! - `GIT_OPTIONAL_LOCKS=0` keeps read commands from taking the index lock,
//!   so reads never contend with each other.
//! - `LC_ALL=C` keeps stderr stable enough to recognize lock and checkout
//!   conflicts.
//! - Listings use `-z` output; no path quoting is ever parsed.
//! - Plumbing commands are preferred where they exist, so user config like
//!   `diff.renames` cannot change the answer.
//!
//! This is the only module outside tests that spawns processes.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::backend::{Backend, DiffOptions, Head, RepoState, WorkspaceOptions};
use super::error::BackendError;
use crate::core::paths::git_path;
use crate::core::types::{BranchName, DiffDelta, EntryKind, Oid, TreeEntry};

/// A repository driven through the `git` command line.
#[derive(Debug, Clone)]
pub struct CliBackend {
    program: PathBuf,
    workdir: PathBuf,
    git_dir: PathBuf,
}

impl CliBackend {
    /// Open the repository containing `path`, using `program` as the git
    /// executable.
    ///
    /// # Errors
    ///
    /// - [`BackendError::Spawn`] if `program` cannot be run
    /// - [`BackendError::NotARepo`] if `path` is not inside a repository
    /// - [`BackendError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path, program: &Path) -> Result<Self, BackendError> {
        if !path.is_dir() {
            return Err(BackendError::NotARepo {
                path: path.to_path_buf(),
            });
        }

        let probe = Self {
            program: program.to_path_buf(),
            workdir: path.to_path_buf(),
            git_dir: PathBuf::new(),
        };

        let output = probe.output(&["rev-parse", "--is-bare-repository", "--absolute-git-dir"])?;
        if !output.status.success() {
            return Err(BackendError::NotARepo {
                path: path.to_path_buf(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        if lines.next() == Some("true") {
            return Err(BackendError::BareRepo);
        }
        let git_dir = lines
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| BackendError::parse("rev-parse did not print a git dir"))?;

        let toplevel = probe.run(&["rev-parse", "--show-toplevel"])?;
        let workdir = PathBuf::from(String::from_utf8_lossy(&toplevel).trim_end_matches('\n'));

        log::debug!("cli backend: workdir {}, git dir {}", workdir.display(), git_dir.display());

        Ok(Self {
            program: program.to_path_buf(),
            workdir,
            git_dir,
        })
    }

    // =========================================================================
    // Process helpers
    // =========================================================================

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE")
            .stdin(Stdio::null());
        cmd
    }

    fn spawn_output(&self, mut cmd: Command) -> Result<Output, BackendError> {
        cmd.output().map_err(|source| BackendError::Spawn {
            program: self.program.display().to_string(),
            source,
        })
    }

    /// Run git and return its raw output, whatever the exit status.
    fn output(&self, args: &[&str]) -> Result<Output, BackendError> {
        log::debug!("git {}", args.join(" "));
        self.spawn_output(self.command(args))
    }

    /// Run git and return stdout, failing on a non-zero exit.
    fn run(&self, args: &[&str]) -> Result<Vec<u8>, BackendError> {
        let output = self.output(args)?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(command_failure(args, &output))
        }
    }

    /// Run `rev-parse --verify --quiet`, which exits 1 for anything that
    /// does not resolve.
    fn verify(&self, rev: &str, what: &str) -> Result<Oid, BackendError> {
        let output = self.output(&["rev-parse", "--verify", "--quiet", rev])?;
        match output.status.code() {
            Some(0) => Ok(Oid::new(String::from_utf8_lossy(&output.stdout).into_owned())?),
            Some(1) => Err(BackendError::not_found(what)),
            _ => Err(command_failure(&["rev-parse", "--verify", rev], &output)),
        }
    }

    fn ensure_commit(&self, oid: &Oid) -> Result<(), BackendError> {
        self.verify(&format!("{}^{{commit}}", oid), &format!("commit {}", oid))
            .map(|_| ())
    }

    fn empty_tree(&self) -> Result<String, BackendError> {
        let stdout = self.run(&["hash-object", "-t", "tree", "--stdin"])?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    fn checkout(&self, args: &[&str]) -> Result<(), BackendError> {
        let output = self.output(args)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("would be overwritten") || stderr.contains("Please commit your changes") {
            return Err(BackendError::CheckoutConflict {
                message: stderr.trim().to_string(),
            });
        }
        Err(command_failure(args, &output))
    }
}

fn command_failure(args: &[&str], output: &Output) -> BackendError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if stderr.contains(".lock': File exists")
        || (stderr.contains("Unable to create") && stderr.contains(".lock"))
    {
        return BackendError::Locked { message: stderr };
    }

    let status = match output.status.code() {
        Some(code) => format!("exit {}", code),
        None => "killed by signal".to_string(),
    };

    BackendError::CommandFailed {
        args: args.join(" "),
        status,
        stderr,
    }
}

// =============================================================================
// Output parsing
// =============================================================================

/// Split `-z` output into its NUL-terminated fields.
fn z_fields(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split(|b| *b == 0).filter(|field| !field.is_empty())
}

fn field_path(field: &[u8]) -> Option<String> {
    let path = std::str::from_utf8(field).ok().and_then(git_path);
    if path.is_none() {
        log::warn!("skipping unrepresentable path {:?}", String::from_utf8_lossy(field));
    }
    path
}

/// Parse `--name-status -z` output.
///
/// Records are `STATUS\0PATH\0`, or `STATUS\0OLD\0NEW\0` for renames and
/// copies (whose status carries a similarity score, `R100`).
pub(crate) fn parse_name_status(bytes: &[u8]) -> Result<Vec<DiffDelta>, BackendError> {
    let mut fields = z_fields(bytes);
    let mut deltas = Vec::new();

    while let Some(status) = fields.next() {
        let code = status
            .first()
            .copied()
            .ok_or_else(|| BackendError::parse("empty status field"))?;

        let mut next_path = || {
            fields
                .next()
                .ok_or_else(|| BackendError::parse(format!("missing path after status '{}'", code as char)))
        };

        let delta = match code {
            b'R' | b'C' => {
                let old = field_path(next_path()?);
                let new = field_path(next_path()?);
                old.zip(new).map(|(o, n)| {
                    if code == b'R' {
                        DiffDelta::renamed(o, n)
                    } else {
                        DiffDelta::copied(o, n)
                    }
                })
            }
            b'A' => field_path(next_path()?).map(DiffDelta::added),
            b'D' => field_path(next_path()?).map(DiffDelta::deleted),
            b'M' | b'U' | b'X' => field_path(next_path()?).map(DiffDelta::modified),
            b'T' => field_path(next_path()?).map(DiffDelta::type_changed),
            other => {
                return Err(BackendError::parse(format!(
                    "unknown diff status '{}'",
                    other as char
                )))
            }
        };

        deltas.extend(delta);
    }

    Ok(deltas)
}

/// Parse one `ls-tree -z` record: `MODE SP TYPE SP OID TAB PATH`.
pub(crate) fn parse_tree_record(record: &[u8]) -> Result<Option<TreeEntry>, BackendError> {
    let tab = record
        .iter()
        .position(|b| *b == b'\t')
        .ok_or_else(|| BackendError::parse("ls-tree record without a tab"))?;
    let (meta, path) = (&record[..tab], &record[tab + 1..]);

    let meta = std::str::from_utf8(meta).map_err(|e| BackendError::parse(e.to_string()))?;
    let mut parts = meta.split(' ');
    let (Some(mode), Some(_kind), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(BackendError::parse(format!("malformed ls-tree record '{}'", meta)));
    };

    let mode = u32::from_str_radix(mode, 8)
        .map_err(|_| BackendError::parse(format!("bad mode '{}'", mode)))?;
    let Some(kind) = EntryKind::from_mode(mode) else {
        log::warn!("skipping entry with unknown mode {:o}", mode);
        return Ok(None);
    };
    let Some(path) = field_path(path) else {
        return Ok(None);
    };

    Ok(Some(TreeEntry {
        path,
        id: Oid::new(id)?,
        kind,
    }))
}

impl Backend for CliBackend {
    fn name(&self) -> &'static str {
        "cli"
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn resolve_commit(&self, spec: &str) -> Result<Oid, BackendError> {
        let what = format!("revision '{}'", spec);
        if spec.starts_with('-') {
            return Err(BackendError::not_found(what));
        }

        let oid = self.verify(&format!("{}^{{commit}}", spec), &what)?;
        // A commit whose tree cannot be read is as good as missing
        self.verify(&format!("{}^{{tree}}", oid), &what)?;
        Ok(oid)
    }

    fn commit_parents(&self, commit: &Oid) -> Result<Vec<Oid>, BackendError> {
        self.ensure_commit(commit)?;
        let stdout = self.run(&["rev-list", "--parents", "-n", "1", commit.as_str()])?;
        String::from_utf8_lossy(&stdout)
            .split_whitespace()
            .skip(1)
            .map(|parent| Oid::new(parent).map_err(BackendError::from))
            .collect()
    }

    fn tree_entries(&self, commit: &Oid) -> Result<Vec<TreeEntry>, BackendError> {
        self.ensure_commit(commit)?;
        let stdout = self.run(&["ls-tree", "-r", "-z", "--full-tree", commit.as_str()])?;

        let mut entries = Vec::new();
        for record in z_fields(&stdout) {
            entries.extend(parse_tree_record(record)?);
        }
        Ok(entries)
    }

    fn entry(&self, commit: &Oid, path: &str) -> Result<TreeEntry, BackendError> {
        self.ensure_commit(commit)?;

        let mut cmd = self.command(&["ls-tree", "-z", "--full-tree", commit.as_str(), "--", path]);
        cmd.env("GIT_LITERAL_PATHSPECS", "1");
        log::debug!("git ls-tree {} -- {}", commit, path);
        let output = self.spawn_output(cmd)?;
        if !output.status.success() {
            return Err(command_failure(&["ls-tree", commit.as_str(), "--", path], &output));
        }

        for record in z_fields(&output.stdout) {
            if let Some(entry) = parse_tree_record(record)? {
                if entry.path == path {
                    return Ok(entry);
                }
            }
        }

        Err(BackendError::not_found(format!("'{}' in {}", path, commit.short(7))))
    }

    fn read_blob(&self, blob: &Oid) -> Result<Vec<u8>, BackendError> {
        let args = ["cat-file", "blob", blob.as_str()];
        let output = self.output(&args)?;
        if output.status.success() {
            return Ok(output.stdout);
        }

        let exists = format!("{}^{{blob}}", blob);
        match self.verify(&exists, &format!("blob {}", blob)) {
            Ok(_) => Err(command_failure(&args, &output)),
            Err(e) => Err(e),
        }
    }

    fn diff_trees(
        &self,
        old: Option<&Oid>,
        new: &Oid,
        opts: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        let old = match old {
            Some(oid) => {
                self.ensure_commit(oid)?;
                oid.to_string()
            }
            None => self.empty_tree()?,
        };
        self.ensure_commit(new)?;

        let renames = if opts.detect_renames { "-M" } else { "--no-renames" };
        let stdout = self.run(&[
            "diff-tree",
            "-r",
            "-z",
            "--name-status",
            renames,
            old.as_str(),
            new.as_str(),
        ])?;

        parse_name_status(&stdout)
    }

    fn workspace_changes(
        &self,
        workspace: &WorkspaceOptions,
        diff: &DiffOptions,
    ) -> Result<Vec<DiffDelta>, BackendError> {
        let renames = if diff.detect_renames { "-M" } else { "--no-renames" };
        // Porcelain diff refreshes stat info in memory; diff-files would
        // report every touched file as modified.
        let stdout = self.run(&[
            "diff",
            "--name-status",
            "-z",
            "--no-ext-diff",
            "--no-color",
            renames,
        ])?;
        let mut deltas = parse_name_status(&stdout)?;

        // Unmerged paths can be reported twice
        let mut seen = std::collections::HashSet::new();
        deltas.retain(|d| seen.insert(d.path().to_string()));

        if workspace.include_untracked {
            let mut args = vec!["ls-files", "--others", "--exclude-standard", "-z"];
            if !workspace.recurse_untracked_dirs {
                args.push("--directory");
            }
            let stdout = self.run(&args)?;
            deltas.extend(z_fields(&stdout).filter_map(field_path).map(DiffDelta::untracked));
        }

        deltas.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(deltas)
    }

    fn workspace_files(
        &self,
        pathspecs: &[String],
        workspace: &WorkspaceOptions,
    ) -> Result<Vec<String>, BackendError> {
        let mut args = vec!["ls-files", "--cached", "--exclude-standard", "-z"];
        if workspace.include_untracked {
            args.push("--others");
            if !workspace.recurse_untracked_dirs {
                args.push("--directory");
            }
        }
        args.push("--");
        args.extend(pathspecs.iter().map(String::as_str));

        let stdout = self.run(&args)?;
        Ok(z_fields(&stdout)
            .filter_map(field_path)
            // --cached still lists tracked files deleted from disk
            .filter(|path| self.workdir.join(path).symlink_metadata().is_ok())
            .collect())
    }

    fn merge_bases(&self, a: &Oid, b: &Oid) -> Result<Vec<Oid>, BackendError> {
        self.ensure_commit(a)?;
        self.ensure_commit(b)?;

        let args = ["merge-base", "--all", a.as_str(), b.as_str()];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(|line| Oid::new(line).map_err(BackendError::from))
                .collect(),
            // exit 1 with no output: no common ancestor
            Some(1) if output.stdout.is_empty() => Ok(Vec::new()),
            _ => Err(command_failure(&args, &output)),
        }
    }

    fn head(&self) -> Result<Head, BackendError> {
        let symbolic = self.output(&["symbolic-ref", "-q", "HEAD"])?;
        let branch = match symbolic.status.code() {
            Some(0) => Some(String::from_utf8_lossy(&symbolic.stdout).trim().to_string()),
            Some(1) => None,
            _ => return Err(command_failure(&["symbolic-ref", "-q", "HEAD"], &symbolic)),
        };

        let oid = match self.verify("HEAD^{commit}", "HEAD") {
            Ok(oid) => Some(oid),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        match (branch, oid) {
            (Some(refname), Some(oid)) => match refname.strip_prefix("refs/heads/") {
                Some(short) => Ok(Head::Branch {
                    name: BranchName::new(short)?,
                    oid,
                }),
                None => Ok(Head::Detached(oid)),
            },
            (Some(refname), None) => Ok(Head::Unborn {
                name: refname
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&refname)
                    .to_string(),
            }),
            (None, Some(oid)) => Ok(Head::Detached(oid)),
            (None, None) => Err(BackendError::parse("HEAD is neither symbolic nor a commit")),
        }
    }

    fn branch_commit(&self, branch: &BranchName) -> Result<Oid, BackendError> {
        self.verify(
            &format!("{}^{{commit}}", branch.refname()),
            &format!("branch '{}'", branch),
        )
    }

    fn state(&self) -> Result<RepoState, BackendError> {
        Ok(RepoState::from_git_dir(&self.git_dir))
    }

    fn has_conflicts(&self) -> Result<bool, BackendError> {
        let stdout = self.run(&["ls-files", "--unmerged", "-z"])?;
        let unmerged = z_fields(&stdout).next().is_some();
        Ok(unmerged)
    }

    fn checkout_commit(&self, commit: &Oid) -> Result<(), BackendError> {
        self.ensure_commit(commit)?;
        self.checkout(&["checkout", "--quiet", "--detach", commit.as_str()])
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), BackendError> {
        self.branch_commit(branch)?;
        self.checkout(&["checkout", "--quiet", branch.as_str(), "--"])
    }

    fn is_empty(&self) -> Result<bool, BackendError> {
        if !matches!(self.head()?, Head::Unborn { .. }) {
            return Ok(false);
        }
        let stdout = self.run(&["for-each-ref", "--count=1", "--format=%(refname)"])?;
        Ok(stdout.iter().all(u8::is_ascii_whitespace))
    }
}
