//! diff, changes and status commands - Report changed paths

use super::{print_deltas, read_session};
use crate::cli::Context;
use anyhow::{Context as _, Result};

/// Paths that differ between two revisions.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `from` - Old side
/// * `to` - New side
/// * `merge_base` - Diff from the merge base of `from` and `to` instead
pub fn diff(ctx: &Context, from: &str, to: &str, merge_base: bool) -> Result<()> {
    let session = read_session(ctx)?;
    let repo = &session.repo;

    let old = repo.get_commit(from)?;
    let new = repo.get_commit(to)?;

    let deltas = if merge_base {
        repo.diff_merge_base(&old, &new)
            .with_context(|| format!("diff {}...{}", from, to))?
    } else {
        repo.diff(&old, &new)
            .with_context(|| format!("diff {}..{}", from, to))?
    };

    print_deltas(ctx, &deltas)
}

/// Paths changed by one commit.
pub fn changes(ctx: &Context, commit: &str) -> Result<()> {
    let session = read_session(ctx)?;
    let commit = session.repo.get_commit(commit)?;
    let deltas = session.repo.changes(&commit)?;
    print_deltas(ctx, &deltas)
}

/// Uncommitted changes in the working directory.
pub fn status(ctx: &Context) -> Result<()> {
    let session = read_session(ctx)?;
    let deltas = session.repo.diff_workspace()?;
    print_deltas(ctx, &deltas)
}
