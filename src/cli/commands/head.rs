//! head and empty commands - Describe HEAD

use serde::Serialize;

use super::read_session;
use crate::cli::Context;
use crate::core::types::{Commit, Reference};
use crate::ui::output;
use anyhow::Result;

#[derive(Serialize)]
struct HeadInfo {
    reference: Reference,
    branch: Option<String>,
    commit: Option<Commit>,
    detached: bool,
}

/// Print the current branch and commit.
///
/// An unborn branch prints its name with no commit; a detached HEAD prints
/// `HEAD` and the commit.
pub fn head(ctx: &Context) -> Result<()> {
    let session = read_session(ctx)?;
    let repo = &session.repo;

    let reference = repo.head_reference()?;
    let commit = if reference.is_detached() {
        Some(repo.get_commit(Reference::HEAD)?)
    } else {
        match repo.current_branch_commit() {
            Ok(commit) => Some(commit),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        }
    };

    let info = HeadInfo {
        branch: reference.symbolic_name().map(str::to_string),
        detached: reference.is_detached(),
        reference,
        commit,
    };

    if ctx.json {
        output::json(&info)?;
        return Ok(());
    }

    let name = info.branch.as_deref().unwrap_or(Reference::HEAD);
    match &info.commit {
        Some(commit) => output::result(format!("{} {}", name, commit)),
        None => output::result(format!("{} (no commits)", name)),
    }
    Ok(())
}

/// Print whether the repository has no commits yet.
pub fn empty(ctx: &Context) -> Result<()> {
    let session = read_session(ctx)?;
    let empty = session.repo.is_empty()?;

    if ctx.json {
        output::json(&serde_json::json!({ "empty": empty }))?;
    } else {
        output::result(empty);
    }
    Ok(())
}
