//! checkout command - Check out a commit or branch

use serde::Serialize;

use crate::cli::Context;
use crate::core::lock::LockMode;
use crate::core::types::{BranchName, Reference};
use crate::git::VcsError;
use crate::ui::output;
use anyhow::Result;

#[derive(Serialize)]
struct CheckoutResult {
    previous: Reference,
    head: Reference,
    commit: String,
}

/// Check out `target`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `target` - Revision, or branch name with `branch`
/// * `branch` - Make `target` the active branch instead of detaching
pub fn checkout(ctx: &Context, target: &str, branch: bool) -> Result<()> {
    let session = ctx.open(LockMode::Exclusive)?;
    let repo = &session.repo;
    let previous = repo.head_reference()?;

    let head = if branch {
        let name = BranchName::new(target).map_err(|_| VcsError::NotFound {
            what: format!("branch '{}'", target),
        })?;
        let reference = Reference::branch(&name);
        repo.checkout_reference(&reference)?;
        reference
    } else {
        let commit = repo.get_commit(target)?;
        repo.checkout(&commit)?
    };
    let commit = repo.get_commit(Reference::HEAD)?;

    if ctx.json {
        output::json(&CheckoutResult {
            previous,
            head,
            commit: commit.to_string(),
        })?;
    } else if head.is_detached() {
        output::print(format!("HEAD is now at {}", commit.short()), ctx.verbosity);
    } else {
        output::print(format!("Switched to branch '{}'", head), ctx.verbosity);
    }
    Ok(())
}
