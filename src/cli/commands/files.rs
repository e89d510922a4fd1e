//! files and tree commands - List files in the workspace or a commit

use std::ops::ControlFlow;

use super::read_session;
use crate::cli::Context;
use crate::ui::output;
use anyhow::Result;

/// Files present in the working directory.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `pathspecs` - Filters; empty lists everything
pub fn files(ctx: &Context, pathspecs: &[String]) -> Result<()> {
    let session = read_session(ctx)?;
    let files = session.repo.find_all_files_in_workspace(pathspecs)?;

    if ctx.json {
        output::json(&files)?;
    } else {
        for file in &files {
            output::result(file);
        }
    }
    Ok(())
}

/// Files in a commit's tree, with their ids.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `commit` - Revision to walk
/// * `limit` - Stop after this many files
pub fn tree(ctx: &Context, commit: &str, limit: Option<usize>) -> Result<()> {
    let session = read_session(ctx)?;
    let commit = session.repo.get_commit(commit)?;

    let mut blobs = Vec::new();
    session.repo.walk_blobs(&commit, |blob| {
        blobs.push(blob.clone());
        match limit {
            Some(max) if blobs.len() >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    if ctx.json {
        output::json(&blobs)?;
    } else {
        for blob in &blobs {
            output::result(format!("{}\t{}", blob.id(), blob.path()));
        }
    }
    Ok(())
}
