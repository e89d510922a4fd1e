//! show and merge-base commands - Read single objects

use std::io::Write;

use serde::Serialize;

use super::read_session;
use crate::cli::Context;
use crate::core::types::Commit;
use crate::ui::output;
use anyhow::{Context as _, Result};

#[derive(Serialize)]
struct ShownFile<'a> {
    commit: &'a Commit,
    path: &'a str,
    id: String,
    size: usize,
    contents: String,
}

/// Print the contents of `path` at `commit`.
///
/// Bytes are written unchanged; with `--json` they are decoded as UTF-8,
/// lossily.
pub fn show(ctx: &Context, commit: &str, path: &str) -> Result<()> {
    let session = read_session(ctx)?;
    let repo = &session.repo;
    let commit = repo.get_commit(commit)?;

    let contents = repo.blob_contents_from_tree(&commit, path)?;

    if ctx.json {
        output::json(&ShownFile {
            commit: &commit,
            path,
            id: repo.entry_id(&commit, path)?,
            size: contents.len(),
            contents: String::from_utf8_lossy(&contents).into_owned(),
        })?;
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&contents)
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")?;
    Ok(())
}

/// Print the merge base of two revisions.
pub fn merge_base(ctx: &Context, a: &str, b: &str) -> Result<()> {
    let session = read_session(ctx)?;
    let repo = &session.repo;

    let base = repo.merge_base(&repo.get_commit(a)?, &repo.get_commit(b)?)?;
    if ctx.json {
        output::json(&base)?;
    } else {
        output::result(&base);
    }
    Ok(())
}
