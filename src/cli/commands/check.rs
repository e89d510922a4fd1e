//! check command - Verify the workspace is safe to modify

use super::read_session;
use crate::cli::Context;
use crate::ui::output;
use anyhow::Result;

/// Fail unless the working copy is safe for checkouts.
pub fn check(ctx: &Context) -> Result<()> {
    let session = read_session(ctx)?;
    session.repo.ensure_safe_workspace()?;

    if ctx.json {
        output::json(&serde_json::json!({ "safe": true }))?;
    } else {
        output::print("workspace is safe", ctx.verbosity);
    }
    Ok(())
}
