//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository with the lock it needs
//! 2. Calls [`Repository`](crate::git::Repository) operations
//! 3. Formats and displays output (text or `--json`)
//!
//! Only `checkout` modifies the working directory; it takes the exclusive
//! workspace lock. Everything else takes the shared one.

mod check;
mod checkout;
mod config_cmd;
mod diff;
mod files;
mod head;
mod show;

// Re-export command functions for testing and direct invocation
pub use check::check;
pub use checkout::checkout;
pub use config_cmd::config;
pub use diff::{changes, diff, status};
pub use files::{files, tree};
pub use head::{empty, head};
pub use show::{merge_base, show};

use crate::cli::args::Command;
use crate::cli::{Context, Session};
use crate::core::lock::LockMode;
use crate::core::types::DiffDelta;
use crate::ui::output;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Diff {
            from,
            to,
            merge_base,
        } => diff(ctx, &from, &to, merge_base),
        Command::Changes { commit } => changes(ctx, &commit),
        Command::Status => status(ctx),
        Command::Files { pathspecs } => files(ctx, &pathspecs),
        Command::Tree { commit, limit } => tree(ctx, &commit, limit),
        Command::Show { commit, path } => show(ctx, &commit, &path),
        Command::MergeBase { a, b } => merge_base(ctx, &a, &b),
        Command::Head => head(ctx),
        Command::Check => check(ctx),
        Command::Checkout { target, branch } => checkout(ctx, &target, branch),
        Command::Empty => empty(ctx),
        Command::Config => config(ctx),
    }
}

/// Open the repository for a read-only command.
fn read_session(ctx: &Context) -> Result<Session> {
    ctx.open(LockMode::Shared)
}

/// Print deltas one per line (`M\tpath`), or as a JSON array.
fn print_deltas(ctx: &Context, deltas: &[DiffDelta]) -> Result<()> {
    if ctx.json {
        output::json(deltas)?;
    } else {
        for delta in deltas {
            output::result(delta);
        }
    }
    output::debug(format!("{} changed paths", deltas.len()), ctx.verbosity);
    Ok(())
}
