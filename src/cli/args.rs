//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--backend <name>`: Backend to use, overriding configuration
//! - `--json`: Machine-readable output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::git::{valid_backend_names, BackendKind};

/// vcscope - what changed in a git repository, for incremental builds
#[derive(Parser, Debug)]
#[command(name = "vcscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if vcscope was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Backend to use: libgit2 or cli
    #[arg(long, global = true, value_parser = parse_backend)]
    pub backend: Option<BackendKind>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

fn parse_backend(value: &str) -> Result<BackendKind, String> {
    BackendKind::from_name(value).ok_or_else(|| {
        format!(
            "unknown backend '{}' (expected one of: {})",
            value,
            valid_backend_names().join(", ")
        )
    })
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Paths that differ between two commits
    #[command(after_help = "\
EXAMPLES:
    # Everything that differs between two tags
    vcscope diff v1.0 v1.1

    # Only what the feature branch changed since it forked from main
    vcscope diff main feature --merge-base")]
    Diff {
        /// Old side (any revision)
        from: String,

        /// New side (any revision)
        to: String,

        /// Diff from the merge base of FROM and TO instead of FROM itself
        #[arg(long)]
        merge_base: bool,
    },

    /// Paths changed by a single commit, relative to its first parent
    Changes {
        /// Commit to inspect
        #[arg(default_value = "HEAD")]
        commit: String,
    },

    /// Uncommitted changes in the working directory, untracked files included
    Status,

    /// Files present in the working directory (tracked and untracked, not ignored)
    Files {
        /// Only list files matching these pathspecs
        pathspecs: Vec<String>,
    },

    /// Files in a commit's tree
    Tree {
        /// Commit to walk
        #[arg(default_value = "HEAD")]
        commit: String,

        /// Stop after this many files
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the contents of a file at a commit
    Show {
        /// Commit to read from
        commit: String,

        /// Repository-relative path
        path: String,
    },

    /// Print the merge base of two commits
    MergeBase {
        /// First commit
        a: String,

        /// Second commit
        b: String,
    },

    /// Current branch and commit
    Head,

    /// Check that the working copy is safe to modify
    #[command(long_about = "Check that the working copy is safe to modify.\n\n\
        Fails when a merge, rebase, cherry-pick, revert, bisect or mailbox \
        apply is in progress, or when the index has unresolved conflicts.")]
    Check,

    /// Check out a commit (detached) or a branch
    #[command(after_help = "\
EXAMPLES:
    # Build an old release, then return
    vcscope checkout v1.0
    vcscope checkout --branch main")]
    Checkout {
        /// Commit, tag or branch to check out
        target: String,

        /// Treat TARGET as a local branch and make it the active branch
        #[arg(long)]
        branch: bool,
    },

    /// Report whether the repository has no commits yet
    Empty,

    /// Show the resolved configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vcscope", "status", "--json", "--backend", "cli"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.backend, Some(BackendKind::Cli));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = Cli::try_parse_from(["vcscope", "--backend", "hg", "status"]).unwrap_err();
        assert!(err.to_string().contains("libgit2, cli"));
    }

    #[test]
    fn diff_merge_base_flag() {
        let cli = Cli::try_parse_from(["vcscope", "diff", "main", "feature", "--merge-base"]).unwrap();
        match cli.command {
            Command::Diff {
                from,
                to,
                merge_base,
            } => {
                assert_eq!(from, "main");
                assert_eq!(to, "feature");
                assert!(merge_base);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn tree_defaults_to_head() {
        let cli = Cli::try_parse_from(["vcscope", "tree", "--limit", "3"]).unwrap();
        match cli.command {
            Command::Tree { commit, limit } => {
                assert_eq!(commit, "HEAD");
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
