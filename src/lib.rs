//! vcscope - backend-independent change detection over git repositories
//!
//! vcscope answers the questions an incremental build or test runner asks of
//! version control: which commit does this name, what changed between two
//! points in history or in the working directory, what files exist, what do
//! they contain, and is it safe to check something out.
//!
//! # Architecture
//!
//! - [`git`] - The [`Repository`](git::Repository) abstraction and its backends
//! - [`core`] - Entity types, path rules, configuration and locking
//! - [`ui`] - Output helpers and the logger installed by the binary
//! - [`cli`] - The `vcscope` command-line interface
//!
//! # Invariants
//!
//! 1. Every answer is the same whichever backend produced it
//! 2. Every failure is classified as not-found, unsafe, disjoint or internal
//! 3. Nothing touches the working directory unless it is safe to do so

pub mod cli;
pub mod core;
pub mod git;
pub mod ui;
