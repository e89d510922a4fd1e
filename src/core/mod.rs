//! core
//!
//! Domain types, configuration and workspace plumbing for vcscope.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, BranchName, Commit, Reference, Blob, DiffDelta
//! - [`paths`] - Repository path normalization and vcscope storage paths
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Advisory workspace lock for callers that check out
//!
//! Nothing here talks to git; see [`crate::git`] for that.

pub mod config;
pub mod lock;
pub mod paths;
pub mod types;
