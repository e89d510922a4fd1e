//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting, JSON rendering and the stderr logger
//!
//! # Design
//!
//! All terminal output goes through this module so quiet, debug and JSON
//! modes are handled in one place.

pub mod output;
