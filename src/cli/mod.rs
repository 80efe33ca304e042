//! CLI command handlers
//!
//! Each subcommand is implemented in its own module. Handlers load the
//! configuration and state file, run one agent operation and persist state.

pub mod ask;
pub mod config;
pub mod feedback;
pub mod helpers;
pub mod insights;
pub mod kb;
