//! CLI commands.

pub mod reindex;
