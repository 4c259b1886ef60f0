//! End-to-end tests driving reindex_core against on-disk mail directories.

mod harness;
mod scenarios;
