//! On-disk layout of a mail directory.

use crate::error::{ReindexError, Result};
use std::path::{Path, PathBuf};

const STORE_DIR: &str = "store";
const MESSAGES_FILE: &str = "messages";
const CURRENT_INDEX_DIR: &str = "index";
const REINDEXED_DIR: &str = "index-reindexed";
const INDEX_ENGINE_DIR: &str = "whistlepig";

/// Paths inside one mail directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDir {
    base: PathBuf,
}

impl MailDir {
    /// Wraps `base` without touching the filesystem.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The mail directory itself.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding the store database.
    pub fn store_dir(&self) -> PathBuf {
        self.base.join(STORE_DIR)
    }

    /// Raw message blob file.
    pub fn messages_path(&self) -> PathBuf {
        self.base.join(MESSAGES_FILE)
    }

    /// Index currently in service; never written by a reindex.
    pub fn current_index_dir(&self) -> PathBuf {
        self.base.join(CURRENT_INDEX_DIR)
    }

    /// Root the operator swaps in place of [`current_index_dir`](Self::current_index_dir).
    pub fn reindexed_root(&self) -> PathBuf {
        self.base.join(REINDEXED_DIR)
    }

    /// Directory the new index is written to.
    pub fn index_dir(&self) -> PathBuf {
        self.reindexed_root().join(INDEX_ENGINE_DIR)
    }

    /// Pre-run guard: refuses to build on top of an earlier attempt.
    ///
    /// # Errors
    ///
    /// Returns `DestinationExists` if the destination index directory exists,
    /// even if it is empty.
    pub fn ensure_fresh_destination(&self) -> Result<()> {
        let dest = self.index_dir();
        if dest.exists() {
            return Err(ReindexError::DestinationExists { path: dest });
        }
        Ok(())
    }
}
