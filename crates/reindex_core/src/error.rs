//! Error types for reindex_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for reindex_core operations.
#[derive(Error, Debug)]
pub enum ReindexError {
    /// The destination index directory already holds an index.
    #[error("destination index already exists at {}", path.display())]
    DestinationExists {
        /// Path of the existing index
        path: PathBuf,
    },

    /// The message store could not be opened.
    #[error("failed to open store at {}: {}", path.display(), reason)]
    StoreOpen {
        /// Path of the store database
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// A store read or id-mapping write failed mid-run.
    #[error("store error: {0}")]
    Store(String),

    /// A search index operation failed.
    #[error("search index error: {0}")]
    Index(String),

    /// Another process holds the destination index.
    #[error("index at {} is locked by another process", path.display())]
    IndexLocked {
        /// Path of the index directory
        path: PathBuf,
    },

    /// Index was written by an incompatible version.
    #[error("index schema version mismatch: found {found}, expected {expected}")]
    SchemaMismatch {
        /// Version recorded in the index
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// A record seen during the date pre-pass is gone on replay.
    #[error("store record {0} disappeared during the run")]
    RecordVanished(u64),

    /// A blob frame exists but its bytes cannot be decoded.
    #[error("corrupted blob at offset {loc}: {reason}")]
    CorruptedBlob {
        /// Location token of the frame
        loc: u64,
        /// Description of the corruption
        reason: String,
    },

    /// Raw message bytes could not be parsed into a message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while encoding a stored value.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while decoding a stored value.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ReindexError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DestinationExists { .. } => {
                Some("Delete the index-reindexed directory first, then run the reindex again.")
            }
            Self::IndexLocked { .. } => {
                Some("Another reindex is writing to this directory. Wait for it or remove index-reindexed if it is dead.")
            }
            Self::StoreOpen { .. } => {
                Some("Check that --dir points at a mail directory containing a 'store' database.")
            }
            Self::RecordVanished(_) => {
                Some("The store was modified during the run. Stop other writers and reindex from scratch.")
            }
            Self::ConfigError(_) => Some("Fix or remove reindex.toml in the mail directory."),
            _ => None,
        }
    }

    /// True for per-message failures the driver counts and skips.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            Self::CorruptedBlob { .. } | Self::MalformedMessage(_)
        )
    }
}

/// Convenience Result type for reindex_core operations.
pub type Result<T> = std::result::Result<T, ReindexError>;

/// Wraps a store-side redb failure.
pub(crate) fn store_err(context: &str, e: impl std::fmt::Display) -> ReindexError {
    ReindexError::Store(format!("{}: {}", context, e))
}

/// Wraps an index-side redb failure.
pub(crate) fn index_err(context: &str, e: impl std::fmt::Display) -> ReindexError {
    ReindexError::Index(format!("{}: {}", context, e))
}
