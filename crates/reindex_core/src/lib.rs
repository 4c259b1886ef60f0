//! Reindex Core Library
//!
//! Rebuilds the full-text search index of a mail directory by replaying the
//! authoritative message store into a fresh index:
//! - Store records are read by id, never modified
//! - Raw messages are decoded from the zstd blob file and parsed
//! - Deleted and spam messages are skipped unless the policy allows them
//! - Every processed id gets an entry in the store's id mapping
//!
//! # Quick Start
//!
//! ```
//! use reindex_core::{
//!     BlobWriter, Classifier, IndexPolicy, IterationStrategy, MailDir, MessageBlobs,
//!     MimeParser, Progress, RedbIndex, RedbStore, Reindexer, RunOptions, StoreRecord,
//! };
//! use std::collections::BTreeSet;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let dir = MailDir::new(tmp.path());
//!
//! // One message in the blob file, one record pointing at it
//! let mut writer = BlobWriter::open(dir.messages_path()).unwrap();
//! let loc = writer
//!     .append(b"From: ann@example.com\r\nSubject: hello\r\n\r\nhi there")
//!     .unwrap();
//! drop(writer);
//!
//! let store = RedbStore::create(dir.store_dir()).unwrap();
//! store
//!     .insert_record(&StoreRecord {
//!         doc_id: 1,
//!         state: BTreeSet::new(),
//!         labels: BTreeSet::from(["inbox".to_string()]),
//!         date: None,
//!         loc,
//!     })
//!     .unwrap();
//!
//! dir.ensure_fresh_destination().unwrap();
//! let mut index = RedbIndex::create(dir.index_dir(), 1000).unwrap();
//! let blobs = MessageBlobs::open(dir.messages_path()).unwrap();
//! let classifier = Classifier::new(blobs, MimeParser, IndexPolicy::default());
//!
//! let stats = Reindexer::new(&store, &mut index, RunOptions::default())
//!     .run(IterationStrategy::Sequential, &classifier, &mut |_: &Progress| {})
//!     .unwrap();
//!
//! assert_eq!(stats.indexed, 1);
//! assert_eq!(index.lookup_term("subject", "hello").unwrap(), vec![1]);
//! assert_eq!(store.index_mapping(1).unwrap(), Some(Some(1)));
//! ```

mod blobs;
mod classification;
mod config;
mod error;
mod index;
mod layout;
mod parser;
mod reindex;
mod store;
mod strategy;
mod types;

pub use blobs::{BlobReader, BlobWriter, MessageBlobs};
pub use classification::Classifier;
pub use config::{Config, IndexConfig, ProgressConfig, CONFIG_FILE_NAME};
pub use error::{ReindexError, Result};
pub use index::{RedbIndex, SearchIndex, INDEX_DB_FILE, INDEX_SCHEMA_VERSION};
pub use layout::MailDir;
pub use parser::{MessageParser, MimeParser};
pub use reindex::{Progress, Reindexer, RunOptions, RunStats};
pub use store::{MessageStore, RedbStore, STORE_DB_FILE};
pub use strategy::{load_dates, DocIdSequence, IterationStrategy};
pub use types::*;

use std::time::{Duration, Instant};

/// Monotonic clock used for progress timing.
///
/// Readings only need to be comparable with each other. Tests inject a
/// closure to control time.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

impl<F> Clock for F
where
    F: Fn() -> Duration,
{
    fn now(&self) -> Duration {
        self()
    }
}

/// Wall clock measuring from its own creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Starts a clock reading zero now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
