//! Full-text search index being rebuilt.
//!
//! Documents get their own ids (1, 2, 3, … in insertion order), independent
//! of store ids. Text fields are tokenised into postings keyed by
//! `field\0term`; labels map to the set of documents carrying them. All
//! tables live in one redb database inside the index directory.

use crate::error::{index_err, ReindexError, Result};
use crate::types::IndexableEntry;
use fs2::FileExt;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Index schema version for migration support.
pub const INDEX_SCHEMA_VERSION: u64 = 1;

/// File name of the index database inside the index directory.
pub const INDEX_DB_FILE: &str = "index.redb";

const LOCK_FILE: &str = "LOCK";

// Table definitions
const METADATA_TABLE: TableDefinition<&str, u64> = TableDefinition::new("metadata");
const DOCUMENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("documents");
const POSTINGS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("postings");
const LABELS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("labels");

/// Write side of the search index used by the reindex driver.
pub trait SearchIndex {
    /// Adds a document and returns its new index id.
    fn add_entry(&mut self, entry: &IndexableEntry) -> Result<u64>;

    /// Attaches a label to an indexed document.
    fn add_label(&mut self, doc_id: u64, label: &str) -> Result<()>;

    /// Makes everything added so far durable.
    fn flush(&mut self) -> Result<()>;
}

/// Encode posting key: field_utf8 + NUL + term_utf8.
fn encode_term_key(field: &str, term: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(field.len() + 1 + term.len());
    key.extend_from_slice(field.as_bytes());
    key.push(0);
    key.extend_from_slice(term.as_bytes());
    key
}

/// Splits text on anything that isn't alphanumeric.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Postings, documents and labels not yet written to disk.
#[derive(Default)]
struct PendingBatch {
    documents: BTreeMap<u64, IndexableEntry>,
    postings: BTreeMap<Vec<u8>, BTreeSet<u64>>,
    labels: BTreeMap<String, BTreeSet<u64>>,
}

impl PendingBatch {
    fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.postings.is_empty() && self.labels.is_empty()
    }
}

/// Search index stored at `<dir>/index.redb`.
///
/// Writes are buffered and committed in one transaction every `flush_every`
/// documents and on [`SearchIndex::flush`]. Read methods only see flushed
/// data. The directory is held under an exclusive lock for the lifetime of
/// the handle.
pub struct RedbIndex {
    db: Database,
    path: PathBuf,
    next_doc_id: u64,
    flush_every: usize,
    pending: PendingBatch,
    _lock: File,
}

impl RedbIndex {
    /// Creates a new index in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `DestinationExists` if `dir` already holds an index database,
    /// `IndexLocked` if another process holds the directory.
    pub fn create(dir: impl AsRef<Path>, flush_every: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let lock = lock_dir(&dir)?;

        let db_path = dir.join(INDEX_DB_FILE);
        if db_path.exists() {
            return Err(ReindexError::DestinationExists { path: dir });
        }

        let db = Database::create(&db_path).map_err(|e| index_err("Failed to create index", e))?;

        // Initialize schema version
        let write_txn = db
            .begin_write()
            .map_err(|e| index_err("Failed to begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(METADATA_TABLE)
                .map_err(|e| index_err("Failed to open metadata table", e))?;
            table
                .insert("version", INDEX_SCHEMA_VERSION)
                .map_err(|e| index_err("Failed to insert version", e))?;
            table
                .insert("next_doc_id", 1u64)
                .map_err(|e| index_err("Failed to insert next_doc_id", e))?;
            write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| index_err("Failed to open documents table", e))?;
            write_txn
                .open_table(POSTINGS_TABLE)
                .map_err(|e| index_err("Failed to open postings table", e))?;
            write_txn
                .open_table(LABELS_TABLE)
                .map_err(|e| index_err("Failed to open labels table", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| index_err("Failed to commit", e))?;

        Ok(Self {
            db,
            path: dir,
            next_doc_id: 1,
            flush_every: flush_every.max(1),
            pending: PendingBatch::default(),
            _lock: lock,
        })
    }

    /// Opens an existing index.
    ///
    /// Returns `None` if the directory holds no index database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database can't be opened, is locked, or has a
    /// schema version mismatch.
    pub fn open(dir: impl AsRef<Path>, flush_every: usize) -> Result<Option<Self>> {
        let dir = dir.as_ref().to_path_buf();
        let db_path = dir.join(INDEX_DB_FILE);
        if !db_path.exists() {
            return Ok(None);
        }
        let lock = lock_dir(&dir)?;

        let db = Database::open(&db_path).map_err(|e| index_err("Failed to open index", e))?;

        let (version, next_doc_id) = {
            let read_txn = db
                .begin_read()
                .map_err(|e| index_err("Failed to begin read transaction", e))?;
            let table = read_txn
                .open_table(METADATA_TABLE)
                .map_err(|e| index_err("Failed to open metadata table", e))?;
            let version = table
                .get("version")
                .map_err(|e| index_err("Failed to get version", e))?
                .map(|v| v.value())
                .unwrap_or(0);
            let next_doc_id = table
                .get("next_doc_id")
                .map_err(|e| index_err("Failed to get next_doc_id", e))?
                .map(|v| v.value())
                .unwrap_or(1);
            (version, next_doc_id)
        };

        if version != INDEX_SCHEMA_VERSION {
            return Err(ReindexError::SchemaMismatch {
                found: version as u32,
                expected: INDEX_SCHEMA_VERSION as u32,
            });
        }

        Ok(Some(Self {
            db,
            path: dir,
            next_doc_id,
            flush_every: flush_every.max(1),
            pending: PendingBatch::default(),
            _lock: lock,
        }))
    }

    /// Returns the index directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of flushed documents.
    pub fn num_docs(&self) -> Result<u64> {
        let read_txn = self.begin_read()?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(|e| index_err("Failed to open documents table", e))?;
        table
            .len()
            .map_err(|e| index_err("Failed to count documents", e))
    }

    /// Returns the stored fields of a flushed document.
    pub fn document(&self, doc_id: u64) -> Result<Option<IndexableEntry>> {
        let read_txn = self.begin_read()?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(|e| index_err("Failed to open documents table", e))?;

        match table
            .get(doc_id)
            .map_err(|e| index_err("Failed to get document", e))?
        {
            Some(bytes) => {
                let entry: IndexableEntry = postcard::from_bytes(bytes.value())
                    .map_err(|e| ReindexError::Deserialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Documents whose `field` contains `term` (exact, lowercase), ascending.
    pub fn lookup_term(&self, field: &str, term: &str) -> Result<Vec<u64>> {
        let key = encode_term_key(field, term);
        let read_txn = self.begin_read()?;
        let table = read_txn
            .open_table(POSTINGS_TABLE)
            .map_err(|e| index_err("Failed to open postings table", e))?;

        match table
            .get(key.as_slice())
            .map_err(|e| index_err("Failed to get postings", e))?
        {
            Some(bytes) => postcard::from_bytes(bytes.value())
                .map_err(|e| ReindexError::Deserialization(e.to_string())),
            None => Ok(vec![]),
        }
    }

    /// Documents carrying `label`, ascending.
    pub fn docs_with_label(&self, label: &str) -> Result<Vec<u64>> {
        let read_txn = self.begin_read()?;
        let table = read_txn
            .open_table(LABELS_TABLE)
            .map_err(|e| index_err("Failed to open labels table", e))?;

        match table
            .get(label)
            .map_err(|e| index_err("Failed to get label", e))?
        {
            Some(bytes) => postcard::from_bytes(bytes.value())
                .map_err(|e| ReindexError::Deserialization(e.to_string())),
            None => Ok(vec![]),
        }
    }

    /// Write the pending batch in a single transaction.
    fn write_batch(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let write_txn = self.begin_write()?;

        // Write documents
        {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| index_err("Failed to open documents table", e))?;
            for (doc_id, entry) in &batch.documents {
                let value = postcard::to_allocvec(entry)
                    .map_err(|e| ReindexError::Serialization(e.to_string()))?;
                table
                    .insert(*doc_id, value.as_slice())
                    .map_err(|e| index_err("Failed to insert document", e))?;
            }
        }

        // Merge postings
        {
            let mut table = write_txn
                .open_table(POSTINGS_TABLE)
                .map_err(|e| index_err("Failed to open postings table", e))?;
            for (key, ids) in &batch.postings {
                let mut merged: BTreeSet<u64> = table
                    .get(key.as_slice())
                    .map_err(|e| index_err("Failed to get postings", e))?
                    .map(|v| postcard::from_bytes::<Vec<u64>>(v.value()))
                    .transpose()
                    .map_err(|e| ReindexError::Deserialization(e.to_string()))?
                    .unwrap_or_default()
                    .into_iter()
                    .collect();
                merged.extend(ids);
                let value = postcard::to_allocvec(&merged.into_iter().collect::<Vec<_>>())
                    .map_err(|e| ReindexError::Serialization(e.to_string()))?;
                table
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(|e| index_err("Failed to insert postings", e))?;
            }
        }

        // Merge labels
        {
            let mut table = write_txn
                .open_table(LABELS_TABLE)
                .map_err(|e| index_err("Failed to open labels table", e))?;
            for (label, ids) in &batch.labels {
                let mut merged: BTreeSet<u64> = table
                    .get(label.as_str())
                    .map_err(|e| index_err("Failed to get label", e))?
                    .map(|v| postcard::from_bytes::<Vec<u64>>(v.value()))
                    .transpose()
                    .map_err(|e| ReindexError::Deserialization(e.to_string()))?
                    .unwrap_or_default()
                    .into_iter()
                    .collect();
                merged.extend(ids);
                let value = postcard::to_allocvec(&merged.into_iter().collect::<Vec<_>>())
                    .map_err(|e| ReindexError::Serialization(e.to_string()))?;
                table
                    .insert(label.as_str(), value.as_slice())
                    .map_err(|e| index_err("Failed to insert label", e))?;
            }
        }

        {
            let mut table = write_txn
                .open_table(METADATA_TABLE)
                .map_err(|e| index_err("Failed to open metadata table", e))?;
            table
                .insert("next_doc_id", self.next_doc_id)
                .map_err(|e| index_err("Failed to update next_doc_id", e))?;
        }

        write_txn
            .commit()
            .map_err(|e| index_err("Failed to commit", e))?;
        Ok(())
    }

    /// Helper to begin a read transaction.
    fn begin_read(&self) -> Result<redb::ReadTransaction> {
        self.db
            .begin_read()
            .map_err(|e| index_err("Failed to begin read transaction", e))
    }

    fn begin_write(&self) -> Result<redb::WriteTransaction> {
        self.db
            .begin_write()
            .map_err(|e| index_err("Failed to begin write transaction", e))
    }
}

impl SearchIndex for RedbIndex {
    fn add_entry(&mut self, entry: &IndexableEntry) -> Result<u64> {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        for (field, text) in entry.text_fields() {
            for term in tokenize(text) {
                self.pending
                    .postings
                    .entry(encode_term_key(field, term))
                    .or_default()
                    .insert(doc_id);
            }
        }
        if !entry.date.is_empty() {
            self.pending
                .postings
                .entry(encode_term_key("date", &entry.date))
                .or_default()
                .insert(doc_id);
        }
        self.pending.documents.insert(doc_id, entry.clone());

        if self.pending.documents.len() >= self.flush_every {
            self.write_batch()?;
        }
        Ok(doc_id)
    }

    fn add_label(&mut self, doc_id: u64, label: &str) -> Result<()> {
        if doc_id == 0 || doc_id >= self.next_doc_id {
            return Err(ReindexError::Index(format!(
                "cannot label unknown document {}",
                doc_id
            )));
        }
        self.pending
            .labels
            .entry(label.to_string())
            .or_default()
            .insert(doc_id);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.write_batch()
    }
}

fn lock_dir(dir: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))?;
    file.try_lock_exclusive()
        .map_err(|_| ReindexError::IndexLocked {
            path: dir.to_path_buf(),
        })?;
    Ok(file)
}
