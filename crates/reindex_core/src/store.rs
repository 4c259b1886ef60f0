//! Authoritative message store.
//!
//! The store maps store document ids to message metadata and owns the
//! store-id → index-id mapping. The reindexer only reads message records and
//! only writes mappings.

use crate::error::{store_err, ReindexError, Result};
use crate::types::{MessageInfo, StoreRecord};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTableMetadata, TableDefinition, TableError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the store database inside the store directory.
pub const STORE_DB_FILE: &str = "store.redb";

const MESSAGES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");
const INDEX_DOCIDS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("index_docids");

/// Read access to message records plus the id-mapping write channel.
pub trait MessageStore {
    /// Returns true if a record exists for `doc_id`.
    fn contains(&self, doc_id: u64) -> Result<bool>;

    /// Loads only the lightweight metadata for `doc_id`.
    fn load_info(&self, doc_id: u64) -> Result<Option<MessageInfo>>;

    /// Loads the full record for `doc_id`.
    fn load_record(&self, doc_id: u64) -> Result<Option<StoreRecord>>;

    /// Records which index document (if any) a store document became.
    fn write_index_mapping(&self, store_doc_id: u64, index_doc_id: Option<u64>) -> Result<()>;
}

/// On-disk encoding of one message record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    state: Vec<String>,
    labels: Vec<String>,
    date: Option<i64>,
    loc: u64,
}

impl StoredMessage {
    fn from_record(record: &StoreRecord) -> Self {
        Self {
            state: record.state.iter().cloned().collect(),
            labels: record.labels.iter().cloned().collect(),
            date: record.date.map(|d| d.timestamp()),
            loc: record.loc,
        }
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.date.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    fn into_record(self, doc_id: u64) -> StoreRecord {
        let date = self.date();
        StoreRecord {
            doc_id,
            state: self.state.into_iter().collect(),
            labels: self.labels.into_iter().collect(),
            date,
            loc: self.loc,
        }
    }
}

/// Message store backed by a redb database at `<store dir>/store.redb`.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Opens an existing store directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreOpen` if the database is missing or can't be opened.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(STORE_DB_FILE);
        if !path.exists() {
            return Err(ReindexError::StoreOpen {
                path,
                reason: "no store database".to_string(),
            });
        }

        let db = Database::open(&path).map_err(|e| ReindexError::StoreOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { db, path })
    }

    /// Creates an empty store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database can't be created.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(STORE_DB_FILE);

        let db = Database::create(&path).map_err(|e| ReindexError::StoreOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let write_txn = db
            .begin_write()
            .map_err(|e| store_err("Failed to begin write transaction", e))?;
        {
            write_txn
                .open_table(MESSAGES_TABLE)
                .map_err(|e| store_err("Failed to open messages table", e))?;
            write_txn
                .open_table(INDEX_DOCIDS_TABLE)
                .map_err(|e| store_err("Failed to open index_docids table", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| store_err("Failed to commit", e))?;

        Ok(Self { db, path })
    }

    /// Returns the path to the store database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a message record, replacing any record with the same id.
    pub fn insert_record(&self, record: &StoreRecord) -> Result<()> {
        let value = postcard::to_allocvec(&StoredMessage::from_record(record))
            .map_err(|e| ReindexError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| store_err("Failed to begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(MESSAGES_TABLE)
                .map_err(|e| store_err("Failed to open messages table", e))?;
            table
                .insert(record.doc_id, value.as_slice())
                .map_err(|e| store_err("Failed to insert message", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| store_err("Failed to commit", e))?;
        Ok(())
    }

    /// Looks up the recorded index id for a store id.
    ///
    /// `None` means the store id was never processed; `Some(None)` means it
    /// was processed but not indexed.
    pub fn index_mapping(&self, store_doc_id: u64) -> Result<Option<Option<u64>>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| store_err("Failed to begin read transaction", e))?;
        let table = match read_txn.open_table(INDEX_DOCIDS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(store_err("Failed to open index_docids table", e)),
        };

        match table
            .get(store_doc_id)
            .map_err(|e| store_err("Failed to get mapping", e))?
        {
            Some(bytes) => {
                let mapped: Option<u64> = postcard::from_bytes(bytes.value())
                    .map_err(|e| ReindexError::Deserialization(e.to_string()))?;
                Ok(Some(mapped))
            }
            None => Ok(None),
        }
    }

    /// Number of id mappings recorded.
    pub fn mapping_count(&self) -> Result<u64> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| store_err("Failed to begin read transaction", e))?;
        match read_txn.open_table(INDEX_DOCIDS_TABLE) {
            Ok(table) => table
                .len()
                .map_err(|e| store_err("Failed to count mappings", e)),
            Err(TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(store_err("Failed to open index_docids table", e)),
        }
    }

    fn load_stored(&self, doc_id: u64) -> Result<Option<StoredMessage>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| store_err("Failed to begin read transaction", e))?;
        let table = read_txn
            .open_table(MESSAGES_TABLE)
            .map_err(|e| store_err("Failed to open messages table", e))?;

        match table
            .get(doc_id)
            .map_err(|e| store_err("Failed to get message", e))?
        {
            Some(bytes) => {
                let stored: StoredMessage = postcard::from_bytes(bytes.value())
                    .map_err(|e| ReindexError::Deserialization(e.to_string()))?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }
}

impl MessageStore for RedbStore {
    fn contains(&self, doc_id: u64) -> Result<bool> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| store_err("Failed to begin read transaction", e))?;
        let table = read_txn
            .open_table(MESSAGES_TABLE)
            .map_err(|e| store_err("Failed to open messages table", e))?;
        let found = table
            .get(doc_id)
            .map_err(|e| store_err("Failed to get message", e))?
            .is_some();
        Ok(found)
    }

    fn load_info(&self, doc_id: u64) -> Result<Option<MessageInfo>> {
        Ok(self
            .load_stored(doc_id)?
            .map(|stored| MessageInfo { date: stored.date() }))
    }

    fn load_record(&self, doc_id: u64) -> Result<Option<StoreRecord>> {
        Ok(self
            .load_stored(doc_id)?
            .map(|stored| stored.into_record(doc_id)))
    }

    fn write_index_mapping(&self, store_doc_id: u64, index_doc_id: Option<u64>) -> Result<()> {
        let value = postcard::to_allocvec(&index_doc_id)
            .map_err(|e| ReindexError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| store_err("Failed to begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(INDEX_DOCIDS_TABLE)
                .map_err(|e| store_err("Failed to open index_docids table", e))?;
            table
                .insert(store_doc_id, value.as_slice())
                .map_err(|e| store_err("Failed to insert mapping", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| store_err("Failed to commit", e))?;
        Ok(())
    }
}
