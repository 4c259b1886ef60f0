//! Raw-message blob file.
//!
//! The blob file is an append-only sequence of frames:
//!
//! ```text
//! [u32 LE compressed length][zstd-compressed message bytes]
//! ```
//!
//! A message's location token is the byte offset of its frame header.

use crate::error::{ReindexError, Result};
use crate::types::RawMessage;
use fs2::FileExt;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Maximum compressed size accepted for a single frame (100 MB).
const MAX_FRAME_SIZE: u32 = 100 * 1024 * 1024;

/// Zstd compression level for appended frames.
const COMPRESSION_LEVEL: i32 = 3;

/// Fetches raw message bytes by location token.
pub trait BlobReader {
    /// Reads the message stored at `loc`.
    ///
    /// # Errors
    ///
    /// `CorruptedBlob` if the frame can't be decoded; `Io` if the file can't
    /// be read at all.
    fn read(&self, loc: u64) -> Result<RawMessage>;
}

/// Read handle on the blob file, held under a shared lock.
pub struct MessageBlobs {
    file: RefCell<File>,
    path: PathBuf,
}

impl MessageBlobs {
    /// Opens the blob file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        FileExt::try_lock_shared(&file)?;
        Ok(Self {
            file: RefCell::new(file),
            path,
        })
    }

    /// Returns the path of the blob file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobReader for MessageBlobs {
    fn read(&self, loc: u64) -> Result<RawMessage> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(loc))?;

        let mut header = [0u8; 4];
        file.read_exact(&mut header)
            .map_err(|e| frame_read_error(loc, "frame header", e))?;
        let len = u32::from_le_bytes(header);
        if len > MAX_FRAME_SIZE {
            return Err(ReindexError::CorruptedBlob {
                loc,
                reason: format!("frame length {} exceeds limit of {}", len, MAX_FRAME_SIZE),
            });
        }

        let mut compressed = vec![0u8; len as usize];
        file.read_exact(&mut compressed)
            .map_err(|e| frame_read_error(loc, "frame payload", e))?;

        let bytes = zstd::decode_all(compressed.as_slice()).map_err(|e| {
            ReindexError::CorruptedBlob {
                loc,
                reason: format!("decompression failed: {}", e),
            }
        })?;

        Ok(RawMessage::new(bytes))
    }
}

/// A short read means the frame is cut off; anything else is an I/O failure.
fn frame_read_error(loc: u64, what: &str, e: std::io::Error) -> ReindexError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ReindexError::CorruptedBlob {
            loc,
            reason: format!("truncated {}", what),
        }
    } else {
        ReindexError::Io(e)
    }
}

/// Appends frames to a blob file.
pub struct BlobWriter {
    file: File,
    offset: u64,
}

impl BlobWriter {
    /// Opens (or creates) the blob file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        FileExt::try_lock_exclusive(&file)?;
        let offset = file.metadata()?.len();
        Ok(Self { file, offset })
    }

    /// Appends one message and returns its location token.
    pub fn append(&mut self, raw: &[u8]) -> Result<u64> {
        let compressed = zstd::encode_all(raw, COMPRESSION_LEVEL)?;
        let len = u32::try_from(compressed.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_SIZE)
            .ok_or_else(|| {
                ReindexError::Serialization(format!(
                    "message compresses to {} bytes, over the frame limit",
                    compressed.len()
                ))
            })?;

        let loc = self.offset;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&compressed)?;
        self.offset += 4 + compressed.len() as u64;
        Ok(loc)
    }

    /// Flushes appended frames to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
