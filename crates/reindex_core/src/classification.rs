//! Per-message classification.
//!
//! Decides whether a store record is indexed and builds its searchable
//! fields. The classifier holds no mutable state, so classifying the same
//! record twice under the same policy gives the same answer.

use crate::blobs::BlobReader;
use crate::error::Result;
use crate::parser::MessageParser;
use crate::types::{
    Classification, IndexPolicy, IndexableEntry, SkipReason, StoreRecord, STATE_DELETED,
    STATE_SPAM,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Classifies store records against an [`IndexPolicy`].
pub struct Classifier<B, P> {
    blobs: B,
    parser: P,
    policy: IndexPolicy,
}

impl<B: BlobReader, P: MessageParser> Classifier<B, P> {
    /// Creates a classifier reading raw bytes from `blobs`.
    pub fn new(blobs: B, parser: P, policy: IndexPolicy) -> Self {
        Self {
            blobs,
            parser,
            policy,
        }
    }

    /// Returns the policy in effect.
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// Classifies one record.
    ///
    /// Deleted is checked before spam, so a record carrying both flags under
    /// the default policy is reported as deleted.
    ///
    /// # Errors
    ///
    /// Only fatal failures escape: blob I/O errors and the like. Corrupted
    /// frames and unparsable messages come back as `Classification::Malformed`.
    pub fn classify(&self, record: &StoreRecord) -> Result<Classification> {
        if let Some(reason) = skip_reason(record, self.policy) {
            debug!(doc_id = record.doc_id, ?reason, "Skipping record");
            return Ok(Classification::Skipped(reason));
        }

        let parsed = self
            .blobs
            .read(record.loc)
            .and_then(|raw| self.parser.parse(&raw));

        let message = match parsed {
            Ok(message) => message,
            Err(e) if e.is_per_message() => {
                return Ok(Classification::Malformed {
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        let entry = IndexableEntry::from_parsed(&message, record.date);
        let labels: BTreeSet<String> = record.labels.union(&record.state).cloned().collect();

        Ok(Classification::Indexed { entry, labels })
    }
}

fn skip_reason(record: &StoreRecord, policy: IndexPolicy) -> Option<SkipReason> {
    if record.has_state(STATE_DELETED) && !policy.index_deleted {
        Some(SkipReason::Deleted)
    } else if record.has_state(STATE_SPAM) && !policy.index_spam {
        Some(SkipReason::Spam)
    } else {
        None
    }
}
