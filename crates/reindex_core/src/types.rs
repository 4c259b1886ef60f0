//! Core data types for the reindex pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// State flag marking a message the user deleted.
pub const STATE_DELETED: &str = "deleted";

/// State flag marking a message classified as spam.
pub const STATE_SPAM: &str = "spam";

/// One message as the store knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    /// Store document id, contiguous from 1.
    pub doc_id: u64,
    /// State flags such as `deleted` and `spam`.
    pub state: BTreeSet<String>,
    /// User and system labels.
    pub labels: BTreeSet<String>,
    /// Message date, absent on malformed messages.
    pub date: Option<DateTime<Utc>>,
    /// Location token of the raw bytes in the blob file.
    pub loc: u64,
}

impl StoreRecord {
    /// Returns true if the record carries the given state flag.
    pub fn has_state(&self, flag: &str) -> bool {
        self.state.contains(flag)
    }
}

/// Lightweight per-message metadata, loadable without touching blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    /// Message date, if the store has one.
    pub date: Option<DateTime<Utc>>,
}

/// Raw message bytes as read from the blob file.
///
/// Deliberately offers no conversion to text: only [`crate::MessageParser`]
/// turns these bytes into strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(Vec<u8>);

impl RawMessage {
    /// Wraps bytes read from a blob frame.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The undecoded payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A mailbox from an address header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, if present.
    pub name: Option<String>,
    /// The address itself.
    pub email: String,
}

impl Address {
    /// Text indexed for this address: display name followed by the address.
    pub fn indexable_text(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{} {}", name, self.email),
            _ => self.email.clone(),
        }
    }
}

/// Structured view of a message produced by a [`crate::MessageParser`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// First `From:` mailbox.
    pub from: Option<Address>,
    /// `To:`, `Cc:` and `Bcc:` mailboxes, in that order.
    pub recipients: Vec<Address>,
    /// Decoded subject line.
    pub subject: String,
    /// Parsed `Date:` header.
    pub date: Option<DateTime<Utc>>,
    /// Extracted body text.
    pub body: String,
}

/// Searchable fields submitted to the index for one message.
///
/// The default value is the empty entry: every field blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexableEntry {
    /// Lowercased sender text.
    pub from: String,
    /// Lowercased recipient text, space separated.
    pub to: String,
    /// Lowercased subject.
    pub subject: String,
    /// Lowercased body text.
    pub body: String,
    /// Unix timestamp as a decimal string, or empty.
    pub date: String,
}

impl IndexableEntry {
    /// Builds an entry from a parsed message.
    ///
    /// `fallback_date` is used when the message has no parsable `Date:` header.
    pub fn from_parsed(message: &ParsedMessage, fallback_date: Option<DateTime<Utc>>) -> Self {
        let from = message
            .from
            .as_ref()
            .map(Address::indexable_text)
            .unwrap_or_default();
        let to = message
            .recipients
            .iter()
            .map(Address::indexable_text)
            .collect::<Vec<_>>()
            .join(" ");
        let date = message
            .date
            .or(fallback_date)
            .map(|d| d.timestamp().to_string())
            .unwrap_or_default();

        Self {
            from: from.to_lowercase(),
            to: to.to_lowercase(),
            subject: message.subject.to_lowercase(),
            body: message.body.to_lowercase(),
            date,
        }
    }

    /// True for the empty entry.
    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
            && self.to.is_empty()
            && self.subject.is_empty()
            && self.body.is_empty()
            && self.date.is_empty()
    }

    /// Text fields paired with their index field names.
    pub fn text_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("from", &self.from),
            ("to", &self.to),
            ("subject", &self.subject),
            ("body", &self.body),
        ]
    }
}

/// Which excluded-by-default messages are indexed anyway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexPolicy {
    /// Index messages carrying the `deleted` state.
    pub index_deleted: bool,
    /// Index messages carrying the `spam` state.
    pub index_spam: bool,
}

/// Why a record was left out of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Record is deleted and the policy excludes deleted messages.
    Deleted,
    /// Record is spam and the policy excludes spam.
    Spam,
}

/// Result of classifying one store record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Record goes into the index with these labels.
    Indexed {
        /// Searchable fields.
        entry: IndexableEntry,
        /// `labels ∪ state` of the record.
        labels: BTreeSet<String>,
    },
    /// Record excluded by policy.
    Skipped(SkipReason),
    /// Raw bytes could not be decoded or parsed.
    Malformed {
        /// What went wrong.
        reason: String,
    },
}
