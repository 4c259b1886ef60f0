//! Order in which store documents are replayed into the index.

use crate::error::Result;
use crate::store::MessageStore;
use chrono::{DateTime, Utc};
use tracing::info;

/// How store ids are ordered for replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IterationStrategy {
    /// Ascending store id, no pre-pass.
    #[default]
    Sequential,
    /// Ascending message date after a pre-pass that loads every date.
    DateSorted,
}

impl IterationStrategy {
    /// Produces the id sequence for `store`.
    ///
    /// `DateSorted` runs its whole pre-pass here, so errors from the store
    /// during that pass surface from this call.
    pub fn doc_ids<'a, S: MessageStore + ?Sized>(
        &self,
        store: &'a S,
    ) -> Result<DocIdSequence<'a, S>> {
        match self {
            Self::Sequential => Ok(DocIdSequence::Sequential {
                store,
                next: 1,
                done: false,
            }),
            Self::DateSorted => {
                let mut dated = load_dates(store)?;
                // Stable: equal dates keep ascending doc id order.
                dated.sort_by_key(|(_, date)| *date);
                Ok(DocIdSequence::Sorted(
                    dated
                        .into_iter()
                        .map(|(doc_id, _)| doc_id)
                        .collect::<Vec<_>>()
                        .into_iter(),
                ))
            }
        }
    }
}

/// Loads `(doc_id, date)` for ids 1.. until the first missing id.
///
/// Only metadata is read; raw message bytes are never fetched.
pub fn load_dates<S: MessageStore + ?Sized>(
    store: &S,
) -> Result<Vec<(u64, Option<DateTime<Utc>>)>> {
    let mut dated = Vec::new();
    let mut doc_id = 1;
    while let Some(info) = store.load_info(doc_id)? {
        dated.push((doc_id, info.date));
        doc_id += 1;
    }
    info!(count = dated.len(), "Loaded message dates");
    Ok(dated)
}

/// Lazily yields store ids in replay order.
pub enum DocIdSequence<'a, S: ?Sized> {
    /// Probes the store for each next id.
    Sequential {
        /// Store being scanned.
        store: &'a S,
        /// Next id to look up.
        next: u64,
        /// Set once the end-of-store sentinel (or an error) is hit.
        done: bool,
    },
    /// Ids precomputed by the date pre-pass.
    Sorted(std::vec::IntoIter<u64>),
}

impl<S: ?Sized> DocIdSequence<'_, S> {
    /// Number of ids left, when known up front.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            Self::Sequential { .. } => None,
            Self::Sorted(ids) => Some(ids.len()),
        }
    }
}

impl<S: MessageStore + ?Sized> Iterator for DocIdSequence<'_, S> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Sequential { store, next, done } => {
                if *done {
                    return None;
                }
                match store.contains(*next) {
                    Ok(true) => {
                        let doc_id = *next;
                        *next += 1;
                        Some(Ok(doc_id))
                    }
                    Ok(false) => {
                        *done = true;
                        None
                    }
                    Err(e) => {
                        *done = true;
                        Some(Err(e))
                    }
                }
            }
            Self::Sorted(ids) => ids.next().map(Ok),
        }
    }
}
