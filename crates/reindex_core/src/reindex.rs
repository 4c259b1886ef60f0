//! The reindex driver.
//!
//! Replays store documents into a fresh search index in the order chosen by
//! an [`IterationStrategy`], recording the store-id → index-id mapping for
//! every processed document and reporting progress at a bounded rate.

use crate::blobs::BlobReader;
use crate::classification::Classifier;
use crate::error::{ReindexError, Result};
use crate::index::SearchIndex;
use crate::parser::MessageParser;
use crate::store::MessageStore;
use crate::strategy::IterationStrategy;
use crate::types::{Classification, SkipReason};
use crate::{Clock, SystemClock};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Knobs for one reindex run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many store documents (skipped ones included).
    pub limit: Option<u64>,
    /// Minimum time between progress reports.
    pub progress_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: None,
            progress_interval: Duration::from_secs(5),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Store documents handled, whatever the outcome.
    pub processed: u64,
    /// Documents added to the index.
    pub indexed: u64,
    /// Documents skipped as deleted.
    pub deleted: u64,
    /// Documents skipped as spam.
    pub spam: u64,
    /// Documents whose raw bytes couldn't be decoded or parsed.
    pub malformed: u64,
    /// Clock reading when the run started.
    pub started_at: Duration,
    /// Clock reading of the last progress report (or the start).
    pub last_report: Duration,
    /// Time spent so far.
    pub elapsed: Duration,
}

impl RunStats {
    fn new(now: Duration) -> Self {
        Self {
            started_at: now,
            last_report: now,
            ..Self::default()
        }
    }

    /// Snapshot suitable for reporting.
    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed,
            indexed: self.indexed,
            deleted: self.deleted,
            spam: self.spam,
            malformed: self.malformed,
            elapsed: self.elapsed,
        }
    }
}

/// Point-in-time view of a run, printed as a progress or summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Store documents handled.
    pub processed: u64,
    /// Documents indexed.
    pub indexed: u64,
    /// Deleted documents skipped.
    pub deleted: u64,
    /// Spam documents skipped.
    pub spam: u64,
    /// Malformed documents skipped.
    pub malformed: u64,
    /// Time since the run started.
    pub elapsed: Duration,
}

impl Progress {
    /// Indexed messages per second; zero before any time has passed.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.indexed as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} indexed, {} spam skipped, {} deleted skipped, {} malformed in {:.1}s ({:.1} m/s)",
            self.indexed,
            self.spam,
            self.deleted,
            self.malformed,
            self.elapsed.as_secs_f64(),
            self.rate()
        )
    }
}

/// Drives one reindex run from a store into an index.
///
/// One `Reindexer` is one run: the counters it returns are not reset or
/// reused.
pub struct Reindexer<'a, S: ?Sized, I: ?Sized> {
    store: &'a S,
    index: &'a mut I,
    options: RunOptions,
    clock: Box<dyn Clock + 'a>,
}

impl<'a, S, I> Reindexer<'a, S, I>
where
    S: MessageStore + ?Sized,
    I: SearchIndex + ?Sized,
{
    /// Creates a driver reading `store` and writing `index`.
    pub fn new(store: &'a S, index: &'a mut I, options: RunOptions) -> Self {
        Self {
            store,
            index,
            options,
            clock: Box::new(SystemClock::new()),
        }
    }

    /// Replaces the wall clock used for progress timing.
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Runs the reindex to completion or to the configured limit.
    ///
    /// `on_progress` is called whenever more than the progress interval has
    /// passed since the previous report. The final summary is left to the
    /// caller via [`RunStats::progress`].
    ///
    /// # Errors
    ///
    /// Store, blob I/O and index failures abort the run. Per-message
    /// problems never do.
    pub fn run<B, P>(
        mut self,
        strategy: IterationStrategy,
        classifier: &Classifier<B, P>,
        on_progress: &mut dyn FnMut(&Progress),
    ) -> Result<RunStats>
    where
        B: BlobReader,
        P: MessageParser,
    {
        let mut stats = RunStats::new(self.clock.now());
        info!(
            ?strategy,
            limit = ?self.options.limit,
            policy = ?classifier.policy(),
            "Starting reindex"
        );

        let mut ids = strategy.doc_ids(self.store)?;
        if let Some(total) = ids.known_len() {
            info!(total, "Replaying store in date order");
        }

        loop {
            if self.limit_reached(&stats) {
                info!(processed = stats.processed, "Processing limit reached");
                break;
            }
            let Some(next) = ids.next() else {
                break;
            };
            let store_doc_id = next?;

            self.process(store_doc_id, classifier, &mut stats)?;

            let now = self.clock.now();
            stats.elapsed = now.saturating_sub(stats.started_at);
            if now.saturating_sub(stats.last_report) > self.options.progress_interval {
                on_progress(&stats.progress());
                stats.last_report = now;
            }
        }

        self.index.flush()?;
        stats.elapsed = self.clock.now().saturating_sub(stats.started_at);
        info!(
            processed = stats.processed,
            indexed = stats.indexed,
            spam = stats.spam,
            deleted = stats.deleted,
            malformed = stats.malformed,
            "Reindex finished"
        );
        Ok(stats)
    }

    fn limit_reached(&self, stats: &RunStats) -> bool {
        self.options
            .limit
            .is_some_and(|limit| stats.processed >= limit)
    }

    fn process<B, P>(
        &mut self,
        store_doc_id: u64,
        classifier: &Classifier<B, P>,
        stats: &mut RunStats,
    ) -> Result<()>
    where
        B: BlobReader,
        P: MessageParser,
    {
        let record = self
            .store
            .load_record(store_doc_id)?
            .ok_or(ReindexError::RecordVanished(store_doc_id))?;

        let index_doc_id = match classifier.classify(&record)? {
            Classification::Indexed { entry, labels } => {
                let index_doc_id = self.index.add_entry(&entry)?;
                for label in &labels {
                    self.index.add_label(index_doc_id, label)?;
                }
                debug!(store_doc_id, index_doc_id, "Indexed message");
                stats.indexed += 1;
                Some(index_doc_id)
            }
            Classification::Skipped(SkipReason::Deleted) => {
                stats.deleted += 1;
                None
            }
            Classification::Skipped(SkipReason::Spam) => {
                stats.spam += 1;
                None
            }
            Classification::Malformed { reason } => {
                warn!(store_doc_id, %reason, "Skipping malformed message");
                stats.malformed += 1;
                None
            }
        };

        self.store.write_index_mapping(store_doc_id, index_doc_id)?;
        stats.processed += 1;
        Ok(())
    }
}
