use super::assertions::Assertion;
use super::clock::MockClock;
use super::workspace::{MailFixture, MessageSpec};
use anyhow::{anyhow, bail, ensure, Result};
use reindex_core::{
    Classifier, Config, IndexPolicy, IterationStrategy, MessageBlobs, MimeParser, Progress,
    RedbIndex, RedbStore, ReindexError, Reindexer, RunOptions, RunStats,
};
use std::time::Duration;

/// Knobs a scenario sets before the run
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub strategy: IterationStrategy,
    pub policy: IndexPolicy,
    pub limit: Option<u64>,
    pub clock_step: Duration,
    pub skip_store: bool,
}

/// Executes a reindex against a real on-disk mail directory
pub struct ScenarioRunner {
    fixture: MailFixture,
    settings: RunSettings,
    clock: MockClock,
    outcome: Option<std::result::Result<RunStats, ReindexError>>,
    reports: Vec<Progress>,
    store: Option<RedbStore>,
    index: Option<RedbIndex>,
}

impl ScenarioRunner {
    /// Create a runner over a freshly seeded fixture
    pub fn new(messages: &[MessageSpec], settings: RunSettings) -> Result<Self> {
        let fixture = if settings.skip_store {
            MailFixture::empty()?
        } else {
            MailFixture::with_messages(messages)?
        };
        let clock = MockClock::stepping(settings.clock_step);

        Ok(Self {
            fixture,
            settings,
            clock,
            outcome: None,
            reports: Vec::new(),
            store: None,
            index: None,
        })
    }

    pub fn fixture(&self) -> &MailFixture {
        &self.fixture
    }

    /// Run the reindex the way the CLI does, recording the outcome
    pub fn reindex(&mut self) {
        let outcome = self.try_reindex();
        self.outcome = Some(outcome);
    }

    fn try_reindex(&mut self) -> std::result::Result<RunStats, ReindexError> {
        let dir = self.fixture.mail_dir();
        dir.ensure_fresh_destination()?;

        let config = Config::load(dir.base())?;
        let store = RedbStore::open(dir.store_dir())?;
        let blobs = MessageBlobs::open(dir.messages_path())?;
        let mut index = RedbIndex::create(dir.index_dir(), config.index.flush_every)?;

        let classifier = Classifier::new(blobs, MimeParser, self.settings.policy);
        let options = RunOptions {
            limit: self.settings.limit,
            progress_interval: config.progress.interval(),
        };

        let reports = &mut self.reports;
        let stats = Reindexer::new(&store, &mut index, options)
            .with_clock(self.clock.as_clock())
            .run(
                self.settings.strategy,
                &classifier,
                &mut |progress: &Progress| reports.push(*progress),
            )?;

        self.store = Some(store);
        self.index = Some(index);
        Ok(stats)
    }

    fn stats(&self) -> Result<&RunStats> {
        match &self.outcome {
            Some(Ok(stats)) => Ok(stats),
            Some(Err(e)) => Err(anyhow!("reindex failed: {}", e)),
            None => Err(anyhow!("reindex was never run")),
        }
    }

    /// Runs `f` on the built index; `None` if no index database exists
    fn with_index<T>(
        &self,
        f: impl FnOnce(&RedbIndex) -> reindex_core::Result<T>,
    ) -> Result<Option<T>> {
        if let Some(index) = &self.index {
            return Ok(Some(f(index)?));
        }
        match RedbIndex::open(self.fixture.mail_dir().index_dir(), 1)? {
            Some(index) => Ok(Some(f(&index)?)),
            None => Ok(None),
        }
    }

    fn with_store<T>(&self, f: impl FnOnce(&RedbStore) -> reindex_core::Result<T>) -> Result<T> {
        if let Some(store) = &self.store {
            return Ok(f(store)?);
        }
        let store = RedbStore::open(self.fixture.mail_dir().store_dir())?;
        Ok(f(&store)?)
    }

    /// Check one assertion against the post-run state
    pub fn check(&self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::Succeeded => {
                self.stats()?;
            }
            Assertion::Failed(expected) => match &self.outcome {
                Some(Err(e)) => ensure!(
                    expected.matches(e),
                    "expected {:?} failure, got: {}",
                    expected,
                    e
                ),
                Some(Ok(_)) => bail!("expected {:?} failure, but the run succeeded", expected),
                None => bail!("reindex was never run"),
            },
            Assertion::Processed(n) => {
                let got = self.stats()?.processed;
                ensure!(got == *n, "expected {} processed, got {}", n, got);
            }
            Assertion::Indexed(n) => {
                let got = self.stats()?.indexed;
                ensure!(got == *n, "expected {} indexed, got {}", n, got);
            }
            Assertion::SpamSkipped(n) => {
                let got = self.stats()?.spam;
                ensure!(got == *n, "expected {} spam skipped, got {}", n, got);
            }
            Assertion::DeletedSkipped(n) => {
                let got = self.stats()?.deleted;
                ensure!(got == *n, "expected {} deleted skipped, got {}", n, got);
            }
            Assertion::Malformed(n) => {
                let got = self.stats()?.malformed;
                ensure!(got == *n, "expected {} malformed, got {}", n, got);
            }
            Assertion::InsertionOrder(expected) => {
                let subjects = self
                    .with_index(|index| {
                        let mut subjects = Vec::new();
                        for doc_id in 1..=index.num_docs()? {
                            let doc = index.document(doc_id)?;
                            subjects.push(doc.map(|d| d.subject).unwrap_or_default());
                        }
                        Ok(subjects)
                    })?
                    .ok_or_else(|| anyhow!("no index was built"))?;
                let expected: Vec<String> = expected.iter().map(|s| s.to_lowercase()).collect();
                ensure!(
                    subjects == expected,
                    "expected insertion order {:?}, got {:?}",
                    expected,
                    subjects
                );
            }
            Assertion::IndexDocCount(n) => {
                let got = self.with_index(|index| index.num_docs())?.unwrap_or(0);
                ensure!(got == *n, "expected {} index documents, got {}", n, got);
            }
            Assertion::NoIndexCreated => {
                ensure!(self.index.is_none(), "an index handle was created");
                ensure!(
                    !self
                        .fixture
                        .file_exists("index-reindexed/whistlepig/index.redb"),
                    "an index database was written"
                );
            }
            Assertion::TermHits { field, term, docs } => {
                let got = self
                    .with_index(|index| index.lookup_term(field, term))?
                    .unwrap_or_default();
                ensure!(
                    &got == docs,
                    "expected {}:{} in {:?}, got {:?}",
                    field,
                    term,
                    docs,
                    got
                );
            }
            Assertion::LabelHits { label, docs } => {
                let got = self
                    .with_index(|index| index.docs_with_label(label))?
                    .unwrap_or_default();
                ensure!(
                    &got == docs,
                    "expected label {} on {:?}, got {:?}",
                    label,
                    docs,
                    got
                );
            }
            Assertion::Mapping {
                store_doc_id,
                index_doc_id,
            } => {
                let got = self.with_store(|store| store.index_mapping(*store_doc_id))?;
                ensure!(
                    got == Some(*index_doc_id),
                    "expected store id {} mapped to {:?}, got {:?}",
                    store_doc_id,
                    index_doc_id,
                    got
                );
            }
            Assertion::Unmapped(store_doc_id) => {
                let got = self.with_store(|store| store.index_mapping(*store_doc_id))?;
                ensure!(
                    got.is_none(),
                    "expected store id {} unmapped, got {:?}",
                    store_doc_id,
                    got
                );
            }
            Assertion::MappingCount(n) => {
                let got = self.with_store(|store| store.mapping_count())?;
                ensure!(got == *n, "expected {} mappings, got {}", n, got);
            }
            Assertion::ProgressReports(n) => {
                ensure!(
                    self.reports.len() == *n,
                    "expected {} progress reports, got {}",
                    n,
                    self.reports.len()
                );
            }
        }
        Ok(())
    }
}
