use reindex_core::ReindexError;

/// Declarative assertions on the state after a reindex run
#[derive(Debug, Clone)]
pub enum Assertion {
    // Outcome
    Succeeded,
    Failed(FailureMatch),

    // Counters
    Processed(u64),
    Indexed(u64),
    SpamSkipped(u64),
    DeletedSkipped(u64),
    Malformed(u64),

    // Index contents
    /// Subjects of index documents 1.. in insertion order.
    InsertionOrder(Vec<String>),
    IndexDocCount(u64),
    NoIndexCreated,
    TermHits {
        field: String,
        term: String,
        docs: Vec<u64>,
    },
    LabelHits {
        label: String,
        docs: Vec<u64>,
    },

    // Id mapping
    Mapping {
        store_doc_id: u64,
        index_doc_id: Option<u64>,
    },
    Unmapped(u64),
    MappingCount(u64),

    // Progress
    ProgressReports(usize),
}

/// Expected kind of run failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMatch {
    DestinationExists,
    StoreOpen,
    ConfigError,
    Any,
}

impl FailureMatch {
    pub fn matches(&self, error: &ReindexError) -> bool {
        match self {
            FailureMatch::DestinationExists => {
                matches!(error, ReindexError::DestinationExists { .. })
            }
            FailureMatch::StoreOpen => matches!(error, ReindexError::StoreOpen { .. }),
            FailureMatch::ConfigError => matches!(error, ReindexError::ConfigError(_)),
            FailureMatch::Any => true,
        }
    }
}
