use crate::harness::{FailureMatch, MessageSpec, Scenario};
use std::time::Duration;

fn mailbox(n: usize) -> Vec<MessageSpec> {
    (1..=n)
        .map(|i| MessageSpec::new(&format!("message {}", i)))
        .collect()
}

#[test]
fn test_progress_reported_at_default_interval() {
    // One second per clock reading, 5s interval: reports after messages 6 and 12
    Scenario::new("default_progress_interval")
        .with_messages(mailbox(13))
        .clock_step(Duration::from_secs(1))
        .assert_progress_reports(2)
        .assert_counts(13, 0, 0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_frozen_clock_never_reports() {
    Scenario::new("frozen_clock")
        .with_messages(mailbox(5))
        .assert_progress_reports(0)
        .run()
        .unwrap();
}

#[test]
fn test_config_sets_progress_interval() {
    Scenario::new("configured_progress_interval")
        .with_messages(mailbox(6))
        .with_file("reindex.toml", b"[progress]\ninterval_secs = 1\n")
        .clock_step(Duration::from_secs(1))
        // Readings 0,1,2..: 2-0 > 1, 4-2 > 1 ... reports after messages 2, 4, 6
        .assert_progress_reports(3)
        .run()
        .unwrap();
}

#[test]
fn test_small_flush_batches_keep_every_document() {
    Scenario::new("small_flush_batches")
        .with_messages(mailbox(7))
        .with_file("reindex.toml", b"[index]\nflush_every = 2\n")
        .assert_index_doc_count(7)
        .assert_term_hits("subject", "7", &[7])
        .assert_label_hits("inbox", &[1, 2, 3, 4, 5, 6, 7])
        .run()
        .unwrap();
}

#[test]
fn test_invalid_config_aborts() {
    Scenario::new("invalid_config")
        .with_messages(mailbox(1))
        .with_file("reindex.toml", b"[index]\nflush_every = 0\n")
        .assert_failed(FailureMatch::ConfigError)
        .assert_mapping_count(0)
        .run()
        .unwrap();
}
