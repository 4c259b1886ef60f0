use crate::harness::{MessageSpec, Scenario};

#[test]
fn test_corrupt_frame_is_skipped() {
    Scenario::new("corrupt_frame")
        .with_message(MessageSpec::new("before"))
        .with_message(MessageSpec::new("broken").corrupt())
        .with_message(MessageSpec::new("after"))
        .assert_succeeded()
        .assert_malformed(1)
        .assert_counts(2, 0, 0)
        .assert_processed(3)
        .assert_insertion_order(&["before", "after"])
        .assert_mapping(2, None)
        .assert_mapping(3, Some(2))
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_corrupt_spam_is_never_read() {
    // Skipped records never touch the blob file
    Scenario::new("corrupt_spam")
        .with_message(MessageSpec::new("junk").state("spam").corrupt())
        .assert_malformed(0)
        .assert_counts(0, 1, 0)
        .run()
        .unwrap();
}
