use crate::harness::{MessageSpec, Scenario};

#[test]
fn test_spam_skipped_and_tombstoned() {
    Scenario::new("spam_skipped")
        .with_message(MessageSpec::new("one"))
        .with_message(MessageSpec::new("two").state("spam"))
        .with_message(MessageSpec::new("three"))
        .assert_counts(2, 1, 0)
        .assert_processed(3)
        .assert_insertion_order(&["one", "three"])
        .assert_mapping(1, Some(1))
        .assert_mapping(2, None)
        .assert_mapping(3, Some(2))
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_spam_indexed_with_flag() {
    Scenario::new("spam_indexed")
        .with_message(MessageSpec::new("one"))
        .with_message(MessageSpec::new("two").state("spam"))
        .index_spam()
        .assert_counts(2, 0, 0)
        .assert_mapping(2, Some(2))
        .assert_label_hits("spam", &[2])
        .run()
        .unwrap();
}

#[test]
fn test_deleted_skipped_and_tombstoned() {
    Scenario::new("deleted_skipped")
        .with_message(MessageSpec::new("kept"))
        .with_message(MessageSpec::new("gone").state("deleted"))
        .assert_counts(1, 0, 1)
        .assert_mapping(2, None)
        .assert_index_doc_count(1)
        .run()
        .unwrap();
}

#[test]
fn test_deleted_indexed_with_flag() {
    Scenario::new("deleted_indexed")
        .with_message(MessageSpec::new("kept"))
        .with_message(MessageSpec::new("gone").state("deleted"))
        .index_deleted()
        .assert_counts(2, 0, 0)
        .assert_label_hits("deleted", &[2])
        .assert_term_hits("subject", "gone", &[2])
        .run()
        .unwrap();
}

#[test]
fn test_deleted_spam_counts_as_deleted() {
    Scenario::new("deleted_spam")
        .with_message(MessageSpec::new("both").state("spam").state("deleted"))
        .assert_counts(0, 0, 1)
        .assert_mapping(1, None)
        .run()
        .unwrap();
}

#[test]
fn test_every_processed_id_is_mapped() {
    Scenario::new("every_id_mapped")
        .with_message(MessageSpec::new("a"))
        .with_message(MessageSpec::new("b").state("spam"))
        .with_message(MessageSpec::new("c").state("deleted"))
        .with_message(MessageSpec::new("d"))
        .reorder()
        .assert_processed(4)
        .assert_mapping_count(4)
        .run()
        .unwrap();
}
