use crate::harness::{MessageSpec, Scenario};

#[test]
fn test_limit_counts_skipped_messages() {
    Scenario::new("limit_counts_skipped")
        .with_message(MessageSpec::new("one").state("spam"))
        .with_message(MessageSpec::new("two"))
        .with_message(MessageSpec::new("three"))
        .with_message(MessageSpec::new("four"))
        .limit(2)
        .assert_processed(2)
        .assert_counts(1, 1, 0)
        .assert_mapping(1, None)
        .assert_mapping(2, Some(1))
        .assert_unmapped(3)
        .assert_unmapped(4)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_limit_applies_to_date_order() {
    Scenario::new("limit_in_date_order")
        .with_message(MessageSpec::new("newest").dated(2020, 5, 3))
        .with_message(MessageSpec::new("oldest").dated(2020, 5, 1))
        .with_message(MessageSpec::new("middle").dated(2020, 5, 2))
        .reorder()
        .limit(2)
        .assert_insertion_order(&["oldest", "middle"])
        .assert_unmapped(1)
        .run()
        .unwrap();
}

#[test]
fn test_limit_above_store_size() {
    Scenario::new("limit_above_size")
        .with_message(MessageSpec::new("only"))
        .limit(10)
        .assert_processed(1)
        .assert_counts(1, 0, 0)
        .run()
        .unwrap();
}
