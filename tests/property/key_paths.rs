//! Property-based tests for dotted key encoding

use dotstore::path;
use proptest::prelude::*;

/// Segment names that may contain literal dots
fn segment() -> impl Strategy<Value = String> {
    "[a-z.]{1,6}"
}

/// Joining escaped names and splitting them again yields the same names
#[test]
fn test_join_then_segments_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(segment(), 1..5), |names| {
            let key = path::join(&names);
            let decoded = path::segments(&key);
            prop_assert_eq!(decoded, names);
            Ok(())
        })
        .unwrap();
}

/// Keys without dots or backslashes are a single segment
#[test]
fn test_plain_key_is_single_segment_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[a-zA-Z0-9_-]{1,12}", |key| {
            prop_assert_eq!(path::segments(&key), vec![key.clone()]);
            Ok(())
        })
        .unwrap();
}

/// Splitting on unescaped dots yields one more piece than there are separators
#[test]
fn test_split_count_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec("[a-z]{1,4}", 1..6), |parts| {
            let key = parts.join(".");
            prop_assert_eq!(path::split(&key).len(), parts.len());
            Ok(())
        })
        .unwrap();
}
