//! Property-based test generators using proptest.
//!
//! Node records are keyed by raw bytes compared lexicographically, so
//! generating through a `BTreeMap` yields the ascending, duplicate-free
//! record sets every valid node requires.

use common::PageId;
use proptest::collection::btree_map;
use proptest::prelude::*;

/// Strategy for a single record key: 1 to 23 arbitrary bytes.
pub fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..24)
}

/// Strategy for a value payload: up to 47 arbitrary bytes, possibly empty.
pub fn arb_value_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..48)
}

/// Ascending, duplicate-free leaf records.
///
/// # Example
///
/// ```
/// use proptest::prelude::*;
/// use testsupport::proptest_generators::arb_leaf_records;
///
/// proptest! {
///     #[test]
///     fn keys_ascend(entries in arb_leaf_records()) {
///         for pair in entries.windows(2) {
///             prop_assert!(pair[0].0 < pair[1].0);
///         }
///     }
/// }
/// ```
pub fn arb_leaf_records() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    btree_map(arb_key(), arb_value_bytes(), 1..32).prop_map(|m| m.into_iter().collect())
}

/// Ascending, duplicate-free separator keys paired with non-zero child
/// page ids.
pub fn arb_internal_records() -> impl Strategy<Value = Vec<(Vec<u8>, PageId)>> {
    btree_map(arb_key(), 1u64..u64::MAX, 1..32)
        .prop_map(|m| m.into_iter().map(|(k, id)| (k, PageId(id))).collect())
}
