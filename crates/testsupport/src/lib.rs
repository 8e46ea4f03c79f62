//! Test support utilities for the storage engine workspace.
//!
//! Provides property-based generators for node records and probe keys,
//! shared by the btree crate's tests.

pub mod proptest_generators;
