//! On-page node format and in-page search.
//!
//! A node is one page interpreted in place. Layout, all integers
//! little-endian:
//!
//! ```text
//! | type | key_count | pointers       | offsets        | records  |
//! | 2B   | 2B        | 8B * key_count | 2B * key_count | variable |
//! ```
//!
//! The pointer table exists only on internal nodes. The offset table holds
//! the cumulative end position of each record relative to the start of the
//! record area; the offset of record 0 is implicitly zero and has no slot.
//! Record bodies are `{key_len:2}{key}` on internal nodes and
//! `{key_len:2}{val_len:2}{key}{value}` on leaves.

use std::cmp::Ordering;

use common::{DbError, PageId};
use storage::PAGE_SIZE;
use thiserror::Error;

/// Size of the node header: type and key count, two bytes each.
pub const HEADER_SIZE: usize = 4;
/// Largest key the mutation logic above this crate may store.
pub const MAX_KEY_SIZE: usize = 1000;
/// Largest value the mutation logic above this crate may store.
pub const MAX_VAL_SIZE: usize = 3000;

// A single maximal leaf record must fit a page with the fixed sections.
const _: () = assert!(HEADER_SIZE + 8 + 2 + 4 + MAX_KEY_SIZE + MAX_VAL_SIZE <= PAGE_SIZE);

/// The two node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

impl NodeType {
    /// On-page encoding of this kind.
    pub const fn raw(self) -> u16 {
        match self {
            NodeType::Internal => 1,
            NodeType::Leaf => 2,
        }
    }

    fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(NodeType::Internal),
            2 => Some(NodeType::Leaf),
            _ => None,
        }
    }
}

/// Recoverable node access errors.
///
/// These cover the cases where a caller's computed index or assumed node
/// kind can plausibly be wrong. Structural corruption (an unknown type
/// field, an empty node, a broken separator invariant) panics instead,
/// because no accessor result on such a buffer can be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("expected {expected:?} node, found raw type {found}")]
    TypeMismatch { expected: NodeType, found: u16 },
    #[error("index {index} out of bounds for key count {count}")]
    OutOfBounds { index: u16, count: u16 },
    #[error("offset 0 is implicitly zero and has no slot")]
    OffsetZero,
}

impl From<NodeError> for DbError {
    fn from(err: NodeError) -> Self {
        DbError::Node(err.to_string())
    }
}

/// One page interpreted as a B+tree node.
///
/// The buffer is owned; `get_key`, `get_value` and `sections` hand out
/// borrows into it. Setters are only used while a node is under
/// construction; once the bytes reach a store's `allocate`, they are
/// never mutated again (copy-on-write).
#[derive(Clone, Debug)]
pub struct Node {
    data: Vec<u8>,
}

impl Node {
    /// A fresh zeroed page-sized buffer for node construction.
    pub fn new() -> Self {
        Self {
            data: vec![0u8; PAGE_SIZE],
        }
    }

    /// Interpret bytes loaded from a store as a node.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The full backing buffer, including any unoccupied tail.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The exact occupied prefix of the buffer, ready for `allocate`.
    pub fn occupied_bytes(&self) -> &[u8] {
        &self.data[..self.total_size()]
    }

    /// Initialize the two header fields on a fresh buffer.
    pub fn set_header(&mut self, node_type: NodeType, key_count: u16) {
        self.data[0..2].copy_from_slice(&node_type.raw().to_le_bytes());
        self.data[2..4].copy_from_slice(&key_count.to_le_bytes());
    }

    /// Raw type field. Always succeeds; interpreting the value is deferred
    /// to [`Node::kind`] and the layout helpers, so corruption in a loaded
    /// page surfaces on use rather than on read.
    pub fn node_type(&self) -> u16 {
        u16::from_le_bytes([self.data[0], self.data[1]])
    }

    /// Number of records in the node. At least 1 in any valid node.
    pub fn key_count(&self) -> u16 {
        u16::from_le_bytes([self.data[2], self.data[3]])
    }

    /// The typed node kind.
    ///
    /// # Panics
    /// On an unknown raw type field: the page is structurally corrupt.
    pub fn kind(&self) -> NodeType {
        let raw = self.node_type();
        match NodeType::from_raw(raw) {
            Some(kind) => kind,
            None => panic!("unknown node type {raw}"),
        }
    }

    fn check_kind(&self, expected: NodeType) -> Result<(), NodeError> {
        let found = self.node_type();
        if found == expected.raw() {
            Ok(())
        } else {
            Err(NodeError::TypeMismatch { expected, found })
        }
    }

    fn check_index(&self, index: u16) -> Result<(), NodeError> {
        let count = self.key_count();
        if index < count {
            Ok(())
        } else {
            Err(NodeError::OutOfBounds { index, count })
        }
    }

    /// Child page id at `index`. Internal nodes only.
    pub fn get_pointer(&self, index: u16) -> Result<PageId, NodeError> {
        self.check_kind(NodeType::Internal)?;
        self.check_index(index)?;
        let pos = HEADER_SIZE + 8 * index as usize;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.data[pos..pos + 8]);
        Ok(PageId(u64::from_le_bytes(raw)))
    }

    /// Write the child page id at `index`. Internal nodes only.
    pub fn set_pointer(&mut self, index: u16, pointer: PageId) -> Result<(), NodeError> {
        self.check_kind(NodeType::Internal)?;
        self.check_index(index)?;
        let pos = HEADER_SIZE + 8 * index as usize;
        self.data[pos..pos + 8].copy_from_slice(&pointer.0.to_le_bytes());
        Ok(())
    }

    /// Size of the pointer table in bytes.
    ///
    /// # Panics
    /// On an unknown type field (structural corruption).
    pub fn pointer_bytes(&self) -> usize {
        match self.kind() {
            NodeType::Internal => 8 * self.key_count() as usize,
            NodeType::Leaf => 0,
        }
    }

    /// Cumulative end position of record `index`, relative to the start of
    /// the record area. Index `key_count()` marks the end of the whole
    /// area; index 0 is always 0 and is answered without a memory read.
    pub fn get_offset(&self, index: u16) -> Result<u16, NodeError> {
        let count = self.key_count();
        if index > count {
            return Err(NodeError::OutOfBounds { index, count });
        }
        if index == 0 {
            return Ok(0);
        }
        let pos = HEADER_SIZE + self.pointer_bytes() + 2 * (index as usize - 1);
        Ok(u16::from_le_bytes([self.data[pos], self.data[pos + 1]]))
    }

    /// Write the end position of record `index - 1`. Index 0 has no slot
    /// and always fails.
    pub fn set_offset(&mut self, index: u16, offset: u16) -> Result<(), NodeError> {
        if index == 0 {
            return Err(NodeError::OffsetZero);
        }
        let count = self.key_count();
        if index > count {
            return Err(NodeError::OutOfBounds { index, count });
        }
        let pos = HEADER_SIZE + self.pointer_bytes() + 2 * (index as usize - 1);
        self.data[pos..pos + 2].copy_from_slice(&offset.to_le_bytes());
        Ok(())
    }

    /// Absolute buffer position where record `index` begins. Index
    /// `key_count()` yields the position one past the last record.
    pub fn get_key_value_position(&self, index: u16) -> Result<usize, NodeError> {
        let offset = self.get_offset(index)?;
        Ok(HEADER_SIZE + self.pointer_bytes() + 2 * self.key_count() as usize + offset as usize)
    }

    /// Size of the per-record length prefix: key length only on internal
    /// nodes, key and value lengths on leaves.
    ///
    /// # Panics
    /// On an unknown type field (structural corruption).
    pub fn record_prefix_len(&self) -> usize {
        match self.kind() {
            NodeType::Internal => 2,
            NodeType::Leaf => 4,
        }
    }

    /// The key of record `index`, borrowed from the node buffer. Valid for
    /// both node kinds.
    pub fn get_key(&self, index: u16) -> Result<&[u8], NodeError> {
        self.check_index(index)?;
        let pos = self.get_key_value_position(index)?;
        let key_len = u16::from_le_bytes([self.data[pos], self.data[pos + 1]]) as usize;
        let start = pos + self.record_prefix_len();
        Ok(&self.data[start..start + key_len])
    }

    /// The value of record `index`, borrowed from the node buffer. Leaves
    /// only.
    pub fn get_value(&self, index: u16) -> Result<&[u8], NodeError> {
        self.check_kind(NodeType::Leaf)?;
        self.check_index(index)?;
        let pos = self.get_key_value_position(index)?;
        let key_len = u16::from_le_bytes([self.data[pos], self.data[pos + 1]]) as usize;
        let val_len = u16::from_le_bytes([self.data[pos + 2], self.data[pos + 3]]) as usize;
        let start = pos + self.record_prefix_len() + key_len;
        Ok(&self.data[start..start + val_len])
    }

    /// Exact number of occupied bytes: header, pointer table, offset table
    /// and all records. The page budget itself is enforced by the mutation
    /// logic that assembles nodes and by `allocate`, not here; this method
    /// only reports the true size so callers can act on it.
    pub fn total_size(&self) -> usize {
        match self.get_key_value_position(self.key_count()) {
            Ok(end) => end,
            // get_offset accepts indexes up to and including key_count.
            Err(_) => unreachable!("offset index key_count is always in range"),
        }
    }

    /// Locate `key` in the node.
    ///
    /// Returns `(index, true)` on an exact match, otherwise
    /// `(index, false)` where `index` is the greatest position whose key is
    /// less than or equal to `key`: the insertion predecessor on a leaf,
    /// the child to descend into on an internal node. Record 0 is never
    /// reported as exact; callers that care compare its key themselves.
    ///
    /// # Panics
    /// If the node is empty, or if the first key exceeds `key`. The first
    /// key is a copy of the parent separator, so any search legitimately
    /// directed into this node satisfies `get_key(0) <= key`; either
    /// failure means the tree structure is corrupt.
    pub fn find(&self, key: &[u8]) -> (u16, bool) {
        let count = self.key_count();
        assert!(count > 0, "search in an empty node");

        let first = self.get_key(0).expect("key 0 exists in a non-empty node");
        assert!(
            first <= key,
            "first key exceeds the search key: separator invariant broken"
        );

        let mut start: u16 = 0;
        let mut end = count;
        while end - start > 1 {
            let middle = (start + end) / 2;
            let middle_key = self
                .get_key(middle)
                .expect("middle index stays within the key count");
            match middle_key.cmp(&key) {
                Ordering::Equal => return (middle, true),
                Ordering::Less => start = middle,
                Ordering::Greater => end = middle,
            }
        }
        (start, false)
    }

    /// The three contiguous sections of the node: pointer table, offset
    /// table and record area. Split and merge logic copies these wholesale
    /// instead of re-deriving positions record by record.
    pub fn sections(&self) -> (&[u8], &[u8], &[u8]) {
        let pointers_start = HEADER_SIZE;
        let offsets_start = pointers_start + self.pointer_bytes();
        let records_start = offsets_start + 2 * self.key_count() as usize;
        let end = self.total_size();
        (
            &self.data[pointers_start..offsets_start],
            &self.data[offsets_start..records_start],
            &self.data[records_start..end],
        )
    }

    /// Build a leaf node from ascending `(key, value)` records.
    ///
    /// Keys and values are copied as given; the budget constants are
    /// enforced by the mutation logic above and by the store's `allocate`.
    ///
    /// # Panics
    /// If `entries` is empty; an empty node must never exist.
    pub fn new_leaf(entries: &[(&[u8], &[u8])]) -> Result<Self, NodeError> {
        assert!(!entries.is_empty(), "a node holds at least one record");

        let count = entries.len();
        let records: usize = entries.iter().map(|(k, v)| 4 + k.len() + v.len()).sum();
        debug_assert!(records <= u16::MAX as usize);
        let size = HEADER_SIZE + 2 * count + records;

        let mut node = Node::from_bytes(vec![0u8; size.max(PAGE_SIZE)]);
        node.set_header(NodeType::Leaf, count as u16);

        let mut end = 0usize;
        for (i, (key, value)) in entries.iter().enumerate() {
            let index = i as u16;
            let pos = node.get_key_value_position(index)?;
            node.data[pos..pos + 2].copy_from_slice(&(key.len() as u16).to_le_bytes());
            node.data[pos + 2..pos + 4].copy_from_slice(&(value.len() as u16).to_le_bytes());
            node.data[pos + 4..pos + 4 + key.len()].copy_from_slice(key);
            node.data[pos + 4 + key.len()..pos + 4 + key.len() + value.len()]
                .copy_from_slice(value);
            end += 4 + key.len() + value.len();
            node.set_offset(index + 1, end as u16)?;
        }
        Ok(node)
    }

    /// Build an internal node from ascending separator keys and their child
    /// page ids. `keys[i]` is the first key reachable through
    /// `children[i]`.
    ///
    /// # Panics
    /// If `keys` is empty or the two slices disagree in length.
    pub fn new_internal(keys: &[&[u8]], children: &[PageId]) -> Result<Self, NodeError> {
        assert!(!keys.is_empty(), "a node holds at least one record");
        assert_eq!(keys.len(), children.len(), "one child per separator key");

        let count = keys.len();
        let records: usize = keys.iter().map(|k| 2 + k.len()).sum();
        debug_assert!(records <= u16::MAX as usize);
        let size = HEADER_SIZE + 8 * count + 2 * count + records;

        let mut node = Node::from_bytes(vec![0u8; size.max(PAGE_SIZE)]);
        node.set_header(NodeType::Internal, count as u16);
        for (i, child) in children.iter().enumerate() {
            node.set_pointer(i as u16, *child)?;
        }

        let mut end = 0usize;
        for (i, key) in keys.iter().enumerate() {
            let index = i as u16;
            let pos = node.get_key_value_position(index)?;
            node.data[pos..pos + 2].copy_from_slice(&(key.len() as u16).to_le_bytes());
            node.data[pos + 2..pos + 2 + key.len()].copy_from_slice(key);
            end += 2 + key.len();
            node.set_offset(index + 1, end as u16)?;
        }
        Ok(node)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
