//! Copy-on-write B+tree node core.
//!
//! This crate provides the on-page node format for a disk-oriented B+tree,
//! the in-page binary search, and the tree handle tying nodes to a page
//! store. Structural mutation (insert, delete, split, merge) is layered on
//! top of the node codec by callers.

mod node;

pub use node::{Node, NodeError, NodeType, HEADER_SIZE, MAX_KEY_SIZE, MAX_VAL_SIZE};

use common::{DbResult, PageId};
use storage::PageStore;

/// Handle to a copy-on-write B+tree rooted in a page store.
///
/// The handle tracks the current root page id (`PageId::NULL` for an empty
/// tree) and owns no node bytes itself; every page lives in the injected
/// store between `allocate` and `free`.
#[derive(Debug)]
pub struct BTree<S> {
    root: PageId,
    store: S,
}

impl<S: PageStore> BTree<S> {
    /// Create a handle over an empty tree.
    pub fn new(store: S) -> Self {
        Self {
            root: PageId::NULL,
            store,
        }
    }

    /// Create a handle over an existing tree rooted at `root`.
    pub fn with_root(store: S, root: PageId) -> Self {
        Self { root, store }
    }

    /// The current root page id. `PageId::NULL` means the tree is empty.
    pub fn root(&self) -> PageId {
        self.root
    }

    /// Returns true when the tree holds no pages.
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    /// Point the handle at a new root, after mutation logic has published
    /// a replacement page.
    pub fn set_root(&mut self, root: PageId) {
        self.root = root;
    }

    /// Access to the underlying page store, for the mutation logic layered
    /// on top of this crate.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Look up `key`, returning a copy of its value if present.
    pub fn get(&mut self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        if self.root.is_null() {
            return Ok(None);
        }

        let mut node = self.load_node(self.root)?;
        // A key below the root's first key is below the whole tree;
        // descending with it would trip the search precondition.
        if key < node.get_key(0)? {
            return Ok(None);
        }

        loop {
            let (index, exact) = node.find(key);
            match node.kind() {
                NodeType::Leaf => {
                    // find never reports record 0 as exact; one more
                    // comparison settles it.
                    if exact || node.get_key(index)? == key {
                        return Ok(Some(node.get_value(index)?.to_vec()));
                    }
                    return Ok(None);
                }
                NodeType::Internal => {
                    let child = node.get_pointer(index)?;
                    node = self.load_node(child)?;
                }
            }
        }
    }

    fn load_node(&mut self, id: PageId) -> DbResult<Node> {
        Ok(Node::from_bytes(self.store.load(id)?))
    }
}
