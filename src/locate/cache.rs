//! Per-document offset memoization
//!
//! Side table mapping node identity to computed offsets, owned by the
//! scanner for the lifetime of one parsed document. Replaces the
//! "stash offsets on the tree" approach with an explicit table keyed
//! by arena index, so the tree itself is never mutated.

use std::collections::HashMap;

use crate::dom::NodeId;

/// Which offset of a node is being memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetField {
    /// First character of the node in source
    Start,
    /// One past the last character of the node in source
    End,
    /// First character of the node's content region
    ContentStart,
}

/// Memoization table for node offsets.
///
/// A stored `None` means "computed, and unknowable": the computation
/// ran and failed to find its marker, and will not be retried.
///
/// The table is filled in place while the tree is being traversed
/// read-only; this is single-threaded by design. Positioning nodes of
/// one document from multiple threads requires external
/// synchronization around the whole scanner.
#[derive(Debug, Default)]
pub struct OffsetCache {
    table: HashMap<(NodeId, OffsetField), Option<usize>>,
}

impl OffsetCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        OffsetCache::default()
    }

    /// Previously stored value for `(node, field)`, if any.
    ///
    /// Lookup and [`store`](Self::store) are deliberately separate
    /// operations: computing one offset recursively computes offsets
    /// of related nodes (parent, previous sibling), so no borrow of
    /// the table may be held across the computation.
    pub fn lookup(&self, node: NodeId, field: OffsetField) -> Option<Option<usize>> {
        self.table.get(&(node, field)).copied()
    }

    /// Store the computed value for `(node, field)`.
    pub fn store(&mut self, node: NodeId, field: OffsetField, value: Option<usize>) {
        self.table.insert((node, field), value);
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when nothing has been memoized yet.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
