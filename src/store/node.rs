//! Copy-on-write B+tree nodes
//!
//! Nodes are shared between the published tree and any reader snapshot
//! through `Arc`. A writer path-copies with `Arc::make_mut`, so a node that
//! is still visible to readers is cloned before it changes. A node that
//! changes loses its page id; its old page is handed back to the caller to
//! be recycled once no checkpoint refers to it.

use std::sync::Arc;

/// Index of a data page in the store file
pub type PageId = u64;

/// Bytes a leaf spends per key besides the key itself
pub(crate) const LEAF_ENTRY_OVERHEAD: usize = 2;

/// Bytes an internal node spends per separator besides the separator itself
pub(crate) const INTERNAL_ENTRY_OVERHEAD: usize = 2 + 8;

/// Bytes every internal node spends on its leftmost child
pub(crate) const INTERNAL_FIXED: usize = 8;

#[derive(Debug, Clone)]
pub struct Node {
    /// Page holding this node as of the last checkpoint; `None` when dirty
    pub(crate) page: Option<PageId>,
    pub(crate) body: NodeBody,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeBody {
    Leaf(Vec<Vec<u8>>),
    /// `children[i]` holds keys in `[separators[i-1], separators[i])`
    Internal {
        separators: Vec<Vec<u8>>,
        children: Vec<Arc<Node>>,
    },
}

/// Right half produced by a split, plus the separator to push up
pub(crate) struct Split {
    separator: Vec<u8>,
    right: Arc<Node>,
}

/// Per-batch bookkeeping while mutating a tree
pub(crate) struct MutationContext<'a> {
    /// Usable bytes in a page body
    pub capacity: usize,
    /// Pages of nodes changed by this batch
    pub freed: &'a mut Vec<PageId>,
}

impl MutationContext<'_> {
    fn touch<'n>(&mut self, node: &'n mut Arc<Node>) -> &'n mut Node {
        let node = Arc::make_mut(node);
        if let Some(page) = node.page.take() {
            self.freed.push(page);
        }
        node
    }
}

impl Node {
    pub fn empty_leaf() -> Self {
        Self {
            page: None,
            body: NodeBody::Leaf(Vec::new()),
        }
    }

    pub(crate) fn leaf(keys: Vec<Vec<u8>>, page: Option<PageId>) -> Self {
        Self {
            page,
            body: NodeBody::Leaf(keys),
        }
    }

    pub(crate) fn internal(
        separators: Vec<Vec<u8>>,
        children: Vec<Arc<Node>>,
        page: Option<PageId>,
    ) -> Self {
        Self {
            page,
            body: NodeBody::Internal {
                separators,
                children,
            },
        }
    }

    /// Bytes the node body needs on a page
    pub(crate) fn encoded_size(&self) -> usize {
        match &self.body {
            NodeBody::Leaf(keys) => keys.iter().map(|k| LEAF_ENTRY_OVERHEAD + k.len()).sum(),
            NodeBody::Internal { separators, .. } => {
                INTERNAL_FIXED
                    + separators
                        .iter()
                        .map(|s| INTERNAL_ENTRY_OVERHEAD + s.len())
                        .sum::<usize>()
            }
        }
    }

    fn is_empty(&self) -> bool {
        match &self.body {
            NodeBody::Leaf(keys) => keys.is_empty(),
            NodeBody::Internal { children, .. } => children.is_empty(),
        }
    }
}

/// Child slot that may hold `key`
pub(crate) fn child_index(separators: &[Vec<u8>], key: &[u8]) -> usize {
    separators.partition_point(|s| s.as_slice() <= key)
}

pub(crate) fn contains(root: &Node, key: &[u8]) -> bool {
    let mut node = root;
    loop {
        match &node.body {
            NodeBody::Leaf(keys) => {
                return keys.binary_search_by(|k| k.as_slice().cmp(key)).is_ok()
            }
            NodeBody::Internal {
                separators,
                children,
            } => node = &children[child_index(separators, key)],
        }
    }
}

// =============================================================================
// Insert
// =============================================================================

/// Insert a key known to be absent
pub(crate) fn insert(root: &mut Arc<Node>, key: Vec<u8>, ctx: &mut MutationContext<'_>) {
    if let Some(split) = insert_into(root, key, ctx) {
        let left = std::mem::replace(root, Arc::new(Node::empty_leaf()));
        *root = Arc::new(Node::internal(
            vec![split.separator],
            vec![left, split.right],
            None,
        ));
    }
}

fn insert_into(node: &mut Arc<Node>, key: Vec<u8>, ctx: &mut MutationContext<'_>) -> Option<Split> {
    let capacity = ctx.capacity;
    let node = ctx.touch(node);
    match &mut node.body {
        NodeBody::Leaf(keys) => {
            if let Err(pos) = keys.binary_search(&key) {
                keys.insert(pos, key);
            }
        }
        NodeBody::Internal {
            separators,
            children,
        } => {
            let idx = child_index(separators, &key);
            if let Some(split) = insert_into(&mut children[idx], key, ctx) {
                separators.insert(idx, split.separator);
                children.insert(idx + 1, split.right);
            }
        }
    }
    if node.encoded_size() > capacity {
        Some(split(node))
    } else {
        None
    }
}

/// Split an overfull node roughly in half by bytes
fn split(node: &mut Node) -> Split {
    match &mut node.body {
        NodeBody::Leaf(keys) => {
            let at = byte_midpoint(keys, LEAF_ENTRY_OVERHEAD).clamp(1, keys.len() - 1);
            let right_keys = keys.split_off(at);
            let separator = right_keys[0].clone();
            Split {
                separator,
                right: Arc::new(Node::leaf(right_keys, None)),
            }
        }
        NodeBody::Internal {
            separators,
            children,
        } => {
            let at = byte_midpoint(separators, INTERNAL_ENTRY_OVERHEAD)
                .clamp(1, separators.len() - 1);
            let mut right_separators = separators.split_off(at);
            let separator = right_separators.remove(0);
            let right_children = children.split_off(at + 1);
            Split {
                separator,
                right: Arc::new(Node::internal(right_separators, right_children, None)),
            }
        }
    }
}

/// First index at which the running byte size passes half the total
fn byte_midpoint(entries: &[Vec<u8>], overhead: usize) -> usize {
    let total: usize = entries.iter().map(|e| e.len() + overhead).sum();
    let mut running = 0;
    for (i, e) in entries.iter().enumerate() {
        running += e.len() + overhead;
        if running * 2 >= total {
            return i + 1;
        }
    }
    entries.len()
}

// =============================================================================
// Remove
// =============================================================================

/// Remove a key known to be present
pub(crate) fn remove(root: &mut Arc<Node>, key: &[u8], ctx: &mut MutationContext<'_>) {
    remove_from(root, key, ctx);

    // Collapse single-child roots; an emptied root becomes an empty leaf
    loop {
        let replacement = match &root.body {
            NodeBody::Internal { children, .. } if children.len() == 1 => children[0].clone(),
            NodeBody::Internal { children, .. } if children.is_empty() => {
                Arc::new(Node::empty_leaf())
            }
            _ => break,
        };
        if let Some(page) = root.page {
            ctx.freed.push(page);
        }
        *root = replacement;
    }
}

fn remove_from(node: &mut Arc<Node>, key: &[u8], ctx: &mut MutationContext<'_>) {
    let node = ctx.touch(node);
    match &mut node.body {
        NodeBody::Leaf(keys) => {
            if let Ok(pos) = keys.binary_search_by(|k| k.as_slice().cmp(key)) {
                keys.remove(pos);
            }
        }
        NodeBody::Internal {
            separators,
            children,
        } => {
            let idx = child_index(separators, key);
            remove_from(&mut children[idx], key, ctx);
            if children[idx].is_empty() {
                let child = children.remove(idx);
                if let Some(page) = child.page {
                    ctx.freed.push(page);
                }
                if !separators.is_empty() {
                    separators.remove(idx.saturating_sub(1));
                }
            }
        }
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Visit every key in order
pub(crate) fn for_each_key(node: &Node, f: &mut dyn FnMut(&[u8])) {
    match &node.body {
        NodeBody::Leaf(keys) => {
            for k in keys {
                f(k);
            }
        }
        NodeBody::Internal { children, .. } => {
            for child in children {
                for_each_key(child, f);
            }
        }
    }
}
