//! Lazy range iteration over a tree snapshot

use std::ops::Bound;
use std::sync::Arc;

use super::node::{child_index, Node, NodeBody};

/// Iteration direction of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordered keys of one range, produced leaf by leaf.
///
/// Holds `Arc`s into the snapshot it was created from, so later commits do
/// not affect what it returns.
pub struct Seek {
    /// Internal nodes on the path to the current leaf and the child taken
    path: Vec<(Arc<Node>, usize)>,
    leaf: Option<Arc<Node>>,
    /// Ascending: next index to return. Descending: one past it.
    pos: usize,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    direction: Direction,
}

impl Seek {
    pub(crate) fn new(
        root: Arc<Node>,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
        direction: Direction,
    ) -> Self {
        let mut seek = Self {
            path: Vec::new(),
            leaf: None,
            pos: 0,
            lower,
            upper,
            direction,
        };
        seek.position(root);
        seek
    }

    /// Descend from the root to the leaf where iteration starts
    fn position(&mut self, root: Arc<Node>) {
        let start = match self.direction {
            Direction::Ascending => self.lower.clone(),
            Direction::Descending => self.upper.clone(),
        };
        let mut node = root;
        loop {
            let next = match &node.body {
                NodeBody::Leaf(keys) => {
                    self.pos = match (&start, self.direction) {
                        (Bound::Unbounded, Direction::Ascending) => 0,
                        (Bound::Unbounded, Direction::Descending) => keys.len(),
                        (Bound::Included(k), Direction::Ascending) => {
                            keys.partition_point(|x| x < k)
                        }
                        (Bound::Excluded(k), Direction::Ascending) => {
                            keys.partition_point(|x| x <= k)
                        }
                        (Bound::Included(k), Direction::Descending) => {
                            keys.partition_point(|x| x <= k)
                        }
                        (Bound::Excluded(k), Direction::Descending) => {
                            keys.partition_point(|x| x < k)
                        }
                    };
                    break;
                }
                NodeBody::Internal {
                    separators,
                    children,
                } => {
                    let idx = match (&start, self.direction) {
                        (Bound::Unbounded, Direction::Ascending) => 0,
                        (Bound::Unbounded, Direction::Descending) => children.len() - 1,
                        (Bound::Included(k) | Bound::Excluded(k), _) => child_index(separators, k),
                    };
                    (idx, children[idx].clone())
                }
            };
            self.path.push((node, next.0));
            node = next.1;
        }
        self.leaf = Some(node);
    }

    /// Move to the neighbouring leaf in iteration order
    fn advance_leaf(&mut self) -> bool {
        while let Some((node, idx)) = self.path.pop() {
            let children = match &node.body {
                NodeBody::Internal { children, .. } => children,
                NodeBody::Leaf(_) => continue,
            };
            let next = match self.direction {
                Direction::Ascending if idx + 1 < children.len() => idx + 1,
                Direction::Descending if idx > 0 => idx - 1,
                _ => continue,
            };
            let mut child = children[next].clone();
            self.path.push((node, next));
            // Down to the edge leaf of the new subtree
            loop {
                let edge = match &child.body {
                    NodeBody::Leaf(keys) => {
                        self.pos = match self.direction {
                            Direction::Ascending => 0,
                            Direction::Descending => keys.len(),
                        };
                        None
                    }
                    NodeBody::Internal { children, .. } => {
                        let idx = match self.direction {
                            Direction::Ascending => 0,
                            Direction::Descending => children.len() - 1,
                        };
                        Some((idx, children[idx].clone()))
                    }
                };
                match edge {
                    Some((idx, grandchild)) => {
                        self.path.push((child, idx));
                        child = grandchild;
                    }
                    None => break,
                }
            }
            self.leaf = Some(child);
            return true;
        }
        self.leaf = None;
        false
    }

    fn within(&self, key: &[u8]) -> bool {
        match self.direction {
            Direction::Ascending => match &self.upper {
                Bound::Included(u) => key <= u.as_slice(),
                Bound::Excluded(u) => key < u.as_slice(),
                Bound::Unbounded => true,
            },
            Direction::Descending => match &self.lower {
                Bound::Included(l) => key >= l.as_slice(),
                Bound::Excluded(l) => key > l.as_slice(),
                Bound::Unbounded => true,
            },
        }
    }
}

impl Iterator for Seek {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        loop {
            let leaf = self.leaf.as_ref()?;
            let keys = match &leaf.body {
                NodeBody::Leaf(keys) => keys,
                NodeBody::Internal { .. } => return None,
            };
            let candidate = match self.direction {
                Direction::Ascending if self.pos < keys.len() => {
                    self.pos += 1;
                    Some(&keys[self.pos - 1])
                }
                Direction::Descending if self.pos > 0 => {
                    self.pos -= 1;
                    Some(&keys[self.pos])
                }
                _ => None,
            };
            match candidate {
                Some(key) if self.within(key) => return Some(key.clone()),
                Some(_) => {
                    self.leaf = None;
                    self.path.clear();
                    return None;
                }
                None => {
                    if !self.advance_leaf() {
                        return None;
                    }
                }
            }
        }
    }
}
