//! Structural verification and sampling

use super::node::{Node, NodeBody};
use super::Snapshot;
use crate::error::{IndexError, Result};
use crate::key;

/// Shape of a tree that passed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub entries: u64,
    pub leaves: u64,
    pub internal_nodes: u64,
    /// Levels from root to leaves, 1 for a lone leaf
    pub depth: usize,
}

/// Size statistics of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexSample {
    pub index_size: u64,
    pub unique_values: u64,
    pub sample_size: u64,
}

struct Walk<'a> {
    slots: usize,
    previous: Option<&'a [u8]>,
    leaf_depth: Option<usize>,
    report: ConsistencyReport,
}

/// Verify key order, separator bounds, uniform depth and key decoding
pub(crate) fn check_tree(root: &Node, slots: usize, expected_entries: u64) -> Result<ConsistencyReport> {
    let mut walk = Walk {
        slots,
        previous: None,
        leaf_depth: None,
        report: ConsistencyReport {
            entries: 0,
            leaves: 0,
            internal_nodes: 0,
            depth: 0,
        },
    };
    walk.visit(root, 1, None, None)?;
    walk.report.depth = walk.leaf_depth.unwrap_or(1);

    if walk.report.entries != expected_entries {
        return Err(IndexError::Corruption(format!(
            "Tree holds {} entries but {} are recorded",
            walk.report.entries, expected_entries
        )));
    }
    Ok(walk.report)
}

impl<'a> Walk<'a> {
    fn visit(
        &mut self,
        node: &'a Node,
        depth: usize,
        low: Option<&'a [u8]>,
        high: Option<&'a [u8]>,
    ) -> Result<()> {
        match &node.body {
            NodeBody::Leaf(keys) => {
                match self.leaf_depth {
                    Some(d) if d != depth => {
                        return Err(IndexError::Corruption(format!(
                            "Leaves at depth {} and {}",
                            d, depth
                        )))
                    }
                    _ => self.leaf_depth = Some(depth),
                }
                self.report.leaves += 1;
                for k in keys {
                    let k = k.as_slice();
                    if self.previous.map_or(false, |p| p >= k) {
                        return Err(IndexError::Corruption("Keys out of order".to_string()));
                    }
                    if low.map_or(false, |l| k < l) || high.map_or(false, |h| k >= h) {
                        return Err(IndexError::Corruption(
                            "Key outside its separator bounds".to_string(),
                        ));
                    }
                    key::decode_key(k, self.slots)?;
                    self.previous = Some(k);
                    self.report.entries += 1;
                }
            }
            NodeBody::Internal {
                separators,
                children,
            } => {
                if children.len() != separators.len() + 1 {
                    return Err(IndexError::Corruption(format!(
                        "Internal node with {} separators has {} children",
                        separators.len(),
                        children.len()
                    )));
                }
                if separators.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(IndexError::Corruption(
                        "Separators out of order".to_string(),
                    ));
                }
                self.report.internal_nodes += 1;
                for (i, child) in children.iter().enumerate() {
                    let child_low = if i == 0 { low } else { Some(separators[i - 1].as_slice()) };
                    let child_high = separators.get(i).map(|s| s.as_slice()).or(high);
                    self.visit(child, depth + 1, child_low, child_high)?;
                }
            }
        }
        Ok(())
    }
}

/// Count entries and distinct value tuples of a snapshot
pub(crate) fn sample(snapshot: &Snapshot) -> IndexSample {
    let mut unique = 0u64;
    let mut last: Option<Vec<u8>> = None;
    for k in snapshot.iter() {
        let prefix = key::value_prefix(&k).unwrap_or(&k);
        if last.as_deref() != Some(prefix) {
            unique += 1;
            last = Some(prefix.to_vec());
        }
    }
    IndexSample {
        index_size: snapshot.entry_count(),
        unique_values: unique,
        sample_size: snapshot.entry_count(),
    }
}
