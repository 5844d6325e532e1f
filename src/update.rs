//! Index entry updates
//!
//! One update describes how a single entity's indexed value tuple changed in
//! a committed transaction.

use crate::error::Result;
use crate::key;
use crate::merger::{ConflictReporter, ConflictTracker, ValueMerger};
use crate::store::StoreWriter;
use crate::value::Value;

/// Kind of change an update describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    Added,
    Changed,
    Removed,
}

/// Change of one entity's value tuple
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntryUpdate {
    pub entity_id: u64,
    pub mode: UpdateMode,
    /// Tuple before the change; empty for `Added`
    pub before: Vec<Value>,
    /// Tuple after the change; empty for `Removed`
    pub after: Vec<Value>,
}

impl IndexEntryUpdate {
    pub fn add(entity_id: u64, values: Vec<Value>) -> Self {
        Self {
            entity_id,
            mode: UpdateMode::Added,
            before: Vec::new(),
            after: values,
        }
    }

    pub fn change(entity_id: u64, before: Vec<Value>, after: Vec<Value>) -> Self {
        Self {
            entity_id,
            mode: UpdateMode::Changed,
            before,
            after,
        }
    }

    pub fn remove(entity_id: u64, values: Vec<Value>) -> Self {
        Self {
            entity_id,
            mode: UpdateMode::Removed,
            before: values,
            after: Vec::new(),
        }
    }

    /// Key that has to disappear from the index, if any
    pub(crate) fn removed_key(&self) -> Result<Option<Vec<u8>>> {
        match self.mode {
            UpdateMode::Added => Ok(None),
            UpdateMode::Changed | UpdateMode::Removed => {
                key::encode_key(&self.before, self.entity_id).map(Some)
            }
        }
    }

    /// Key that has to appear in the index, if any
    pub(crate) fn added_key(&self) -> Result<Option<Vec<u8>>> {
        match self.mode {
            UpdateMode::Removed => Ok(None),
            UpdateMode::Added | UpdateMode::Changed => {
                key::encode_key(&self.after, self.entity_id).map(Some)
            }
        }
    }
}

/// Apply a batch through a store writer: every removal first, then every
/// addition through the merger. With a reporter, the first conflicting
/// addition fails the batch; the caller rolls the writer back.
pub(crate) fn apply_updates(
    writer: &mut StoreWriter<'_>,
    updates: &[IndexEntryUpdate],
    merger: &dyn ValueMerger,
    reporter: Option<&ConflictReporter>,
) -> Result<()> {
    for update in updates {
        if let Some(removed) = update.removed_key()? {
            writer.remove_prefix(key::entity_prefix(&removed)?)?;
        }
    }

    let mut tracker = reporter.map(|r| ConflictTracker::new(r.clone()));
    for update in updates {
        if let Some(added) = update.added_key()? {
            let report = writer.merge_insert(&added, merger)?;
            if let Some(tracker) = tracker.as_mut() {
                tracker.record(report.conflict);
                tracker.check_conflict(&update.after)?;
            }
        }
    }
    Ok(())
}
