//! Merge results.

use passtree_core::{NodeKind, UniqueId};
use std::time::Duration;

/// Why a source object was not inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Inserting or moving the group would exceed the depth limit, or the
    /// object sits inside a group skipped for that reason.
    DepthLimit,
    /// The identifier names a group on one side and an entry on the other,
    /// or the object sits inside a group skipped for that reason.
    KindConflict,
}

/// A source object the merge left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedObject {
    /// Identifier of the object.
    pub uuid: UniqueId,
    /// Kind of the object in the source.
    pub kind: NodeKind,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Result of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Groups created from the source.
    pub groups_created: usize,
    /// Existing groups whose properties were taken from the source.
    pub groups_updated: usize,
    /// Entries created from the source.
    pub entries_created: usize,
    /// Existing entries whose data was taken from the source.
    pub entries_updated: usize,
    /// Groups moved to the parent the source prefers.
    pub groups_relocated: usize,
    /// Entries moved to the parent the source prefers.
    pub entries_relocated: usize,
    /// Sibling lists whose order changed.
    pub lists_reordered: usize,
    /// Groups and entries removed by tombstones.
    pub objects_deleted: usize,
    /// History items created to keep the losing side of a conflict.
    pub backups_created: usize,
    /// Custom icons added or replaced.
    pub icons_merged: usize,
    /// Custom icons removed by tombstones.
    pub icons_deleted: usize,
    /// Source objects that were left out.
    pub skipped: Vec<SkippedObject>,
    /// `true` if the status logger asked to stop; the local database then
    /// holds a consistent but partial merge.
    pub cancelled: bool,
    /// Wall-clock time of the merge.
    pub duration: Duration,
}

impl MergeOutcome {
    /// Total number of tree objects created, updated, moved or deleted.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.groups_created
            + self.groups_updated
            + self.entries_created
            + self.entries_updated
            + self.groups_relocated
            + self.entries_relocated
            + self.objects_deleted
    }

    /// Returns `true` if the merge ran to the end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }

    pub(crate) fn skip(&mut self, uuid: UniqueId, kind: NodeKind, reason: SkipReason) {
        self.skipped.push(SkippedObject { uuid, kind, reason });
    }
}
