//! Sibling order reconciliation and location-changed settlement.
//!
//! A sibling list is cut into blocks of objects that are adjacent in both
//! snapshots. Blocks are then sorted around a pivot: the block that moved
//! most recently keeps the position its own snapshot gives it, and every
//! other block is placed before or after it according to that snapshot.
//! Ranges on either side are handled the same way until nothing is left.

use crate::engine::{Merge, PoolSide};
use crate::error::MergeResult;
use crate::pool::ObjectPool;
use passtree_core::time::{Timestamp, MIN_TIME};
use passtree_core::{NodeKind, UniqueId};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Objects that stay adjacent, tagged with the most recent move among them.
#[derive(Debug)]
struct Block {
    items: Vec<UniqueId>,
    location_changed: Timestamp,
    side: Option<PoolSide>,
}

impl Block {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            location_changed: MIN_TIME,
            side: None,
        }
    }

    fn add(&mut self, id: UniqueId, best: Option<(PoolSide, Timestamp)>) {
        self.items.push(id);
        if let Some((side, location_changed)) = best {
            if location_changed > self.location_changed {
                self.location_changed = location_changed;
                self.side = Some(side);
            }
        }
    }

    fn primary(&self) -> UniqueId {
        self.items[0]
    }
}

/// Id of `target` if it follows `from` in `pool` with only objects outside
/// `list` in between.
fn next_in_pool(pool: &ObjectPool, from: u64, target: UniqueId, list: &HashSet<UniqueId>) -> Option<u64> {
    let mut id = from + 1;
    loop {
        let item = pool.item_at(id)?;
        if item.uuid == target {
            return Some(id);
        }
        if list.contains(&item.uuid) {
            return None;
        }
        id += 1;
    }
}

impl Merge<'_> {
    /// Reorders the subgroups and entries of `group`, then recurses.
    pub(crate) fn reorder_objects(&mut self, group: UniqueId) -> MergeResult<()> {
        let Some(g) = self.local.tree.group(group) else {
            return Ok(());
        };
        let groups = g.groups().to_vec();
        let entries = g.entries().to_vec();

        if let Some(order) = self.reorder_list(&groups) {
            self.local.tree.set_group_order(group, order)?;
            self.outcome.lists_reordered += 1;
        }
        if let Some(order) = self.reorder_list(&entries) {
            self.local.tree.set_entry_order(group, order)?;
            self.outcome.lists_reordered += 1;
        }
        if self.outcome.cancelled {
            return Ok(());
        }

        let subgroups = self
            .local
            .tree
            .group(group)
            .map(|g| g.groups().to_vec())
            .unwrap_or_default();
        for sub in subgroups {
            self.reorder_objects(sub)?;
            if self.outcome.cancelled {
                break;
            }
        }
        Ok(())
    }

    /// New order for `list`, or `None` if it stays as it is.
    fn reorder_list(&mut self, list: &[UniqueId]) -> Option<Vec<UniqueId>> {
        let mut blocks = self.partition_consecutive(list);
        if blocks.len() <= 1 {
            return None;
        }

        let mut ranges = VecDeque::from([(0, blocks.len() - 1)]);
        while let Some((lo, hi)) = ranges.pop_front() {
            if !self.keep_going() {
                break;
            }
            if lo >= hi {
                continue;
            }

            let mut pivot = lo;
            let mut latest = MIN_TIME;
            let mut side = None;
            for (i, block) in blocks.iter().enumerate().take(hi + 1).skip(lo) {
                if block.location_changed > latest {
                    pivot = i;
                    latest = block.location_changed;
                    side = block.side;
                }
            }
            let Some(side) = side else {
                continue;
            };
            let pool = self.pool(side);
            let id_pivot = pool.id_of(blocks[pivot].primary());
            if id_pivot == 0 {
                continue;
            }

            let mut before = Vec::new();
            let mut after = Vec::new();
            for i in lo..=hi {
                if i == pivot {
                    continue;
                }
                let id = pool.id_of(blocks[i].primary());
                let goes_before = if id > 0 { id < id_pivot } else { i < pivot };
                if goes_before {
                    before.push(i - lo);
                } else {
                    after.push(i - lo);
                }
            }

            let new_pivot = lo + before.len();
            let mut range: Vec<Option<Block>> = blocks.drain(lo..=hi).map(Some).collect();
            let sorted: Vec<Block> = before
                .iter()
                .chain(std::iter::once(&(pivot - lo)))
                .chain(after.iter())
                .filter_map(|&i| range[i].take())
                .collect();
            blocks.splice(lo..lo, sorted);

            if new_pivot > lo + 1 {
                ranges.push_back((lo, new_pivot - 1));
            }
            if new_pivot + 1 < hi {
                ranges.push_back((new_pivot + 1, hi));
            }
        }

        let order: Vec<UniqueId> = blocks.into_iter().flat_map(|b| b.items).collect();
        (order != list).then_some(order)
    }

    /// Cuts `list` into maximal runs that are consecutive in both
    /// snapshots (objects outside `list` may sit in between).
    fn partition_consecutive(&self, list: &[UniqueId]) -> Vec<Block> {
        let members: HashSet<UniqueId> = list.iter().copied().collect();
        let mut blocks = Vec::new();

        let mut u = 0;
        while u < list.len() {
            let mut block = Block::new();
            block.add(list[u], self.best_side(list[u]));

            let mut id_org = self.org.id_of(list[u]);
            let mut id_src = self.src.id_of(list[u]);
            if id_org != 0 && id_src != 0 {
                for &next in &list[u + 1..] {
                    let Some(next_org) = next_in_pool(&self.org, id_org, next, &members) else {
                        break;
                    };
                    let Some(next_src) = next_in_pool(&self.src, id_src, next, &members) else {
                        break;
                    };
                    block.add(next, self.best_side(next));
                    id_org = next_org;
                    id_src = next_src;
                    u += 1;
                }
            }

            blocks.push(block);
            u += 1;
        }
        blocks
    }

    fn best_side(&self, id: UniqueId) -> Option<(PoolSide, Timestamp)> {
        self.best_pool(id)
            .map(|(side, best)| (side, best.location_changed))
    }

    /// Gives every local object the location-changed time and previous
    /// parent of the snapshot that saw its most recent move.
    pub(crate) fn merge_location_changed(&mut self) {
        let nodes: Vec<(UniqueId, NodeKind)> = self
            .local
            .tree
            .pre_order()
            .map(|(node, _)| (node.uuid(), node.kind()))
            .collect();

        let mut updated = 0usize;
        for (id, kind) in nodes {
            let Some((_, best)) = self.best_pool(id) else {
                continue;
            };
            let (times, previous_parent) = match kind {
                NodeKind::Group => match self.local.tree.group_mut(id) {
                    Some(g) => (&mut g.times, &mut g.previous_parent),
                    None => continue,
                },
                NodeKind::Entry => match self.local.tree.entry_mut(id) {
                    Some(e) => (&mut e.times, &mut e.previous_parent),
                    None => continue,
                },
            };
            if times.location_changed != best.location_changed
                || *previous_parent != best.previous_parent
            {
                updated += 1;
            }
            times.location_changed = best.location_changed;
            *previous_parent = best.previous_parent;
        }
        debug!(updated, "settled location-changed times");
    }
}
