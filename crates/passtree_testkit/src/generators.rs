//! Property-based test generators using proptest.
//!
//! Databases are generated from a list of build steps so that shrinking
//! works on the steps; identifiers themselves are random.

use crate::fixtures::{account, edit_title, move_entry, move_group, ts, TestClock};
use passtree_core::{CoreResult, Database, Group, Timestamp, UniqueId};
use proptest::prelude::*;

/// Strategy for entry titles and group names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,7}").expect("Invalid regex")
}

/// One step of building a database.
#[derive(Debug, Clone)]
pub enum BuildStep {
    /// Add a group below the `parent`-th existing group.
    Group {
        /// Picks the parent, modulo the number of groups.
        parent: usize,
        /// Group name.
        name: String,
    },
    /// Add an entry below the `parent`-th existing group.
    Entry {
        /// Picks the parent, modulo the number of groups.
        parent: usize,
        /// Entry title.
        title: String,
    },
}

/// Strategy for a single build step.
pub fn build_step_strategy() -> impl Strategy<Value = BuildStep> {
    prop_oneof![
        1 => (any::<usize>(), name_strategy())
            .prop_map(|(parent, name)| BuildStep::Group { parent, name }),
        2 => (any::<usize>(), name_strategy())
            .prop_map(|(parent, title)| BuildStep::Entry { parent, title }),
    ]
}

/// Builds a database by applying `steps` at [`ts`]`(0)`.
pub fn build_database(steps: &[BuildStep]) -> CoreResult<Database> {
    let at = ts(0);
    let mut db = Database::new("generated", at);
    for step in steps {
        let groups = all_groups(&db);
        match step {
            BuildStep::Group { parent, name } => {
                let parent = groups[parent % groups.len()];
                db.tree.add_group(parent, Group::new(name.clone(), at))?;
            }
            BuildStep::Entry { parent, title } => {
                let parent = groups[parent % groups.len()];
                db.add_entry(parent, account(title, "user", "secret", at))?;
            }
        }
    }
    Ok(db)
}

/// Strategy for databases with up to `max_steps` groups and entries.
pub fn database_strategy(max_steps: usize) -> impl Strategy<Value = Database> {
    prop::collection::vec(build_step_strategy(), 0..max_steps).prop_map(|steps| {
        build_database(&steps).expect("generated steps stay within limits")
    })
}

/// An edit applied to one replica.
#[derive(Debug, Clone)]
pub enum EditOp {
    /// Add an entry below a picked group.
    AddEntry {
        /// Picks the parent group.
        group: usize,
        /// Entry title.
        title: String,
    },
    /// Retitle a picked entry.
    EditEntry {
        /// Picks the entry.
        entry: usize,
        /// New title.
        title: String,
    },
    /// Move a picked entry to a picked group.
    MoveEntry {
        /// Picks the entry.
        entry: usize,
        /// Picks the target group.
        group: usize,
    },
    /// Move a picked group below another picked group (cycles are skipped).
    MoveGroup {
        /// Picks the group to move.
        group: usize,
        /// Picks the target group.
        target: usize,
    },
    /// Delete a picked entry, leaving a tombstone.
    DeleteEntry {
        /// Picks the entry.
        entry: usize,
    },
    /// Rotate the entries of a picked group by one.
    RotateEntries {
        /// Picks the group.
        group: usize,
    },
}

/// Strategy for a single edit.
pub fn edit_op_strategy() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        3 => (any::<usize>(), name_strategy())
            .prop_map(|(group, title)| EditOp::AddEntry { group, title }),
        3 => (any::<usize>(), name_strategy())
            .prop_map(|(entry, title)| EditOp::EditEntry { entry, title }),
        2 => (any::<usize>(), any::<usize>())
            .prop_map(|(entry, group)| EditOp::MoveEntry { entry, group }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(group, target)| EditOp::MoveGroup { group, target }),
        1 => any::<usize>().prop_map(|entry| EditOp::DeleteEntry { entry }),
        1 => any::<usize>().prop_map(|group| EditOp::RotateEntries { group }),
    ]
}

/// Strategy for a sequence of edits.
pub fn edit_script_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<EditOp>> {
    prop::collection::vec(edit_op_strategy(), min_ops..max_ops)
}

/// Applies every edit in order, taking one clock tick per edit. Edits
/// whose picks resolve to nothing are skipped.
pub fn apply_edits(db: &mut Database, ops: &[EditOp], clock: &mut TestClock) -> CoreResult<()> {
    for op in ops {
        let at = clock.tick();
        apply_edit(db, op, at)?;
    }
    Ok(())
}

/// Applies one edit at `at`.
pub fn apply_edit(db: &mut Database, op: &EditOp, at: Timestamp) -> CoreResult<()> {
    let groups = all_groups(db);
    let entries = db.tree.entries_recursive(db.tree.root_id());
    let pick_entry = |i: usize| (!entries.is_empty()).then(|| entries[i % entries.len()]);
    let pick_group = |i: usize| groups[i % groups.len()];

    match op {
        EditOp::AddEntry { group, title } => {
            db.add_entry(pick_group(*group), account(title, "user", "secret", at))?;
        }
        EditOp::EditEntry { entry, title } => {
            if let Some(id) = pick_entry(*entry) {
                edit_title(db, id, title, at);
            }
        }
        EditOp::MoveEntry { entry, group } => {
            let target = pick_group(*group);
            if let Some(id) = pick_entry(*entry) {
                if db.tree.parent_of(id) != Some(target) {
                    move_entry(db, id, target, at)?;
                }
            }
        }
        EditOp::MoveGroup { group, target } => {
            let (id, target) = (pick_group(*group), pick_group(*target));
            let movable = id != db.tree.root_id()
                && id != target
                && !db.tree.is_contained_in(target, id)
                && db.tree.parent_of(id) != Some(target)
                && db.tree.can_add_group(target, db.tree.height(id));
            if movable {
                move_group(db, id, target, at)?;
            }
        }
        EditOp::DeleteEntry { entry } => {
            if let Some(id) = pick_entry(*entry) {
                db.delete_entry(id, at)?;
            }
        }
        EditOp::RotateEntries { group } => {
            let id = pick_group(*group);
            let mut order = db
                .tree
                .group(id)
                .map(|g| g.entries().to_vec())
                .unwrap_or_default();
            if order.len() > 1 {
                order.rotate_left(1);
                db.tree.set_entry_order(id, order.clone())?;
                for e in order {
                    if let Some(entry) = db.tree.entry_mut(e) {
                        entry.times.location_changed = at;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Root followed by every group in [`Tree::groups_recursive`] order.
///
/// [`Tree::groups_recursive`]: passtree_core::Tree::groups_recursive
fn all_groups(db: &Database) -> Vec<UniqueId> {
    let root = db.tree.root_id();
    let mut groups = vec![root];
    groups.extend(db.tree.groups_recursive(root));
    groups
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
