//! Test fixtures: a fixed clock, sample databases and replica pairs.

use chrono::{Duration, TimeZone, Utc};
use passtree_core::{fields, CoreResult, Database, Entry, Group, Timestamp, UniqueId};

/// Fixed point every fixture time is measured from (2024-01-01 00:00 UTC).
pub fn epoch() -> Timestamp {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or_default()
}

/// `hours` after [`epoch`].
pub fn ts(hours: i64) -> Timestamp {
    epoch() + Duration::hours(hours)
}

/// Deterministic clock that moves forward one minute per tick.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Timestamp,
}

impl TestClock {
    /// Starts the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self { now: start }
    }

    /// Current time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Advances the clock and returns the new time.
    pub fn tick(&mut self) -> Timestamp {
        self.now += Duration::minutes(1);
        self.now
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(epoch())
    }
}

/// Entry with title, user name and a protected password, created at `at`.
pub fn account(title: &str, user: &str, password: &str, at: Timestamp) -> Entry {
    let mut e = Entry::new(at);
    e.set_text(fields::TITLE, false, title);
    e.set_text(fields::USER_NAME, false, user);
    e.set_text(fields::PASSWORD, true, password);
    e
}

/// Title of an entry, or an empty string.
pub fn title_of(entry: &Entry) -> String {
    entry.get_string_safe(fields::TITLE).read_string().to_string()
}

/// Titles of the entries directly inside `group`, in order.
pub fn entry_titles(db: &Database, group: UniqueId) -> Vec<String> {
    db.tree
        .group(group)
        .map(|g| {
            g.entries()
                .iter()
                .filter_map(|id| db.tree.entry(*id))
                .map(title_of)
                .collect()
        })
        .unwrap_or_default()
}

/// `(id, parent, index in parent)` of every node, in pre-order.
///
/// Two databases with equal shapes hold the same nodes at the same
/// positions.
pub fn tree_shape(db: &Database) -> Vec<(UniqueId, Option<UniqueId>, usize)> {
    db.tree
        .pre_order()
        .map(|(node, _)| {
            let id = node.uuid();
            (id, db.tree.parent_of(id), db.tree.index_in_parent(id).unwrap_or(0))
        })
        .collect()
}

/// Handles into [`sample_database`].
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    /// Root group.
    pub root: UniqueId,
    /// "General" group.
    pub general: UniqueId,
    /// "Work" group.
    pub work: UniqueId,
    /// "Mail" entry in General.
    pub mail: UniqueId,
    /// "Bank" entry in General.
    pub bank: UniqueId,
    /// "VPN" entry in Work.
    pub vpn: UniqueId,
}

/// Small database: root with groups General (Mail, Bank) and Work (VPN),
/// every object created at `at`.
pub fn sample_database(at: Timestamp) -> (Database, SampleIds) {
    try_sample_database(at).unwrap_or_else(|e| panic!("sample database: {e}"))
}

fn try_sample_database(at: Timestamp) -> CoreResult<(Database, SampleIds)> {
    let mut db = Database::new("vault", at);
    let root = db.tree.root_id();
    let general = db.tree.add_group(root, Group::new("General", at))?;
    let work = db.tree.add_group(root, Group::new("Work", at))?;
    let mail = db.add_entry(general, account("Mail", "alice", "m41l", at))?;
    let bank = db.add_entry(general, account("Bank", "alice", "b4nk", at))?;
    let vpn = db.add_entry(work, account("VPN", "alice", "vpn!", at))?;
    Ok((
        db,
        SampleIds {
            root,
            general,
            work,
            mail,
            bank,
            vpn,
        },
    ))
}

/// Two replicas of one database that are edited independently.
#[derive(Debug, Clone)]
pub struct ReplicaPair {
    /// Replica that receives merges.
    pub local: Database,
    /// Replica merged into `local`.
    pub remote: Database,
}

impl ReplicaPair {
    /// Two identical copies of `db`.
    pub fn new(db: Database) -> Self {
        Self {
            local: db.clone(),
            remote: db,
        }
    }
}

/// Records an edit of entry `id`: backs up the old state, sets the title
/// and marks the entry modified at `at`.
pub fn edit_title(db: &mut Database, id: UniqueId, title: &str, at: Timestamp) {
    if let Some(e) = db.tree.entry_mut(id) {
        e.create_backup(None);
        e.set_text(fields::TITLE, false, title);
        e.touch(true, at);
    }
}

/// Moves entry `id` to the end of `parent`, recording the move at `at`.
pub fn move_entry(db: &mut Database, id: UniqueId, parent: UniqueId, at: Timestamp) -> CoreResult<()> {
    let old = db.tree.parent_of(id).unwrap_or(UniqueId::ZERO);
    db.tree.move_entry(id, parent, None)?;
    if let Some(e) = db.tree.entry_mut(id) {
        e.previous_parent = old;
        e.times.location_changed = at;
    }
    Ok(())
}

/// Moves group `id` to the end of `parent`, recording the move at `at`.
pub fn move_group(db: &mut Database, id: UniqueId, parent: UniqueId, at: Timestamp) -> CoreResult<()> {
    let old = db.tree.parent_of(id).unwrap_or(UniqueId::ZERO);
    db.tree.move_group(id, parent, None)?;
    if let Some(g) = db.tree.group_mut(id) {
        g.previous_parent = old;
        g.times.location_changed = at;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ticks_by_minutes() {
        let mut clock = TestClock::default();
        assert_eq!(clock.now(), epoch());
        assert_eq!(clock.tick(), epoch() + Duration::minutes(1));
        assert_eq!(ts(2) - ts(0), Duration::hours(2));
    }

    #[test]
    fn sample_database_layout() {
        let (db, ids) = sample_database(ts(0));
        assert_eq!(db.tree.counts(), (2, 3));
        assert_eq!(entry_titles(&db, ids.general), ["Mail", "Bank"]);
        assert_eq!(db.tree.parent_of(ids.vpn), Some(ids.work));
        db.check_invariants().unwrap();
    }

    #[test]
    fn moves_record_previous_parent() {
        let (mut db, ids) = sample_database(ts(0));
        move_entry(&mut db, ids.mail, ids.work, ts(1)).unwrap();
        let mail = db.tree.entry(ids.mail).unwrap();
        assert_eq!(mail.previous_parent, ids.general);
        assert_eq!(mail.times.location_changed, ts(1));
        assert_eq!(entry_titles(&db, ids.work), ["VPN", "Mail"]);
    }
}
