//! Merge scenarios across two replicas.

use passtree_core::{
    fields, CborPersistence, CoreError, CustomIcon, Database, DeletedObject, Group,
    RecordingStatusLogger, StatusLogger, TreePersistence, UniqueId, MAX_DEPTH,
};
use passtree_sync::{
    merge_in, synchronize, MergeConfig, MergeEngine, MergeError, MergeMethod, SkipReason,
};
use passtree_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn title(db: &Database, id: UniqueId) -> String {
    title_of(db.tree.entry(id).unwrap())
}

#[test]
fn synchronizing_a_clone_changes_nothing() {
    init_tracing();
    let (mut local, ids) = sample_database(ts(0));
    edit_title(&mut local, ids.mail, "Mail (old)", ts(1));
    local.delete_entry(ids.bank, ts(2)).unwrap();
    let before = tree_shape(&local);
    let tombstones = local.deleted_objects.clone();

    let replica = local.clone();
    let outcome = synchronize(&mut local, &replica, None).unwrap();

    assert_eq!(outcome.changes(), 0);
    assert_eq!(outcome.lists_reordered, 0);
    assert_eq!(outcome.backups_created, 0);
    assert!(outcome.is_complete());
    assert_eq!(tree_shape(&local), before);
    assert_eq!(local.deleted_objects, tombstones);
}

#[test]
fn newer_sibling_order_wins() {
    let mut local = Database::new("vault", ts(0));
    let root = local.tree.root_id();
    let a = local.add_entry(root, account("A", "u", "p", ts(0))).unwrap();
    let b = local.add_entry(root, account("B", "u", "p", ts(0))).unwrap();
    let c = local.add_entry(root, account("C", "u", "p", ts(0))).unwrap();

    let mut remote = local.clone();
    remote.tree.set_entry_order(root, vec![c, a, b]).unwrap();
    remote.tree.root_mut().times.location_changed = ts(1);
    remote.tree.entry_mut(c).unwrap().times.location_changed = ts(1);

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(entry_titles(&local, root), ["C", "A", "B"]);
    assert_eq!(outcome.lists_reordered, 1);
    assert_eq!(local.tree.entry(c).unwrap().times.location_changed, ts(1));
}

#[test]
fn group_move_time_alone_does_not_reorder_entries() {
    let mut local = Database::new("vault", ts(0));
    let root = local.tree.root_id();
    let a = local.add_entry(root, account("A", "u", "p", ts(0))).unwrap();
    let b = local.add_entry(root, account("B", "u", "p", ts(0))).unwrap();
    let c = local.add_entry(root, account("C", "u", "p", ts(0))).unwrap();

    // only the container is stamped; no entry carries a newer move
    let mut remote = local.clone();
    remote.tree.set_entry_order(root, vec![c, a, b]).unwrap();
    remote.tree.root_mut().times.location_changed = ts(1);

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(entry_titles(&local, root), ["A", "B", "C"]);
    assert_eq!(outcome.lists_reordered, 0);
    assert_eq!(local.tree.root().times.location_changed, ts(1));
}

#[test]
fn older_sibling_order_loses() {
    let mut local = Database::new("vault", ts(0));
    let root = local.tree.root_id();
    let a = local.add_entry(root, account("A", "u", "p", ts(0))).unwrap();
    let b = local.add_entry(root, account("B", "u", "p", ts(0))).unwrap();
    let mut remote = local.clone();

    local.tree.set_entry_order(root, vec![b, a]).unwrap();
    local.tree.entry_mut(b).unwrap().times.location_changed = ts(3);
    remote.tree.entry_mut(a).unwrap().times.location_changed = ts(2);

    synchronize(&mut local, &remote, None).unwrap();
    assert_eq!(entry_titles(&local, root), ["B", "A"]);
}

#[test]
fn moved_entry_follows_newer_location() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    let archive = remote
        .tree
        .add_group(ids.root, Group::new("Archive", ts(1)))
        .unwrap();
    move_entry(&mut remote, ids.mail, archive, ts(1)).unwrap();

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(local.tree.group(archive).unwrap().name, "Archive");
    assert_eq!(local.tree.parent_of(ids.mail), Some(archive));
    assert_eq!(outcome.groups_created, 1);
    assert_eq!(outcome.entries_relocated, 1);
    let mail = local.tree.entry(ids.mail).unwrap();
    assert_eq!(mail.times.location_changed, ts(1));
    assert_eq!(mail.previous_parent, ids.general);
}

#[test]
fn crossing_group_moves_never_form_a_cycle() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    move_group(&mut local, ids.general, ids.work, ts(1)).unwrap();
    move_group(&mut remote, ids.work, ids.general, ts(2)).unwrap();

    synchronize(&mut local, &remote, None).unwrap();

    local.check_invariants().unwrap();
    assert_eq!(local.tree.parent_of(ids.general), Some(ids.work));
    assert_eq!(local.tree.parent_of(ids.work), Some(ids.root));
}

#[test]
fn tombstone_removes_older_entry() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    remote.delete_entry(ids.mail, ts(2)).unwrap();

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert!(local.tree.entry(ids.mail).is_none());
    assert_eq!(outcome.objects_deleted, 1);
    assert_eq!(
        local.deleted_objects,
        vec![DeletedObject::new(ids.mail, ts(2))]
    );
}

#[test]
fn entry_edited_after_deletion_survives() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    remote.delete_entry(ids.mail, ts(2)).unwrap();
    edit_title(&mut local, ids.mail, "Mail (kept)", ts(3));

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(title(&local, ids.mail), "Mail (kept)");
    assert_eq!(outcome.objects_deleted, 0);
    assert!(local.deleted_objects.is_empty());
}

#[test]
fn later_deletion_time_wins() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    local.delete_entry(ids.mail, ts(2)).unwrap();
    remote.delete_entry(ids.mail, ts(5)).unwrap();

    synchronize(&mut local, &remote, None).unwrap();
    assert_eq!(
        local.deleted_objects,
        vec![DeletedObject::new(ids.mail, ts(5))]
    );
}

#[test]
fn group_with_surviving_children_is_kept() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    remote.delete_group(ids.work, ts(2)).unwrap();
    edit_title(&mut local, ids.vpn, "VPN (new)", ts(3));

    synchronize(&mut local, &remote, None).unwrap();

    assert!(local.tree.group(ids.work).is_some());
    assert!(local.tree.entry(ids.vpn).is_some());
    assert!(local.deleted_objects.is_empty());
}

#[test]
fn newer_remote_edit_wins_and_local_version_is_kept_in_history() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    edit_title(&mut local, ids.mail, "Mail (local)", ts(1));
    edit_title(&mut remote, ids.mail, "Mail (remote)", ts(2));

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(title(&local, ids.mail), "Mail (remote)");
    let history: Vec<String> = local
        .tree
        .entry(ids.mail)
        .unwrap()
        .history()
        .iter()
        .map(title_of)
        .collect();
    assert_eq!(history, ["Mail", "Mail (local)"]);
    assert_eq!(outcome.entries_updated, 1);
    assert_eq!(outcome.backups_created, 1);
}

#[test]
fn newer_local_edit_wins_and_remote_version_is_kept_in_history() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    edit_title(&mut local, ids.mail, "Mail (local)", ts(2));
    edit_title(&mut remote, ids.mail, "Mail (remote)", ts(1));

    let outcome = synchronize(&mut local, &remote, None).unwrap();
    assert_eq!(title(&local, ids.mail), "Mail (local)");
    let history: Vec<String> = local
        .tree
        .entry(ids.mail)
        .unwrap()
        .history()
        .iter()
        .map(title_of)
        .collect();
    assert_eq!(history, ["Mail", "Mail (remote)"]);
    assert_eq!(outcome.entries_updated, 0);

    // the remote version is already in history now
    let again = synchronize(&mut local, &remote, None).unwrap();
    assert_eq!(again.backups_created, 0);
    assert_eq!(local.tree.entry(ids.mail).unwrap().history().len(), 2);
}

#[test]
fn overwrite_existing_takes_older_source() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    edit_title(&mut local, ids.mail, "Mail (local)", ts(2));
    edit_title(&mut remote, ids.mail, "Mail (remote)", ts(1));

    merge_in(&mut local, &mut remote, MergeMethod::OverwriteExisting, None).unwrap();

    let mail = local.tree.entry(ids.mail).unwrap();
    assert_eq!(title_of(mail), "Mail (remote)");
    assert!(mail.history().iter().any(|h| title_of(h) == "Mail (local)"));
}

#[test]
fn keep_existing_only_adds() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    edit_title(&mut remote, ids.mail, "Mail (remote)", ts(2));
    remote.delete_entry(ids.bank, ts(2)).unwrap();
    let added = remote
        .add_entry(ids.work, account("Wiki", "bob", "w1k1", ts(2)))
        .unwrap();
    remote.meta.name = "renamed".into();
    remote.meta.name_changed = ts(2);

    let outcome = merge_in(&mut local, &mut remote, MergeMethod::KeepExisting, None).unwrap();

    assert_eq!(title(&local, ids.mail), "Mail");
    assert!(local.tree.entry(ids.bank).is_some());
    assert_eq!(local.tree.parent_of(added), Some(ids.work));
    assert_eq!(local.meta.name, "vault");
    assert_eq!(outcome.entries_created, 1);
    assert_eq!(outcome.entries_updated, 0);
}

#[test]
fn overwrite_if_newer_ignores_older_source() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    edit_title(&mut local, ids.mail, "Mail (local)", ts(3));
    edit_title(&mut remote, ids.mail, "Mail (remote)", ts(1));
    edit_title(&mut remote, ids.vpn, "VPN (remote)", ts(1));

    merge_in(&mut local, &mut remote, MergeMethod::OverwriteIfNewer, None).unwrap();

    assert_eq!(title(&local, ids.mail), "Mail (local)");
    assert_eq!(title(&local, ids.vpn), "VPN (remote)");
}

#[test]
fn import_as_copy_creates_disjoint_objects() {
    let (mut local, ids) = sample_database(ts(0));
    let mut copy = local.clone();

    let outcome = merge_in(&mut local, &mut copy, MergeMethod::CreateNewUuids, None).unwrap();

    // the copied root arrives as an empty group; its children land in the
    // local root next to it
    assert_eq!(local.tree.counts(), (5, 6));
    assert_eq!(outcome.groups_created, 3);
    assert_eq!(outcome.entries_created, 3);
    let imported_root = copy.tree.root_id();
    assert_ne!(imported_root, ids.root);
    assert_eq!(local.tree.root().groups()[2], imported_root);
    assert!(local.tree.group(imported_root).unwrap().is_empty());
    assert_eq!(local.tree.root().groups().len(), 5);
    assert_eq!(entry_titles(&local, ids.general), ["Mail", "Bank"]);
    local.check_invariants().unwrap();
}

#[test]
fn new_objects_keep_their_neighbours() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    let between = remote
        .add_entry(ids.general, account("Between", "u", "p", ts(1)))
        .unwrap();
    remote
        .tree
        .move_entry(between, ids.general, Some(1))
        .unwrap();

    synchronize(&mut local, &remote, None).unwrap();
    assert_eq!(entry_titles(&local, ids.general), ["Mail", "Between", "Bank"]);
}

#[test]
fn cancellation_stops_early_and_leaves_a_valid_tree() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    for i in 0..5 {
        remote
            .add_entry(ids.work, account(&format!("New {i}"), "u", "p", ts(1)))
            .unwrap();
    }

    let logger = RecordingStatusLogger::new().cancel_after_polls(0);
    let outcome = synchronize(&mut local, &remote, Some(&logger as &dyn StatusLogger)).unwrap();

    assert!(outcome.cancelled);
    assert!(!outcome.is_complete());
    assert_eq!(outcome.entries_created, 0);
    assert_eq!(logger.operation(), "merge");
    assert!(logger.ended());
    local.check_invariants().unwrap();
}

#[test]
fn cancellation_midway_keeps_partial_progress() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    for i in 0..5 {
        remote
            .add_entry(ids.work, account(&format!("New {i}"), "u", "p", ts(1)))
            .unwrap();
    }

    // root, General, Mail, Bank, Work, VPN, New 0 ...
    let logger = RecordingStatusLogger::new().cancel_after_polls(7);
    let outcome = synchronize(&mut local, &remote, Some(&logger as &dyn StatusLogger)).unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.entries_created, 2);
    assert_eq!(local.tree.counts(), (2, 5));
    local.check_invariants().unwrap();
}

#[test]
fn too_deep_insertion_is_skipped() {
    let mut local = Database::new("vault", ts(0));
    let mut parent = local.tree.root_id();
    for depth in 1..=MAX_DEPTH {
        parent = local
            .tree
            .add_group(parent, Group::new(format!("level {depth}"), ts(0)))
            .unwrap();
    }
    let deepest = parent;

    let mut remote = local.clone();
    let root = remote.tree.root_id();
    remote.tree.move_group(deepest, root, None).unwrap();
    let child = remote
        .tree
        .add_group(deepest, Group::new("child", ts(1)))
        .unwrap();
    let grandchild = remote
        .tree
        .add_group(child, Group::new("grandchild", ts(1)))
        .unwrap();
    let inside = remote
        .add_entry(child, account("Inside", "u", "p", ts(1)))
        .unwrap();
    let sibling = remote
        .add_entry(root, account("Fits", "u", "p", ts(1)))
        .unwrap();

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert!(local.tree.group(child).is_none());
    assert!(local.tree.entry(sibling).is_some());
    // the content of the skipped group is not re-homed anywhere else
    assert!(local.tree.group(grandchild).is_none());
    assert!(local.tree.entry(inside).is_none());
    assert_eq!(entry_titles(&local, root), ["Fits"]);
    assert_eq!(local.tree.root().groups().len(), 1);

    assert_eq!(outcome.skipped[0].uuid, child);
    let skipped: HashSet<UniqueId> = outcome.skipped.iter().map(|s| s.uuid).collect();
    assert_eq!(skipped, HashSet::from([child, grandchild, inside]));
    assert!(outcome
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::DepthLimit));
    local.check_invariants().unwrap();
}

#[test]
fn identifier_used_for_different_kinds_is_skipped() {
    let mut local = Database::new("vault", ts(0));
    let mut remote = local.clone();
    let shared = UniqueId::new();
    let root = local.tree.root_id();
    local
        .tree
        .add_group(root, Group::with_uuid(shared, "group", ts(0)))
        .unwrap();
    let mut entry = passtree_core::Entry::with_uuid(shared, ts(0));
    entry.set_text(fields::TITLE, false, "entry");
    remote.tree.add_entry(root, entry).unwrap();

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(outcome.skipped[0].reason, SkipReason::KindConflict);
    assert!(local.tree.group(shared).is_some());
    assert!(local.tree.entry(shared).is_none());
}

#[test]
fn database_settings_follow_change_times() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();

    remote.meta.name = "family vault".into();
    remote.meta.name_changed = ts(2);
    remote.meta.description = "old".into();
    remote.meta.description_changed = ts(1);
    local.meta.description = "newer".into();
    local.meta.description_changed = ts(3);

    let bin = remote
        .tree
        .add_group(ids.root, Group::new("Recycle Bin", ts(2)))
        .unwrap();
    remote.meta.recycle_bin = bin;
    remote.meta.recycle_bin_changed = ts(2);

    remote.meta.custom_data.set("timed", "remote", Some(ts(2)));
    local.meta.custom_data.set("timed", "local", Some(ts(1)));
    local.meta.custom_data.set("local-only-time", "local", Some(ts(1)));
    remote.meta.custom_data.set("local-only-time", "remote", None);

    synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(local.meta.name, "family vault");
    assert_eq!(local.meta.description, "newer");
    assert_eq!(local.meta.recycle_bin, bin);
    assert!(local.recycle_bin().is_some());
    assert_eq!(local.meta.custom_data.get("timed"), Some("remote"));
    assert_eq!(local.meta.custom_data.get("local-only-time"), Some("local"));
}

#[test]
fn dangling_recycle_bin_reference_is_cleared() {
    let (mut local, _) = sample_database(ts(0));
    let mut remote = local.clone();
    remote.meta.recycle_bin = UniqueId::new();
    remote.meta.recycle_bin_changed = ts(2);

    merge_in(&mut local, &mut remote, MergeMethod::OverwriteExisting, None).unwrap();
    assert!(local.meta.recycle_bin.is_zero());
}

#[test]
fn custom_icons_merge_by_time_and_tombstone() {
    let (mut local, ids) = sample_database(ts(0));
    let kept = CustomIcon::new(vec![1], "kept", Some(ts(0)));
    let doomed = CustomIcon::new(vec![2], "doomed", Some(ts(0)));
    local.custom_icons.push(kept.clone());
    local.custom_icons.push(doomed.clone());
    local.tree.entry_mut(ids.mail).unwrap().custom_icon = doomed.uuid;

    let mut remote = local.clone();
    let mut updated = kept.clone();
    updated.data = vec![9, 9];
    updated.last_modified = Some(ts(2));
    remote.custom_icons[0] = updated.clone();
    let added = CustomIcon::new(vec![3], "added", None);
    remote.custom_icons.push(added.clone());
    assert_eq!(remote.delete_custom_icons(&[doomed.uuid]), 1);

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(local.custom_icons, vec![updated, added]);
    assert_eq!(outcome.icons_deleted, 1);
    assert!(local.tree.entry(ids.mail).unwrap().custom_icon.is_zero());
    assert!(local.deleted_objects.iter().any(|d| d.uuid == doomed.uuid));
}

#[test]
fn icon_changed_after_deletion_survives() {
    let (mut local, _) = sample_database(ts(0));
    let icon = CustomIcon::new(vec![1], "icon", Some(ts(0)));
    let mut remote = local.clone();
    remote.custom_icons.push(icon.clone());
    remote.add_deleted_object(icon.uuid, ts(1));
    let mut revived = icon;
    revived.last_modified = Some(ts(5));
    local.custom_icons.push(revived.clone());

    synchronize(&mut local, &remote, None).unwrap();

    assert_eq!(local.custom_icons, vec![revived]);
    assert!(local.deleted_objects.is_empty());
}

#[test]
fn history_is_pruned_after_merge() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    for h in 1..=6 {
        edit_title(&mut remote, ids.mail, &format!("Mail v{h}"), ts(h));
    }

    let engine = MergeEngine::new(
        MergeConfig::new().with_history_policy(passtree_core::HistoryPolicy::new().max_items(Some(3))),
    );
    engine
        .merge_in(&mut local, &mut remote, MergeMethod::Synchronize, None)
        .unwrap();

    let mail = local.tree.entry(ids.mail).unwrap();
    assert_eq!(mail.history().len(), 3);
    assert_eq!(title_of(&mail.history()[2]), "Mail v5");
}

#[test]
fn synchronize_from_snapshot_bytes() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    let wiki = remote
        .add_entry(ids.work, account("Wiki", "bob", "w1k1", ts(1)))
        .unwrap();
    let codec = CborPersistence::new();
    let bytes = codec.save_bytes(&remote).unwrap();

    let outcome = MergeEngine::default()
        .synchronize_bytes(&mut local, &bytes, &codec, None)
        .unwrap();

    assert_eq!(outcome.entries_created, 1);
    assert_eq!(local.tree.parent_of(wiki), Some(ids.work));

    let err = MergeEngine::default()
        .synchronize_bytes(&mut local, b"not cbor", &codec, None)
        .unwrap_err();
    assert!(matches!(err, MergeError::Core(CoreError::Codec { .. } | CoreError::Io(_))));
}

#[test]
fn broken_source_is_rejected_before_any_change() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    remote
        .add_entry(ids.work, account("Wiki", "bob", "w1k1", ts(1)))
        .unwrap();
    let icon = CustomIcon::new(vec![1, 2, 3], "logo", Some(ts(1)));
    remote.custom_icons.push(icon.clone());
    remote.custom_icons.push(icon);
    let before = tree_shape(&local);

    let err = synchronize(&mut local, &remote, None).unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(tree_shape(&local), before);
}

#[test]
fn repeated_tombstones_are_collapsed_during_merge() {
    let (mut local, ids) = sample_database(ts(0));
    let mut remote = local.clone();
    let gone = UniqueId::new();
    local.deleted_objects.push(DeletedObject::new(gone, ts(1)));
    local.deleted_objects.push(DeletedObject::new(gone, ts(3)));
    remote.deleted_objects.push(DeletedObject::new(ids.bank, ts(4)));
    remote.deleted_objects.push(DeletedObject::new(ids.bank, ts(2)));
    remote.delete_entry(ids.mail, ts(2)).unwrap();

    let outcome = synchronize(&mut local, &remote, None).unwrap();

    assert!(local.tree.entry(ids.mail).is_none());
    assert!(local.tree.entry(ids.bank).is_none());
    assert_eq!(outcome.objects_deleted, 2);
    assert_eq!(
        local.deleted_objects,
        vec![
            DeletedObject::new(gone, ts(3)),
            DeletedObject::new(ids.bank, ts(4)),
            DeletedObject::new(ids.mail, ts(2)),
        ]
    );
    local.check_invariants().unwrap();
}

fn entry_ids(db: &Database) -> HashSet<UniqueId> {
    db.tree.all_entries().map(|e| e.uuid()).collect()
}

fn method_strategy() -> impl Strategy<Value = MergeMethod> {
    (0u8..6).prop_map(|code| MergeMethod::from_code(code).unwrap())
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn merging_a_clone_is_a_no_op(
        db in database_strategy(24),
        ops in edit_script_strategy(0, 16),
    ) {
        let mut db = db;
        apply_edits(&mut db, &ops, &mut TestClock::new(ts(1))).unwrap();
        let before = tree_shape(&db);

        let replica = db.clone();
        let outcome = synchronize(&mut db, &replica, None).unwrap();

        prop_assert_eq!(outcome.changes(), 0);
        prop_assert_eq!(outcome.lists_reordered, 0);
        prop_assert_eq!(tree_shape(&db), before);
    }

    #[test]
    fn identifiers_stay_unique_for_every_method(
        db in database_strategy(16),
        local_ops in edit_script_strategy(0, 12),
        remote_ops in edit_script_strategy(0, 12),
        method in method_strategy(),
    ) {
        let mut pair = ReplicaPair::new(db);
        apply_edits(&mut pair.local, &local_ops, &mut TestClock::new(ts(1))).unwrap();
        apply_edits(&mut pair.remote, &remote_ops, &mut TestClock::new(ts(2))).unwrap();

        merge_in(&mut pair.local, &mut pair.remote, method, None).unwrap();

        prop_assert!(pair.local.check_invariants().is_ok());
        let mut seen = HashSet::new();
        for (node, _) in pair.local.tree.pre_order() {
            prop_assert!(seen.insert(node.uuid()));
        }
    }

    #[test]
    fn synchronize_keeps_every_undeleted_remote_entry(
        db in database_strategy(16),
        local_ops in edit_script_strategy(0, 12),
        remote_ops in edit_script_strategy(0, 12),
    ) {
        let mut pair = ReplicaPair::new(db);
        apply_edits(&mut pair.local, &local_ops, &mut TestClock::new(ts(1))).unwrap();
        apply_edits(&mut pair.remote, &remote_ops, &mut TestClock::new(ts(2))).unwrap();
        let tombstoned: HashSet<UniqueId> = pair
            .local
            .deleted_objects
            .iter()
            .chain(&pair.remote.deleted_objects)
            .map(|d| d.uuid)
            .collect();
        let expected: HashSet<UniqueId> = entry_ids(&pair.remote)
            .difference(&tombstoned)
            .copied()
            .collect();

        synchronize(&mut pair.local, &pair.remote, None).unwrap();

        let merged = entry_ids(&pair.local);
        prop_assert!(expected.is_subset(&merged));
    }

    #[test]
    fn deletion_times_never_decrease(
        db in database_strategy(16),
        local_ops in edit_script_strategy(0, 12),
        remote_ops in edit_script_strategy(0, 12),
    ) {
        let mut pair = ReplicaPair::new(db);
        apply_edits(&mut pair.local, &local_ops, &mut TestClock::new(ts(1))).unwrap();
        apply_edits(&mut pair.remote, &remote_ops, &mut TestClock::new(ts(2))).unwrap();
        let before = pair.local.deleted_objects.clone();

        synchronize(&mut pair.local, &pair.remote, None).unwrap();

        for old in before {
            let now = pair.local.deleted_objects.iter().find(|d| d.uuid == old.uuid);
            match now {
                Some(d) => prop_assert!(d.deletion_time >= old.deletion_time),
                None => prop_assert!(pair.local.tree.contains(old.uuid)),
            }
        }
    }
}
