//! Integration tests for the passtree core model.

use chrono::{Duration, TimeZone, Utc};
use passtree_core::{
    fields, CborPersistence, CustomIcon, Database, Entry, Group, RecordingStatusLogger,
    StatusLogger, Timestamp, TreePersistence, UniqueId,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

fn t(hours: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::hours(hours)
}

fn account(title: &str, user: &str, at: Timestamp) -> Entry {
    let mut e = Entry::new(at);
    e.set_text(fields::TITLE, false, title);
    e.set_text(fields::USER_NAME, false, user);
    e.set_text(fields::PASSWORD, true, "hunter2");
    e.set_text("PIN", true, "1234");
    e
}

#[test]
fn duplicate_in_recycle_bin_is_the_one_removed() {
    let mut db = Database::new("vault", t(0));
    let root = db.tree.root_id();
    let bin = db.tree.add_group(root, Group::new("Recycle Bin", t(0))).unwrap();
    db.meta.recycle_bin = bin;
    db.meta.recycle_bin_enabled = true;

    // the copy in the bin is newer, so only the bin rule keeps the live one
    let live = db.tree.add_entry(root, account("Mail", "bob", t(1))).unwrap();
    let binned = db.tree.add_entry(bin, account("Mail", "bob", t(2))).unwrap();

    let logger = RecordingStatusLogger::new();
    assert_eq!(db.delete_duplicate_entries(Some(&logger as &dyn StatusLogger)), 1);
    assert!(db.tree.entry(live).is_some());
    assert!(db.tree.entry(binned).is_none());
    assert_eq!(db.deleted_objects.len(), 1);
    assert_eq!(db.deleted_objects[0].uuid, binned);
    db.check_invariants().unwrap();
}

#[test]
fn custom_field_mismatch_is_not_a_duplicate() {
    let mut db = Database::new("vault", t(0));
    let root = db.tree.root_id();
    db.tree.add_entry(root, account("Mail", "bob", t(1))).unwrap();
    let mut other = account("Mail", "bob", t(1));
    other.set_text("PIN", true, "9999");
    db.tree.add_entry(root, other).unwrap();

    assert_eq!(db.delete_duplicate_entries(None), 0);
    assert_eq!(db.tree.counts().1, 2);
}

#[test]
fn maintenance_on_empty_database_does_nothing() {
    let mut db = Database::new("vault", t(0));
    assert_eq!(db.delete_duplicate_entries(None), 0);
    assert_eq!(db.delete_empty_groups(), 0);
    assert_eq!(db.delete_unused_custom_icons(), 0);
    assert!(!db.maintain_backups());
    assert!(db.deleted_objects.is_empty());
}

#[test]
fn history_is_pruned_to_policy() {
    let mut db = Database::new("vault", t(0));
    let root = db.tree.root_id();
    let mut e = account("Mail", "bob", t(0));
    for h in 0..15 {
        e.touch(true, t(h));
        e.create_backup(None);
    }
    let id = db.tree.add_entry(root, e).unwrap();

    assert!(db.maintain_backups());
    let entry = db.tree.entry(id).unwrap();
    assert_eq!(entry.history().len(), 10);
    assert_eq!(entry.history()[0].times.last_modification, t(5));
}

#[test]
fn snapshot_file_roundtrip() {
    let mut db = Database::new("vault", t(0));
    let root = db.tree.root_id();
    let work = db.tree.add_group(root, Group::new("Work", t(0))).unwrap();
    let mut e = account("VPN", "carol", t(1));
    e.add_tag("network");
    e.create_backup(None);
    db.tree.add_entry(work, e).unwrap();
    let icon = CustomIcon::new(vec![0x89, b'P', b'N', b'G'], "logo", Some(t(2)));
    db.tree.group_mut(work).unwrap().custom_icon = icon.uuid;
    db.custom_icons.push(icon);
    db.add_deleted_object(UniqueId::new(), t(3));
    db.meta.custom_data.set("plugin.key", "v", Some(t(1)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.cbor");
    let codec = CborPersistence::new();
    {
        let mut out = BufWriter::new(File::create(&path).unwrap());
        codec.save(&db, &mut out).unwrap();
        out.flush().unwrap();
    }
    let loaded = codec
        .load(&mut BufReader::new(File::open(&path).unwrap()))
        .unwrap();

    assert_eq!(loaded.deleted_objects, db.deleted_objects);
    assert_eq!(loaded.custom_icons, db.custom_icons);
    assert_eq!(loaded.meta, db.meta);
    let pre: Vec<_> = db.tree.pre_order().map(|(n, d)| (n.uuid(), d)).collect();
    let post: Vec<_> = loaded.tree.pre_order().map(|(n, d)| (n.uuid(), d)).collect();
    assert_eq!(pre, post);
}

#[test]
fn snapshot_with_broken_tree_is_rejected() {
    let mut db = Database::new("vault", t(0));
    let icon = CustomIcon::new(vec![1, 2, 3], "logo", Some(t(1)));
    db.custom_icons.push(icon.clone());
    db.custom_icons.push(icon);

    let codec = CborPersistence::new();
    let bytes = codec.save_bytes(&db).unwrap();
    assert!(codec.load_bytes(&bytes).is_err());
}

#[test]
fn snapshot_load_collapses_repeated_tombstones() {
    let mut db = Database::new("vault", t(0));
    let id = UniqueId::new();
    db.deleted_objects.push(passtree_core::DeletedObject::new(id, t(1)));
    db.deleted_objects.push(passtree_core::DeletedObject::new(id, t(3)));

    let codec = CborPersistence::new();
    let bytes = codec.save_bytes(&db).unwrap();
    let loaded = codec.load_bytes(&bytes).unwrap();
    assert_eq!(
        loaded.deleted_objects,
        vec![passtree_core::DeletedObject::new(id, t(3))]
    );
}
