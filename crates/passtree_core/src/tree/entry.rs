//! Password entries.

use super::auto_type::AutoTypeConfig;
use super::compare::{binaries_equal, strings_equal, CompareOptions, ProtectionCompareMode};
use super::custom_data::CustomData;
use super::tags::Tags;
use super::times::Times;
use super::Color;
use crate::config::HistoryPolicy;
use crate::error::{CoreError, CoreResult};
use crate::id::UniqueId;
use crate::protected::{ProtectedBinary, ProtectedString};
use crate::time::{self, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A password entry: string fields, attachments and prior versions.
///
/// The parent link is maintained by the owning [`Tree`](super::Tree); an
/// entry outside a tree has no parent. History items are full copies of
/// the entry with the same identifier and an empty history of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    uuid: UniqueId,
    #[serde(skip)]
    parent: Option<UniqueId>,
    /// Parent before the most recent move, or zero.
    pub previous_parent: UniqueId,
    /// Protected string fields keyed by field name.
    pub strings: BTreeMap<String, ProtectedString>,
    /// Attachments keyed by file name.
    pub binaries: BTreeMap<String, ProtectedBinary>,
    /// Auto-type settings.
    pub auto_type: AutoTypeConfig,
    history: Vec<Entry>,
    /// Index of the built-in icon.
    pub icon_id: u32,
    /// Custom icon, or zero for none.
    pub custom_icon: UniqueId,
    /// Foreground colour override.
    pub foreground: Option<Color>,
    /// Background colour override.
    pub background: Option<Color>,
    /// Timestamps and usage counter.
    pub times: Times,
    /// URL override used when opening the entry.
    pub override_url: String,
    /// Whether the password takes part in quality checks.
    pub quality_check: bool,
    /// Tags.
    pub tags: Tags,
    /// Plugin data.
    pub custom_data: CustomData,
}

impl Entry {
    /// Creates an empty entry with a fresh identifier.
    #[must_use]
    pub fn new(at: Timestamp) -> Self {
        Self::with_uuid(UniqueId::new(), at)
    }

    /// Creates an empty entry with the given identifier.
    #[must_use]
    pub fn with_uuid(uuid: UniqueId, at: Timestamp) -> Self {
        Self {
            uuid,
            parent: None,
            previous_parent: UniqueId::ZERO,
            strings: BTreeMap::new(),
            binaries: BTreeMap::new(),
            auto_type: AutoTypeConfig::default(),
            history: Vec::new(),
            icon_id: 0,
            custom_icon: UniqueId::ZERO,
            foreground: None,
            background: None,
            times: Times::new(at),
            override_url: String::new(),
            quality_check: true,
            tags: Tags::new(),
            custom_data: CustomData::new(),
        }
    }

    /// Returns the identifier.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> UniqueId {
        self.uuid
    }

    /// Returns the parent group, if the entry lives in a tree.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<UniqueId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<UniqueId>) {
        self.parent = parent;
    }

    /// Changes the identifier, optionally also on every history item.
    pub(crate) fn set_uuid(&mut self, uuid: UniqueId, with_history: bool) {
        self.uuid = uuid;
        if with_history {
            for item in &mut self.history {
                item.uuid = uuid;
            }
        }
    }

    /// Returns a string field.
    #[must_use]
    pub fn get_string(&self, field: &str) -> Option<&ProtectedString> {
        self.strings.get(field)
    }

    /// Returns a string field, or an empty string if it is missing.
    #[must_use]
    pub fn get_string_safe(&self, field: &str) -> ProtectedString {
        self.strings.get(field).cloned().unwrap_or_default()
    }

    /// Sets a string field.
    pub fn set_string(&mut self, field: impl Into<String>, value: ProtectedString) {
        self.strings.insert(field.into(), value);
    }

    /// Sets a string field from plaintext.
    pub fn set_text(&mut self, field: impl Into<String>, protect: bool, value: &str) {
        self.set_string(field, ProtectedString::new(protect, value));
    }

    /// Re-stores `field` with the given protection flag, in the entry and in
    /// every history item. Returns `true` if any value changed mode.
    pub fn set_field_protection(&mut self, field: &str, protect: bool) -> bool {
        let mut changed = false;
        if let Some(value) = self.strings.get_mut(field) {
            if value.is_protected() != protect {
                *value = value.with_protection(protect);
                changed = true;
            }
        }
        for item in &mut self.history {
            changed |= item.set_field_protection(field, protect);
        }
        changed
    }

    /// Returns the history items, oldest first as stored.
    #[must_use]
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// Replaces the history.
    ///
    /// Every item is re-keyed to this entry's identifier and loses any
    /// nested history and parent link.
    pub fn set_history(&mut self, history: Vec<Entry>) {
        self.history = history;
        self.fix_history_uuids();
    }

    pub(crate) fn fix_history_uuids(&mut self) {
        for item in &mut self.history {
            item.uuid = self.uuid;
            item.parent = None;
            item.history.clear();
        }
    }

    /// Deep copy with the same identifier and no parent.
    #[must_use]
    pub fn clone_deep(&self) -> Entry {
        let mut copy = self.clone();
        copy.parent = None;
        copy
    }

    /// Deep copy with a fresh identifier (shared by its history) and no
    /// parent, created and accessed at `at`.
    #[must_use]
    pub fn duplicate(&self, at: Timestamp) -> Entry {
        let mut copy = self.clone_deep();
        copy.set_uuid(UniqueId::new(), true);
        copy.times.creation = at;
        copy.times.last_access = at;
        copy
    }

    /// Adds a tag; surrounding whitespace is trimmed and empty tags are
    /// ignored. Returns `true` if the tag was new.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.tags.add(tag)
    }

    /// Removes a tag. Returns `true` if it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Returns `true` if the entry carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Copies every field of `template` into `self`.
    ///
    /// Nothing happens if `only_if_newer` is set and the template was last
    /// modified before `self` (compared to the second). History is copied
    /// only with `include_history`; the location-changed time and previous
    /// parent only with `assign_location_changed`. The identifier and
    /// parent link are never touched.
    pub fn assign_properties(
        &mut self,
        template: &Entry,
        only_if_newer: bool,
        include_history: bool,
        assign_location_changed: bool,
    ) {
        if only_if_newer
            && time::compare(
                template.times.last_modification,
                self.times.last_modification,
                true,
            )
            .is_lt()
        {
            return;
        }

        let location_changed = self.times.location_changed;
        if assign_location_changed {
            self.previous_parent = template.previous_parent;
        }

        self.strings = template.strings.clone();
        self.binaries = template.binaries.clone();
        self.auto_type = template.auto_type.clone();
        if include_history {
            self.history = template.history.clone();
            self.fix_history_uuids();
        }

        self.icon_id = template.icon_id;
        self.custom_icon = template.custom_icon;
        self.foreground = template.foreground;
        self.background = template.background;
        self.times = template.times;
        if !assign_location_changed {
            self.times.location_changed = location_changed;
        }
        self.override_url = template.override_url.clone();
        self.quality_check = template.quality_check;
        self.tags = template.tags.clone();
        self.custom_data = template.custom_data.clone();
    }

    /// Records an access, and a modification if `modified`.
    ///
    /// Parents are not touched; see [`Tree::touch_entry`](super::Tree::touch_entry).
    pub fn touch(&mut self, modified: bool, at: Timestamp) {
        self.times.touch(modified, at);
    }

    /// Appends a copy of the current state to the history, then prunes
    /// the history if a policy is given.
    pub fn create_backup(&mut self, policy: Option<&HistoryPolicy>) {
        let mut copy = self.clone_deep();
        copy.history.clear();
        self.history.push(copy);

        if let Some(policy) = policy {
            self.maintain_backups(policy);
        }
    }

    /// Backs up the current state, then restores history item `index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `index` is out of range.
    pub fn restore_from_backup(
        &mut self,
        index: usize,
        policy: Option<&HistoryPolicy>,
    ) -> CoreResult<()> {
        let Some(backup) = self.history.get(index).cloned() else {
            return Err(CoreError::invalid_argument(format!(
                "history index {index} out of range (len {})",
                self.history.len()
            )));
        };

        self.create_backup(policy);
        self.assign_properties(&backup, false, false, false);
        Ok(())
    }

    /// Returns `true` if some history item equals `candidate`, ignoring
    /// parent, history and missing-versus-empty standard fields.
    #[must_use]
    pub fn has_backup_of_data(
        &self,
        candidate: &Entry,
        ignore_last_mod: bool,
        ignore_last_access: bool,
    ) -> bool {
        let mut options = CompareOptions::new()
            .ignore_parent_group()
            .ignore_history()
            .null_empty_equiv_std();
        options.ignore_last_mod = ignore_last_mod;
        options.ignore_last_access = ignore_last_access;

        self.history
            .iter()
            .any(|item| item.equals(candidate, options, ProtectionCompareMode::None))
    }

    /// Removes the oldest history items until the policy holds.
    ///
    /// Returns `true` if anything was removed.
    pub fn maintain_backups(&mut self, policy: &HistoryPolicy) -> bool {
        self.fix_history_uuids();
        let mut removed = false;

        if let Some(max_items) = policy.max_items {
            while self.history.len() > max_items {
                self.remove_oldest_backup();
                removed = true;
            }
        }

        if let Some(max_size) = policy.max_size {
            while self.history_size() > max_size {
                if !self.remove_oldest_backup() {
                    break;
                }
                removed = true;
            }
        }

        removed
    }

    fn history_size(&self) -> u64 {
        self.history.iter().map(Entry::size).sum()
    }

    fn remove_oldest_backup(&mut self) -> bool {
        let oldest = self
            .history
            .iter()
            .enumerate()
            .fold(None::<(usize, Timestamp)>, |best, (i, item)| {
                let t = item.times.last_modification;
                match best {
                    Some((_, bt)) if bt <= t => best,
                    _ => Some((i, t)),
                }
            });

        match oldest {
            Some((index, _)) => {
                self.history.remove(index);
                true
            }
            None => false,
        }
    }

    /// Approximate in-memory size in bytes, history included.
    ///
    /// Characters count two bytes each; fixed overheads approximate a
    /// 64-bit object layout.
    #[must_use]
    pub fn size(&self) -> u64 {
        let mut bytes: u64 = 276;
        let mut chars: u64 = 0;

        bytes += self.strings.len() as u64 * 40;
        for (key, value) in &self.strings {
            chars += key.chars().count() as u64 + value.len() as u64;
        }

        bytes += self.binaries.len() as u64 * 65;
        for (key, value) in &self.binaries {
            chars += key.chars().count() as u64;
            bytes += value.len() as u64;
        }

        chars += self.auto_type.default_sequence.chars().count() as u64;
        bytes += self.auto_type.associations.len() as u64 * 24;
        for assoc in &self.auto_type.associations {
            chars += assoc.window.chars().count() as u64 + assoc.sequence.chars().count() as u64;
        }

        bytes += self.history.len() as u64 * 8;
        bytes += self.history_size();

        chars += self.override_url.chars().count() as u64;

        bytes += self.tags.len() as u64 * 8;
        chars += self.tags.iter().map(|t| t.chars().count() as u64).sum::<u64>();

        bytes += self.custom_data.len() as u64 * 16;
        for (key, item) in self.custom_data.iter() {
            chars += key.chars().count() as u64 + item.value.chars().count() as u64;
        }

        bytes + (chars << 1)
    }

    /// Structural comparison under the given relaxations.
    #[must_use]
    pub fn equals(
        &self,
        other: &Entry,
        options: CompareOptions,
        mode: ProtectionCompareMode,
    ) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.uuid != other.uuid {
            return false;
        }

        if !options.ignore_parent_group {
            if self.parent != other.parent {
                return false;
            }
            if !options.ignore_last_mod
                && !time::equals_floor(self.times.location_changed, other.times.location_changed)
            {
                return false;
            }
            if self.previous_parent != other.previous_parent {
                return false;
            }
        }

        if !strings_equal(&self.strings, &other.strings, options, mode)
            || !binaries_equal(&self.binaries, &other.binaries)
            || self.auto_type != other.auto_type
        {
            return false;
        }

        if !options.ignore_history && !self.history_equals(other, options) {
            return false;
        }

        if self.icon_id != other.icon_id
            || self.custom_icon != other.custom_icon
            || self.foreground != other.foreground
            || self.background != other.background
        {
            return false;
        }

        let (a, b) = (&self.times, &other.times);
        if !time::equals_floor(a.creation, b.creation)
            || (!options.ignore_last_mod
                && !time::equals_floor(a.last_modification, b.last_modification))
            || (!options.ignore_last_access && !time::equals_floor(a.last_access, b.last_access))
            || !time::equals_floor(a.expiry, b.expiry)
            || a.expires != b.expires
            || (!options.ignore_last_access && a.usage_count != b.usage_count)
        {
            return false;
        }

        self.override_url == other.override_url
            && self.quality_check == other.quality_check
            && self.tags == other.tags
            && self.custom_data.equals(&other.custom_data)
    }

    fn history_equals(&self, other: &Entry, options: CompareOptions) -> bool {
        let expected = if options.ignore_last_backup {
            match self.history.len().checked_sub(1) {
                Some(n) => n,
                None => return false,
            }
        } else {
            self.history.len()
        };
        if other.history.len() != expected {
            return false;
        }

        let sub = CompareOptions {
            ignore_parent_group: true,
            ignore_last_mod: options.ignore_last_mod,
            ignore_last_access: options.ignore_last_access,
            null_empty_equiv_std: options.null_empty_equiv_std,
            ..CompareOptions::default()
        };
        self.history
            .iter()
            .zip(&other.history)
            .all(|(a, b)| a.equals(b, sub, ProtectionCompareMode::None))
    }

    /// Adds custom icons referenced by this entry or its history to `used`.
    pub(crate) fn collect_custom_icons(&self, used: &mut HashSet<UniqueId>) {
        if !self.custom_icon.is_zero() {
            used.insert(self.custom_icon);
        }
        for item in &self.history {
            item.collect_custom_icons(used);
        }
    }

    /// Clears custom icon references that are not in `known`, history
    /// included. Returns the number of cleared references.
    pub(crate) fn fix_custom_icon_refs(&mut self, known: &HashSet<UniqueId>) -> usize {
        let mut cleared = 0;
        if !self.custom_icon.is_zero() && !known.contains(&self.custom_icon) {
            self.custom_icon = UniqueId::ZERO;
            cleared += 1;
        }
        for item in &mut self.history {
            cleared += item.fix_custom_icon_refs(known);
        }
        cleared
    }
}
