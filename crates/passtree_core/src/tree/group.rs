//! Groups (folders) of the tree.

use super::compare::CompareOptions;
use super::custom_data::CustomData;
use super::tags::Tags;
use super::times::Times;
use crate::id::UniqueId;
use crate::time::{self, Timestamp};
use serde::{Deserialize, Serialize};

/// Maximum nesting depth of groups below the root.
pub const MAX_DEPTH: usize = 126;

/// A group node.
///
/// Child lists hold identifiers into the owning [`Tree`](super::Tree); only
/// the tree can change them, so a `Group` obtained from a tree always
/// describes a consistent position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    uuid: UniqueId,
    #[serde(skip)]
    parent: Option<UniqueId>,
    groups: Vec<UniqueId>,
    entries: Vec<UniqueId>,
    /// Parent before the most recent move, or zero.
    pub previous_parent: UniqueId,
    /// Display name.
    pub name: String,
    /// Free-form notes.
    pub notes: String,
    /// Index of the built-in icon.
    pub icon_id: u32,
    /// Custom icon, or zero for none.
    pub custom_icon: UniqueId,
    /// Timestamps and usage counter.
    pub times: Times,
    /// Whether the group is shown expanded.
    pub is_expanded: bool,
    /// Auto-type sequence inherited by entries; empty inherits further.
    pub default_auto_type_sequence: String,
    /// Auto-type switch; `None` inherits from the parent.
    pub enable_auto_type: Option<bool>,
    /// Search switch; `None` inherits from the parent.
    pub enable_searching: Option<bool>,
    /// Entry shown at the top of the list when the group was last viewed.
    pub last_top_visible_entry: UniqueId,
    /// Tags.
    pub tags: Tags,
    /// Plugin data.
    pub custom_data: CustomData,
}

impl Group {
    /// Creates an empty group with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, at: Timestamp) -> Self {
        Self::with_uuid(UniqueId::new(), name, at)
    }

    /// Creates an empty group with the given identifier.
    #[must_use]
    pub fn with_uuid(uuid: UniqueId, name: impl Into<String>, at: Timestamp) -> Self {
        Self {
            uuid,
            parent: None,
            groups: Vec::new(),
            entries: Vec::new(),
            previous_parent: UniqueId::ZERO,
            name: name.into(),
            notes: String::new(),
            icon_id: 48,
            custom_icon: UniqueId::ZERO,
            times: Times::new(at),
            is_expanded: true,
            default_auto_type_sequence: String::new(),
            enable_auto_type: None,
            enable_searching: None,
            last_top_visible_entry: UniqueId::ZERO,
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

    /// Returns the parent group, or `None` for a root.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<UniqueId> {
        self.parent
    }

    /// Direct subgroups in order.
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[UniqueId] {
        &self.groups
    }

    /// Direct entries in order.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[UniqueId] {
        &self.entries
    }

    /// Returns `true` if the group has neither subgroups nor entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.entries.is_empty()
    }

    pub(crate) fn set_uuid(&mut self, uuid: UniqueId) {
        self.uuid = uuid;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<UniqueId>) {
        self.parent = parent;
    }

    pub(crate) fn groups_mut(&mut self) -> &mut Vec<UniqueId> {
        &mut self.groups
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<UniqueId> {
        &mut self.entries
    }

    /// Copy of the properties without children or parent.
    #[must_use]
    pub fn clone_shallow(&self) -> Group {
        let mut copy = self.clone();
        copy.parent = None;
        copy.groups.clear();
        copy.entries.clear();
        copy
    }

    /// Copies every property of `template` into `self`.
    ///
    /// Nothing happens if `only_if_newer` is set and the template was last
    /// modified before `self` (compared to the second). Children, the
    /// identifier and the parent link are never touched.
    pub fn assign_properties(
        &mut self,
        template: &Group,
        only_if_newer: bool,
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

        self.name = template.name.clone();
        self.notes = template.notes.clone();
        self.icon_id = template.icon_id;
        self.custom_icon = template.custom_icon;
        self.times = template.times;
        if assign_location_changed {
            self.previous_parent = template.previous_parent;
        } else {
            self.times.location_changed = location_changed;
        }
        self.is_expanded = template.is_expanded;
        self.default_auto_type_sequence = template.default_auto_type_sequence.clone();
        self.enable_auto_type = template.enable_auto_type;
        self.enable_searching = template.enable_searching;
        self.last_top_visible_entry = template.last_top_visible_entry;
        self.tags = template.tags.clone();
        self.custom_data = template.custom_data.clone();
    }

    /// Records an access, and a modification if `modified`.
    pub fn touch(&mut self, modified: bool, at: Timestamp) {
        self.times.touch(modified, at);
    }

    /// Compares the group's own properties.
    ///
    /// Children are not looked at; [`Tree::equals_group`](super::Tree::equals_group)
    /// adds the recursive part.
    #[must_use]
    pub fn equals_properties(&self, other: &Group, options: CompareOptions) -> bool {
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

        if self.name != other.name
            || self.notes != other.notes
            || self.icon_id != other.icon_id
            || self.custom_icon != other.custom_icon
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

        self.is_expanded == other.is_expanded
            && self.default_auto_type_sequence == other.default_auto_type_sequence
            && self.enable_auto_type == other.enable_auto_type
            && self.enable_searching == other.enable_searching
            && self.last_top_visible_entry == other.last_top_visible_entry
            && self.tags == other.tags
            && self.custom_data.equals(&other.custom_data)
    }
}
