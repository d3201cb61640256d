//! Database settings merge.

use crate::engine::Merge;
use crate::method::MergeMethod;
use passtree_core::{time, Timestamp, UniqueId};

/// `true` if the source value of a setting should replace the local one.
fn source_wins(force: bool, local_changed: Timestamp, source_changed: Timestamp) -> bool {
    force || source_changed > local_changed
}

impl Merge<'_> {
    /// Merges name, description, default user, colour, recycle bin,
    /// templates group and custom data. Each setting is taken from the
    /// source if that side changed it more recently, or always with
    /// `OverwriteExisting`.
    pub(crate) fn merge_db_properties(&mut self) {
        let force = match self.method {
            MergeMethod::None | MergeMethod::KeepExisting => return,
            MergeMethod::OverwriteExisting => true,
            _ => false,
        };
        let src = &self.source.meta;
        let local = &mut self.local.meta;
        let source_newer = src.settings_changed > local.settings_changed;

        if force || source_newer {
            local.settings_changed = src.settings_changed;
            local.color = src.color;
        }

        if source_wins(force, local.name_changed, src.name_changed) {
            local.name = src.name.clone();
            local.name_changed = src.name_changed;
        }
        if source_wins(force, local.description_changed, src.description_changed) {
            local.description = src.description.clone();
            local.description_changed = src.description_changed;
        }
        if source_wins(
            force,
            local.default_user_name_changed,
            src.default_user_name_changed,
        ) {
            local.default_user_name = src.default_user_name.clone();
            local.default_user_name_changed = src.default_user_name_changed;
        }

        let (preferred, fallback) =
            if source_wins(force, local.recycle_bin_changed, src.recycle_bin_changed) {
                local.recycle_bin_enabled = src.recycle_bin_enabled;
                local.recycle_bin_changed = src.recycle_bin_changed;
                (src.recycle_bin, local.recycle_bin)
            } else {
                (local.recycle_bin, src.recycle_bin)
            };
        let tree = &self.local.tree;
        let existing = |id: UniqueId| tree.group(id).is_some();
        local.recycle_bin = pick_group(preferred, fallback, existing);

        let (preferred, fallback) = if source_wins(
            force,
            local.entry_templates_group_changed,
            src.entry_templates_group_changed,
        ) {
            local.entry_templates_group_changed = src.entry_templates_group_changed;
            (src.entry_templates_group, local.entry_templates_group)
        } else {
            (local.entry_templates_group, src.entry_templates_group)
        };
        local.entry_templates_group = pick_group(preferred, fallback, existing);

        for (key, item) in src.custom_data.iter() {
            let take = if force {
                true
            } else {
                match (local.custom_data.last_modified(key), item.last_modified) {
                    (Some(l), Some(s)) => time::compare(s, l, false).is_gt(),
                    (Some(_), None) => false,
                    (None, Some(_)) => true,
                    (None, None) => source_newer || !local.custom_data.contains_key(key),
                }
            };
            if take {
                local
                    .custom_data
                    .set(key, item.value.clone(), item.last_modified);
            }
        }

        if force || source_newer {
            src.public_custom_data.copy_to(&mut local.public_custom_data);
        } else {
            let mut merged = src.public_custom_data.clone();
            local.public_custom_data.copy_to(&mut merged);
            local.public_custom_data = merged;
        }
    }
}

/// First of two group ids that exists locally, else zero.
fn pick_group(
    preferred: UniqueId,
    fallback: UniqueId,
    exists: impl Fn(UniqueId) -> bool,
) -> UniqueId {
    if exists(preferred) {
        preferred
    } else if exists(fallback) {
        fallback
    } else {
        UniqueId::ZERO
    }
}
