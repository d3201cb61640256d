//! Database-wide settings.

use crate::config::{HistoryPolicy, MemoryProtectionConfig};
use crate::id::UniqueId;
use crate::time::Timestamp;
use crate::tree::{Color, CustomData};
use crate::variant::VariantDictionary;
use serde::{Deserialize, Serialize};

/// Default number of days for which history is kept by maintenance tools.
pub const DEFAULT_MAINTENANCE_HISTORY_DAYS: u32 = 365;

/// Database metadata.
///
/// Most settings carry their own change time so that replicas can merge
/// them field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMeta {
    /// Last change of any setting.
    pub settings_changed: Timestamp,
    /// Database name.
    pub name: String,
    /// Last change of `name`.
    pub name_changed: Timestamp,
    /// Description.
    pub description: String,
    /// Last change of `description`.
    pub description_changed: Timestamp,
    /// User name proposed for new entries.
    pub default_user_name: String,
    /// Last change of `default_user_name`.
    pub default_user_name_changed: Timestamp,
    /// Display colour.
    pub color: Option<Color>,
    /// Days of history kept by maintenance tools.
    pub maintenance_history_days: u32,
    /// Whether deleting moves objects into the recycle bin.
    pub recycle_bin_enabled: bool,
    /// Recycle bin group, or zero.
    pub recycle_bin: UniqueId,
    /// Last change of the recycle bin settings.
    pub recycle_bin_changed: Timestamp,
    /// Group holding entry templates, or zero.
    pub entry_templates_group: UniqueId,
    /// Last change of `entry_templates_group`.
    pub entry_templates_group_changed: Timestamp,
    /// History limits.
    pub history_policy: HistoryPolicy,
    /// Which standard fields are stored protected.
    pub memory_protection: MemoryProtectionConfig,
    /// Plugin data with per-key change times.
    pub custom_data: CustomData,
    /// Plugin data readable without the database key.
    pub public_custom_data: VariantDictionary,
}

impl DatabaseMeta {
    /// Creates metadata with every change time set to `at`.
    #[must_use]
    pub fn new(name: impl Into<String>, at: Timestamp) -> Self {
        Self {
            settings_changed: at,
            name: name.into(),
            name_changed: at,
            description: String::new(),
            description_changed: at,
            default_user_name: String::new(),
            default_user_name_changed: at,
            color: None,
            maintenance_history_days: DEFAULT_MAINTENANCE_HISTORY_DAYS,
            recycle_bin_enabled: true,
            recycle_bin: UniqueId::ZERO,
            recycle_bin_changed: at,
            entry_templates_group: UniqueId::ZERO,
            entry_templates_group_changed: at,
            history_policy: HistoryPolicy::default(),
            memory_protection: MemoryProtectionConfig::default(),
            custom_data: CustomData::new(),
            public_custom_data: VariantDictionary::new(),
        }
    }
}
