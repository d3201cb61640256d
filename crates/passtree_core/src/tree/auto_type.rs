//! Auto-type configuration of an entry.

use serde::{Deserialize, Serialize};

/// Whether auto-type may route keystrokes through the clipboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObfuscationMode {
    /// Type every character directly.
    #[default]
    None,
    /// Mix in clipboard transfers to defeat keyloggers.
    UseClipboard,
}

/// Keystroke sequence bound to a window title pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTypeAssociation {
    /// Window title pattern.
    pub window: String,
    /// Sequence to type; empty means the entry's default.
    pub sequence: String,
}

/// Auto-type settings of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTypeConfig {
    /// Whether auto-type is enabled for the entry.
    pub enabled: bool,
    /// Obfuscation mode.
    pub obfuscation: ObfuscationMode,
    /// Default keystroke sequence; empty inherits from the group.
    pub default_sequence: String,
    /// Per-window associations, in order.
    pub associations: Vec<AutoTypeAssociation>,
}

impl Default for AutoTypeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            obfuscation: ObfuscationMode::None,
            default_sequence: String::new(),
            associations: Vec::new(),
        }
    }
}

impl AutoTypeConfig {
    /// Appends a window association.
    pub fn add_association(&mut self, window: impl Into<String>, sequence: impl Into<String>) {
        self.associations.push(AutoTypeAssociation {
            window: window.into(),
            sequence: sequence.into(),
        });
    }
}
