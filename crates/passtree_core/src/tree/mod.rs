//! Groups, entries and the tree that holds them.

mod arena;
mod auto_type;
mod compare;
mod custom_data;
mod entry;
pub mod fields;
mod group;
mod tags;
mod times;
mod traverse;

use serde::{Deserialize, Serialize};

pub use arena::Tree;
pub use auto_type::{AutoTypeAssociation, AutoTypeConfig, ObfuscationMode};
pub use compare::{CompareOptions, ProtectionCompareMode};
pub use custom_data::{CustomData, CustomDataItem};
pub use entry::Entry;
pub use group::{Group, MAX_DEPTH};
pub use tags::Tags;
pub use times::Times;
pub use traverse::{NodeKind, NodeRef, PreOrder, TreeVisitor};

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Color {
    /// Creates a colour from its components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
