//! Merge modes.

use std::fmt;

/// How objects present on both sides are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergeMethod {
    /// Adds new objects only; touches nothing that exists.
    #[default]
    None,
    /// The source always wins.
    OverwriteExisting,
    /// The local copy always wins.
    KeepExisting,
    /// The newer copy wins.
    OverwriteIfNewer,
    /// Imports the source as a copy with fresh identifiers.
    CreateNewUuids,
    /// Full two-replica reconciliation: moves, order, deletions and
    /// history.
    Synchronize,
}

impl MergeMethod {
    /// Every method, ordered by code.
    pub const ALL: [MergeMethod; 6] = [
        Self::None,
        Self::OverwriteExisting,
        Self::KeepExisting,
        Self::OverwriteIfNewer,
        Self::CreateNewUuids,
        Self::Synchronize,
    ];

    /// Parses a stored method code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Returns the stored method code.
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::OverwriteExisting => 1,
            Self::KeepExisting => 2,
            Self::OverwriteIfNewer => 3,
            Self::CreateNewUuids => 4,
            Self::Synchronize => 5,
        }
    }

    /// Returns `true` for the methods that copy source data over existing
    /// objects.
    #[must_use]
    pub const fn overwrites(self) -> bool {
        matches!(
            self,
            Self::OverwriteExisting | Self::OverwriteIfNewer | Self::Synchronize
        )
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::OverwriteExisting => "overwrite-existing",
            Self::KeepExisting => "keep-existing",
            Self::OverwriteIfNewer => "overwrite-if-newer",
            Self::CreateNewUuids => "create-new-uuids",
            Self::Synchronize => "synchronize",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for method in MergeMethod::ALL {
            assert_eq!(MergeMethod::from_code(method.to_code()), Some(method));
        }
        assert_eq!(MergeMethod::from_code(6), None);
        assert_eq!(MergeMethod::from_code(255), None);
    }

    #[test]
    fn overwriting_methods() {
        assert!(MergeMethod::Synchronize.overwrites());
        assert!(!MergeMethod::KeepExisting.overwrites());
        assert!(!MergeMethod::CreateNewUuids.overwrites());
        assert_eq!(MergeMethod::OverwriteIfNewer.to_string(), "overwrite-if-newer");
    }
}
