//! Error types for passtree core.

use crate::id::UniqueId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in passtree core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error while reading or writing a byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// An argument did not satisfy the operation's preconditions.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the violated precondition.
        message: String,
    },

    /// A referenced group or entry does not exist in the tree.
    #[error("object not found: {uuid}")]
    NotFound {
        /// The identifier that was looked up.
        uuid: UniqueId,
    },

    /// The insertion would nest groups deeper than allowed.
    #[error("structure too deep: depth {depth} exceeds maximum {max}")]
    StructureTooDeep {
        /// Depth the structure would reach.
        depth: usize,
        /// Maximum permitted depth.
        max: usize,
    },

    /// Two objects in one tree share an identifier.
    #[error("duplicate identifier: {uuid}")]
    DuplicateUuid {
        /// The identifier that occurs more than once.
        uuid: UniqueId,
    },

    /// A structural invariant of the tree does not hold.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the broken invariant.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(uuid: UniqueId) -> Self {
        Self::NotFound { uuid }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns `true` if this error rejects a single insertion rather than
    /// signalling a broken or unusable tree.
    #[must_use]
    pub fn is_structural_limit(&self) -> bool {
        matches!(self, Self::StructureTooDeep { .. })
    }
}
