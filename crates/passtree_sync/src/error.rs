//! Error types for merging.

use passtree_core::CoreError;
use thiserror::Error;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can occur while merging databases.
///
/// Cancellation is not an error; see
/// [`MergeOutcome::cancelled`](crate::MergeOutcome::cancelled).
#[derive(Error, Debug)]
pub enum MergeError {
    /// A tree operation failed.
    #[error("database error: {0}")]
    Core(#[from] CoreError),

    /// One of the inputs was unusable; nothing was changed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The merged database broke a structural invariant.
    #[error("merge produced an invalid database: {message}")]
    InvariantViolation {
        /// Description of the broken invariant.
        message: String,
    },
}

impl MergeError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns `true` if the local database was left untouched.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}
