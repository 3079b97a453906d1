//! Error types for group operations.

use crate::types::GroupId;
use thiserror::Error;

/// Main error type for group and manager operations.
///
/// Producer failures never show up here; they travel to observers as
/// [`Event::Error`](crate::Event::Error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("Group {0} has been destroyed")]
    Destroyed(GroupId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Observable for tag {tag:?} has different value or error types")]
    TypeMismatch { tag: String },
}

/// Result type for group operations.
pub type Result<T> = std::result::Result<T, GroupError>;
