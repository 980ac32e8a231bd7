//! Error and Result types for Skein container operations.
//!
//! Only recoverable conditions live here. Broken caller invariants (navigating
//! a disposed cursor, zipping incompatible sources, a source reordered under a
//! reader) are not errors; they are raised through [`crate::fault`].

use thiserror::Error;

/// A convenience `Result` type for Skein operations.
pub type Result<T> = std::result::Result<T, SeriesError>;

/// The error type for container writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// The container was completed and no longer accepts writes.
    #[error("Container is completed, cannot write")]
    Completed,

    /// `try_add` found the key already present.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// `append` was given a key that does not sort after the last key.
    #[error("Out of order append: key {key} is not after last key {last}")]
    OutOfOrderAppend {
        /// Debug rendering of the rejected key.
        key: String,
        /// Debug rendering of the current last key.
        last: String,
    },

    /// The operation needs key order, but the container is insertion ordered.
    #[error("Operation requires a sorted container: {0}")]
    IndexedMutation(&'static str),
}

impl SeriesError {
    pub(crate) fn duplicate<K: std::fmt::Debug>(key: &K) -> Self {
        Self::DuplicateKey(format!("{:?}", key))
    }

    pub(crate) fn out_of_order<K: std::fmt::Debug>(key: &K, last: &K) -> Self {
        Self::OutOfOrderAppend {
            key: format!("{:?}", key),
            last: format!("{:?}", last),
        }
    }
}
