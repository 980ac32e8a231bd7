//! Fatal faults.
//!
//! A fault is a broken invariant rather than a data condition: a cursor used
//! after disposal, operators combined over incompatible sources, a data source
//! that reordered itself under a reader, or a spinlock that never came free.
//! None of these can be handled meaningfully by the caller, so they are logged
//! and turned into a panic instead of a `Result`.

use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// An unrecoverable invariant violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Navigation on a cursor in the `None` state.
    #[error("cursor is not initialized: {0} called on a disposed cursor")]
    NotInitialized(&'static str),

    /// Current key or value requested while the cursor is not moving.
    #[error("cursor is not positioned: {0} requires a moving cursor")]
    NotPositioned(&'static str),

    /// Two inputs of a binary operator use different comparer instances.
    #[error("comparer mismatch: {0} requires both inputs to share one comparer")]
    ComparerMismatch(&'static str),

    /// A key-ordered operator was constructed over an insertion-ordered source.
    #[error("indexed source: {0} requires a key-ordered source")]
    IndexedSource(&'static str),

    /// Key arithmetic requested from a comparer that does not provide it.
    #[error("comparer does not support key arithmetic: {0}")]
    NotDiffable(&'static str),

    /// A cursor lost its position because the source broke its ordering.
    #[error("out of order: {0} lost its position")]
    OutOfOrder(&'static str),

    /// The container spinlock stayed held beyond the sanity timeout.
    #[error("lock starvation: spinlock held for more than {0:?}")]
    LockStarvation(Duration),
}

/// Logs `fault` and panics with its message.
#[cold]
#[track_caller]
pub fn raise(fault: Fault) -> ! {
    error!(%fault, "fatal fault");
    panic!("{}", fault)
}
