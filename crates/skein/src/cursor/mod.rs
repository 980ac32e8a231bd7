//! The cursor navigation contract.
//!
//! A [`Cursor`] is a stateful, bidirectional, seekable iterator over an ordered
//! key-value sequence. Containers hand out base cursors; every operator in
//! [`crate::ops`] and [`crate::online`] is itself a cursor wrapping one or two
//! inner cursors by value, so a whole pipeline monomorphizes into a single
//! struct with no boxing on the navigation path.
//!
//! # Life cycle
//!
//! ```text
//!   initialize()          move_*() == true
//!  ──────────────▶ Initialized ─────────────▶ Moving ◀──┐
//!                      ▲                        │       │ move_*()
//!                      └──────── reset() ───────┴───────┘
//!   dispose() from any state ──▶ None  (navigation is now a fault)
//! ```
//!
//! A failed move returns `false` and leaves a moving cursor where it was.
//! `move_next`/`move_previous` on an `Initialized` cursor behave as
//! `move_first`/`move_last`.

pub mod comparer;

pub use comparer::{Descending, KeyComparer, KeyOrder, SeriesKey};

use crate::container::subscription::{AsyncSubscriber, Subscription};
use crate::fault::{self, Fault};
use std::cmp::Ordering;
use std::sync::Arc;

/// Life-cycle state of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    /// Disposed or never bound; any navigation is a fault.
    #[default]
    None,
    /// Bound to a source but not positioned.
    Initialized,
    /// Positioned on a valid key-value pair.
    Moving,
    /// Positioned on a valid pair as part of a batch move.
    BatchMoving,
}

impl CursorState {
    /// Returns true if the current pair is valid.
    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(self, CursorState::Moving | CursorState::BatchMoving)
    }

    /// Faults if the state is `None`.
    #[inline]
    #[track_caller]
    pub fn ensure_initialized(self, op: &'static str) {
        if self == CursorState::None {
            fault::raise(Fault::NotInitialized(op));
        }
    }
}

/// Direction of a key lookup relative to the requested key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Exactly the requested key.
    Eq,
    /// The smallest key greater than or equal to the requested key.
    Ge,
    /// The smallest key strictly greater than the requested key.
    Gt,
    /// The largest key less than or equal to the requested key.
    Le,
    /// The largest key strictly less than the requested key.
    Lt,
}

impl Lookup {
    /// Returns true for `Ge` and `Gt`.
    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Lookup::Ge | Lookup::Gt)
    }

    /// Returns true for `Le` and `Lt`.
    #[inline]
    pub fn is_backward(self) -> bool {
        matches!(self, Lookup::Le | Lookup::Lt)
    }

    /// Returns true if a key comparing to the requested key as `ordering`
    /// (found key versus requested key) satisfies this lookup.
    #[inline]
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Lookup::Eq => ordering == Ordering::Equal,
            Lookup::Ge => ordering != Ordering::Less,
            Lookup::Gt => ordering == Ordering::Greater,
            Lookup::Le => ordering != Ordering::Greater,
            Lookup::Lt => ordering == Ordering::Less,
        }
    }

    /// Maps a binary search result over `len` sorted keys to the index
    /// this lookup lands on.
    pub fn resolve(self, search: std::result::Result<usize, usize>, len: usize) -> Option<usize> {
        match (self, search) {
            (Lookup::Eq, Ok(i)) | (Lookup::Ge, Ok(i)) | (Lookup::Le, Ok(i)) => Some(i),
            (Lookup::Eq, Err(_)) => None,
            (Lookup::Ge, Err(i)) => (i < len).then_some(i),
            (Lookup::Gt, Ok(i)) => (i + 1 < len).then_some(i + 1),
            (Lookup::Gt, Err(i)) => (i < len).then_some(i),
            (Lookup::Le, Err(i)) => i.checked_sub(1),
            (Lookup::Lt, Ok(i)) | (Lookup::Lt, Err(i)) => i.checked_sub(1),
        }
    }
}

/// Sink for the subscriptions a cursor registers on its live sources.
pub type SubscriptionSink = Vec<Subscription>;

/// A stateful, positionable iterator over an ordered key-value sequence.
///
/// `Clone` yields an independent cursor positioned identically to the
/// original; [`initialize`](Cursor::initialize) yields an independent
/// unpositioned one. Neither shares mutable state with the origin.
pub trait Cursor: Clone {
    /// Key type.
    type Key: SeriesKey;
    /// Value type.
    type Value: Clone;

    /// Current life-cycle state.
    fn state(&self) -> CursorState;

    /// The order of this cursor's keys.
    fn comparer(&self) -> &KeyComparer<Self::Key>;

    /// Whether [`try_get_value`](Cursor::try_get_value) answers at any key.
    fn is_continuous(&self) -> bool;

    /// Whether keys are in insertion order rather than key order.
    fn is_indexed(&self) -> bool {
        false
    }

    /// Whether every source below this cursor is completed and can no longer change.
    fn is_completed(&self) -> bool;

    /// Moves to the first pair.
    fn move_first(&mut self) -> bool;

    /// Moves to the last pair.
    fn move_last(&mut self) -> bool;

    /// Moves to the next pair.
    fn move_next(&mut self) -> bool;

    /// Moves to the previous pair.
    fn move_previous(&mut self) -> bool;

    /// Moves to the pair selected by `key` and `direction`.
    fn move_at(&mut self, key: &Self::Key, direction: Lookup) -> bool;

    /// Key at the current position.
    fn current_key(&self) -> &Self::Key;

    /// Value at the current position.
    fn current_value(&self) -> Self::Value;

    /// Current key and value.
    fn current(&self) -> (Self::Key, Self::Value) {
        (self.current_key().clone(), self.current_value())
    }

    /// Point lookup independent of the current position.
    fn try_get_value(&mut self, key: &Self::Key) -> Option<Self::Value>;

    /// A fresh cursor over the same source, in the `Initialized` state.
    fn initialize(&self) -> Self;

    /// Returns to the `Initialized` state.
    fn reset(&mut self);

    /// Releases the cursor's resources and moves it to the `None` state.
    fn dispose(&mut self);

    /// Registers `subscriber` on every live container below this cursor.
    fn subscribe(&self, _subscriber: &Arc<dyn AsyncSubscriber>, _sink: &mut SubscriptionSink) {}
}

/// Steps `cursor` up to `n` times; returns the number of steps taken.
pub(crate) fn step_by<C: Cursor>(cursor: &mut C, n: usize, forward: bool) -> usize {
    for taken in 0..n {
        let moved = if forward {
            cursor.move_next()
        } else {
            cursor.move_previous()
        };
        if !moved {
            return taken;
        }
    }
    n
}
