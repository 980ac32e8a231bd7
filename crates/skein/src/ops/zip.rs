//! Zip - merge-join of two cursors over one key domain.
//!
//! The join strategy is fixed at construction from the continuity of the
//! inputs:
//!
//! | Mode              | Navigates over                  | Other side          |
//! |-------------------|---------------------------------|---------------------|
//! | `Discrete`        | keys present on both sides      | -                   |
//! | `LeftContinuous`  | keys of the right (discrete)    | `left.try_get_value`  |
//! | `RightContinuous` | keys of the left (discrete)     | `right.try_get_value` |
//! | `BothContinuous`  | union of both sides' keys       | both `try_get_value`  |
//!
//! Keys where a continuous side has no value are skipped. Only a zip of two
//! continuous inputs is itself continuous.
//!
//! Both inputs must use the same comparer instance and be key ordered;
//! anything else is a fault at construction.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use crate::fault::{self, Fault};
use std::cmp::Ordering;
use std::sync::Arc;

/// Join strategy of a [`ZipCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipMode {
    /// Both inputs discrete: classic merge-join.
    Discrete,
    /// Left input continuous: navigate the right input.
    LeftContinuous,
    /// Right input continuous: navigate the left input.
    RightContinuous,
    /// Both inputs continuous: navigate the union of stored keys.
    BothContinuous,
}

impl ZipMode {
    /// Mode for inputs of the given continuity.
    pub fn of(left_continuous: bool, right_continuous: bool) -> Self {
        match (left_continuous, right_continuous) {
            (false, false) => ZipMode::Discrete,
            (true, false) => ZipMode::LeftContinuous,
            (false, true) => ZipMode::RightContinuous,
            (true, true) => ZipMode::BothContinuous,
        }
    }
}

/// How a move is continued when the landed key has to be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Forward,
    Backward,
    Stay,
}

impl Scan {
    fn of(direction: Lookup) -> Self {
        if direction.is_forward() {
            Scan::Forward
        } else if direction.is_backward() {
            Scan::Backward
        } else {
            Scan::Stay
        }
    }
}

/// Cursor yielding `(left_value, right_value)` at keys where both sides answer.
#[derive(Debug, Clone)]
pub struct ZipCursor<L: Cursor, R: Cursor> {
    left: L,
    right: R,
    mode: ZipMode,
    state: CursorState,
    key: Option<L::Key>,
    left_value: Option<L::Value>,
    right_value: Option<R::Value>,
}

impl<L, R> ZipCursor<L, R>
where
    L: Cursor,
    R: Cursor<Key = L::Key>,
{
    /// Joins `left` and `right`.
    ///
    /// # Panics
    ///
    /// Faults if the inputs use different comparer instances or either one is
    /// insertion ordered.
    pub fn new(left: L, right: R) -> Self {
        if !left.comparer().same_instance(right.comparer()) {
            fault::raise(Fault::ComparerMismatch("zip"));
        }
        if left.is_indexed() || right.is_indexed() {
            fault::raise(Fault::IndexedSource("zip"));
        }
        let mode = ZipMode::of(left.is_continuous(), right.is_continuous());
        Self {
            left,
            right,
            mode,
            state: CursorState::Initialized,
            key: None,
            left_value: None,
            right_value: None,
        }
    }

    /// The join strategy in use.
    pub fn mode(&self) -> ZipMode {
        self.mode
    }

    fn compare_sides(&self) -> Ordering {
        self.left
            .comparer()
            .compare(self.left.current_key(), self.right.current_key())
    }

    /// Advances the smaller side until both sides sit on one key.
    fn align_forward(&mut self) -> bool {
        loop {
            let moved = match self.compare_sides() {
                Ordering::Equal => return true,
                Ordering::Less => self.left.move_next(),
                Ordering::Greater => self.right.move_next(),
            };
            if !moved {
                return false;
            }
        }
    }

    /// Moves the larger side back until both sides sit on one key.
    fn align_backward(&mut self) -> bool {
        loop {
            let moved = match self.compare_sides() {
                Ordering::Equal => return true,
                Ordering::Less => self.right.move_previous(),
                Ordering::Greater => self.left.move_previous(),
            };
            if !moved {
                return false;
            }
        }
    }

    /// Settles a move of the discrete left side against the continuous right.
    fn settle_on_left(&mut self, mut moved: bool, scan: Scan) -> bool {
        while moved {
            if let Some(value) = self.right.try_get_value(self.left.current_key()) {
                self.right_value = Some(value);
                return true;
            }
            moved = match scan {
                Scan::Forward => self.left.move_next(),
                Scan::Backward => self.left.move_previous(),
                Scan::Stay => false,
            };
        }
        false
    }

    /// Settles a move of the discrete right side against the continuous left.
    fn settle_on_right(&mut self, mut moved: bool, scan: Scan) -> bool {
        while moved {
            if let Some(value) = self.left.try_get_value(self.right.current_key()) {
                self.left_value = Some(value);
                return true;
            }
            moved = match scan {
                Scan::Forward => self.right.move_next(),
                Scan::Backward => self.right.move_previous(),
                Scan::Stay => false,
            };
        }
        false
    }

    /// Picks the next union key from whichever sides moved.
    fn union_candidate(&self, left_moved: bool, right_moved: bool, scan: Scan) -> Option<L::Key> {
        let comparer = self.left.comparer();
        match (left_moved, right_moved) {
            (false, false) => None,
            (true, false) => Some(self.left.current_key().clone()),
            (false, true) => Some(self.right.current_key().clone()),
            (true, true) => {
                let (l, r) = (self.left.current_key(), self.right.current_key());
                let pick_left = match comparer.compare(l, r) {
                    Ordering::Less => scan != Scan::Backward,
                    Ordering::Greater => scan == Scan::Backward,
                    Ordering::Equal => true,
                };
                Some(if pick_left { l.clone() } else { r.clone() })
            }
        }
    }

    /// Settles a continuous-mode move starting at `candidate`.
    ///
    /// Side positions only feed candidate keys here, so a failed move needs
    /// no rollback: the zip keeps its own key and cached values.
    fn settle_union(&mut self, mut candidate: Option<L::Key>, scan: Scan) -> bool {
        while let Some(key) = candidate {
            let left = self.left.try_get_value(&key);
            let right = self.right.try_get_value(&key);
            if let (Some(left), Some(right)) = (left, right) {
                self.key = Some(key);
                self.left_value = Some(left);
                self.right_value = Some(right);
                self.state = CursorState::Moving;
                return true;
            }
            let direction = match scan {
                Scan::Forward => Lookup::Gt,
                Scan::Backward => Lookup::Lt,
                Scan::Stay => return false,
            };
            let left_moved = self.left.move_at(&key, direction);
            let right_moved = self.right.move_at(&key, direction);
            candidate = self.union_candidate(left_moved, right_moved, scan);
        }
        false
    }

    /// Starts a continuous-mode move from the zip's own key.
    fn seek_union(&mut self, direction: Lookup, start: Seek<'_, L::Key>) -> bool {
        let scan = Scan::of(direction);
        let (left_moved, right_moved) = match start {
            Seek::First => (self.left.move_first(), self.right.move_first()),
            Seek::Last => (self.left.move_last(), self.right.move_last()),
            Seek::Next | Seek::Previous => {
                let Some(key) = self.key.clone().filter(|_| self.state.is_moving()) else {
                    return false;
                };
                (
                    self.left.move_at(&key, direction),
                    self.right.move_at(&key, direction),
                )
            }
            Seek::At(key) => (
                self.left.move_at(key, direction),
                self.right.move_at(key, direction),
            ),
        };
        let candidate = self.union_candidate(left_moved, right_moved, scan);
        self.settle_union(candidate, scan)
    }

    /// Runs a move and rolls both sides back to where they were if it fails.
    fn seek(&mut self, direction: Lookup, start: Seek<'_, L::Key>) -> bool {
        if self.mode == ZipMode::BothContinuous {
            return self.seek_union(direction, start);
        }
        let scan = Scan::of(direction);
        let backup = (self.left.clone(), self.right.clone());
        let landed = match self.mode {
            ZipMode::RightContinuous => {
                let moved = step(&mut self.left, start, direction);
                self.settle_on_left(moved, scan)
            }
            ZipMode::LeftContinuous => {
                let moved = step(&mut self.right, start, direction);
                self.settle_on_right(moved, scan)
            }
            _ => {
                let moved = match start {
                    Seek::First => self.left.move_first() && self.right.move_first(),
                    Seek::Last => self.left.move_last() && self.right.move_last(),
                    Seek::Next => self.left.move_next(),
                    Seek::Previous => self.left.move_previous(),
                    Seek::At(key) => {
                        self.left.move_at(key, direction) && self.right.move_at(key, direction)
                    }
                };
                moved
                    && match scan {
                        Scan::Forward => self.align_forward(),
                        Scan::Backward => self.align_backward(),
                        Scan::Stay => self.compare_sides() == Ordering::Equal,
                    }
            }
        };
        if landed {
            self.state = CursorState::Moving;
        } else {
            (self.left, self.right) = backup;
        }
        landed
    }
}

/// Starting move of a zip seek.
enum Seek<'a, K> {
    First,
    Last,
    Next,
    Previous,
    At(&'a K),
}

/// Applies the starting move of a seek to the navigating side.
fn step<C: Cursor>(side: &mut C, start: Seek<'_, C::Key>, direction: Lookup) -> bool {
    match start {
        Seek::First => side.move_first(),
        Seek::Last => side.move_last(),
        Seek::Next => side.move_next(),
        Seek::Previous => side.move_previous(),
        Seek::At(key) => side.move_at(key, direction),
    }
}

impl<L, R> Cursor for ZipCursor<L, R>
where
    L: Cursor,
    R: Cursor<Key = L::Key>,
{
    type Key = L::Key;
    type Value = (L::Value, R::Value);

    fn state(&self) -> CursorState {
        self.state
    }

    fn comparer(&self) -> &KeyComparer<L::Key> {
        self.left.comparer()
    }

    fn is_continuous(&self) -> bool {
        self.mode == ZipMode::BothContinuous
    }

    fn is_completed(&self) -> bool {
        self.left.is_completed() && self.right.is_completed()
    }

    fn move_first(&mut self) -> bool {
        self.state.ensure_initialized("move_first");
        self.seek(Lookup::Ge, Seek::First)
    }

    fn move_last(&mut self) -> bool {
        self.state.ensure_initialized("move_last");
        self.seek(Lookup::Le, Seek::Last)
    }

    fn move_next(&mut self) -> bool {
        self.state.ensure_initialized("move_next");
        if !self.state.is_moving() {
            return self.move_first();
        }
        self.seek(Lookup::Gt, Seek::Next)
    }

    fn move_previous(&mut self) -> bool {
        self.state.ensure_initialized("move_previous");
        if !self.state.is_moving() {
            return self.move_last();
        }
        self.seek(Lookup::Lt, Seek::Previous)
    }

    fn move_at(&mut self, key: &L::Key, direction: Lookup) -> bool {
        self.state.ensure_initialized("move_at");
        self.seek(direction, Seek::At(key))
    }

    fn current_key(&self) -> &L::Key {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_key"));
        }
        match self.mode {
            ZipMode::Discrete | ZipMode::RightContinuous => self.left.current_key(),
            ZipMode::LeftContinuous => self.right.current_key(),
            ZipMode::BothContinuous => match &self.key {
                Some(key) => key,
                None => fault::raise(Fault::NotPositioned("current_key")),
            },
        }
    }

    fn current_value(&self) -> (L::Value, R::Value) {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_value"));
        }
        let left = match self.mode {
            ZipMode::Discrete | ZipMode::RightContinuous => Some(self.left.current_value()),
            ZipMode::LeftContinuous | ZipMode::BothContinuous => self.left_value.clone(),
        };
        let right = match self.mode {
            ZipMode::Discrete | ZipMode::LeftContinuous => Some(self.right.current_value()),
            ZipMode::RightContinuous | ZipMode::BothContinuous => self.right_value.clone(),
        };
        match (left, right) {
            (Some(left), Some(right)) => (left, right),
            _ => fault::raise(Fault::NotPositioned("current_value")),
        }
    }

    fn try_get_value(&mut self, key: &L::Key) -> Option<(L::Value, R::Value)> {
        let left = self.left.try_get_value(key)?;
        let right = self.right.try_get_value(key)?;
        Some((left, right))
    }

    fn initialize(&self) -> Self {
        Self {
            left: self.left.initialize(),
            right: self.right.initialize(),
            mode: self.mode,
            state: CursorState::Initialized,
            key: None,
            left_value: None,
            right_value: None,
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.key = None;
        self.left_value = None;
        self.right_value = None;
        self.state = CursorState::Initialized;
    }

    fn dispose(&mut self) {
        self.left.dispose();
        self.right.dispose();
        self.key = None;
        self.left_value = None;
        self.right_value = None;
        self.state = CursorState::None;
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        self.left.subscribe(subscriber, sink);
        self.right.subscribe(subscriber, sink);
    }
}
