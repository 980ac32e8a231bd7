//! Range - a key interval of the inner cursor.
//!
//! Either bound may be open (`None`) and each has its own inclusive flag.
//! Two sticky flags remember that the cursor already ran into a bound, so
//! repeated `move_next` at the end (or `move_previous` at the start) returns
//! `false` without probing the inner cursor again. A flag is only set when the
//! inner cursor actually crossed the bound, or ran out of data on a completed
//! source; running out on a live source may still be followed by appends.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use crate::fault::{self, Fault};
use std::cmp::Ordering;
use std::sync::Arc;

/// Cursor over the pairs of `inner` whose keys lie between two bounds.
#[derive(Debug, Clone)]
pub struct RangeCursor<C: Cursor> {
    inner: C,
    start: Option<C::Key>,
    end: Option<C::Key>,
    start_inclusive: bool,
    end_inclusive: bool,
    at_start: bool,
    at_end: bool,
    state: CursorState,
}

impl<C: Cursor> RangeCursor<C> {
    /// Bounds `inner` to `[start, end]`.
    ///
    /// # Panics
    ///
    /// Faults if `inner` is insertion ordered.
    pub fn new(
        inner: C,
        start: Option<C::Key>,
        end: Option<C::Key>,
        start_inclusive: bool,
        end_inclusive: bool,
    ) -> Self {
        if inner.is_indexed() {
            fault::raise(Fault::IndexedSource("range"));
        }
        Self {
            inner,
            start,
            end,
            start_inclusive,
            end_inclusive,
            at_start: false,
            at_end: false,
            state: CursorState::Initialized,
        }
    }

    /// Lower bound, if any.
    pub fn start(&self) -> Option<&C::Key> {
        self.start.as_ref()
    }

    /// Upper bound, if any.
    pub fn end(&self) -> Option<&C::Key> {
        self.end.as_ref()
    }

    fn after_start(&self, key: &C::Key) -> bool {
        match &self.start {
            None => true,
            Some(start) => match self.inner.comparer().compare(key, start) {
                Ordering::Greater => true,
                Ordering::Equal => self.start_inclusive,
                Ordering::Less => false,
            },
        }
    }

    fn before_end(&self, key: &C::Key) -> bool {
        match &self.end {
            None => true,
            Some(end) => match self.inner.comparer().compare(key, end) {
                Ordering::Less => true,
                Ordering::Equal => self.end_inclusive,
                Ordering::Greater => false,
            },
        }
    }

    /// Returns true if `key` lies inside the range.
    pub fn contains(&self, key: &C::Key) -> bool {
        self.after_start(key) && self.before_end(key)
    }

    /// Adopts `trial`, a moved copy of the inner cursor, if it landed inside
    /// the range; otherwise the inner cursor stays where it was.
    fn land(&mut self, trial: C, moved: bool) -> bool {
        if moved && self.contains(trial.current_key()) {
            self.inner = trial;
            self.state = CursorState::Moving;
            return true;
        }
        false
    }
}

impl<C: Cursor> Cursor for RangeCursor<C> {
    type Key = C::Key;
    type Value = C::Value;

    fn state(&self) -> CursorState {
        self.state
    }

    fn comparer(&self) -> &KeyComparer<C::Key> {
        self.inner.comparer()
    }

    fn is_continuous(&self) -> bool {
        self.inner.is_continuous()
    }

    fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }

    fn move_first(&mut self) -> bool {
        self.state.ensure_initialized("move_first");
        let mut trial = self.inner.clone();
        let moved = match &self.start {
            Some(start) if self.start_inclusive => trial.move_at(start, Lookup::Ge),
            Some(start) => trial.move_at(start, Lookup::Gt),
            None => trial.move_first(),
        };
        let landed = self.land(trial, moved);
        if landed {
            self.at_start = false;
            self.at_end = false;
        }
        landed
    }

    fn move_last(&mut self) -> bool {
        self.state.ensure_initialized("move_last");
        let mut trial = self.inner.clone();
        let moved = match &self.end {
            Some(end) if self.end_inclusive => trial.move_at(end, Lookup::Le),
            Some(end) => trial.move_at(end, Lookup::Lt),
            None => trial.move_last(),
        };
        let landed = self.land(trial, moved);
        if landed {
            self.at_start = false;
            self.at_end = false;
        }
        landed
    }

    fn move_next(&mut self) -> bool {
        self.state.ensure_initialized("move_next");
        if !self.state.is_moving() {
            return self.move_first();
        }
        if self.at_end {
            return false;
        }
        let mut trial = self.inner.clone();
        let moved = trial.move_next();
        if self.land(trial, moved) {
            self.at_start = false;
            return true;
        }
        self.at_end = moved || self.inner.is_completed();
        false
    }

    fn move_previous(&mut self) -> bool {
        self.state.ensure_initialized("move_previous");
        if !self.state.is_moving() {
            return self.move_last();
        }
        if self.at_start {
            return false;
        }
        let mut trial = self.inner.clone();
        let moved = trial.move_previous();
        if self.land(trial, moved) {
            self.at_end = false;
            return true;
        }
        self.at_start = moved || self.inner.is_completed();
        false
    }

    fn move_at(&mut self, key: &C::Key, direction: Lookup) -> bool {
        self.state.ensure_initialized("move_at");
        match direction {
            Lookup::Ge | Lookup::Gt if !self.after_start(key) => return self.move_first(),
            Lookup::Le | Lookup::Lt if !self.before_end(key) => return self.move_last(),
            _ => {}
        }
        let mut trial = self.inner.clone();
        let moved = trial.move_at(key, direction);
        let landed = self.land(trial, moved);
        if landed {
            self.at_start = false;
            self.at_end = false;
        }
        landed
    }

    fn current_key(&self) -> &C::Key {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_key"));
        }
        self.inner.current_key()
    }

    fn current_value(&self) -> C::Value {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_value"));
        }
        self.inner.current_value()
    }

    fn try_get_value(&mut self, key: &C::Key) -> Option<C::Value> {
        if !self.contains(key) {
            return None;
        }
        self.inner.try_get_value(key)
    }

    fn initialize(&self) -> Self {
        Self {
            inner: self.inner.initialize(),
            start: self.start.clone(),
            end: self.end.clone(),
            start_inclusive: self.start_inclusive,
            end_inclusive: self.end_inclusive,
            at_start: false,
            at_end: false,
            state: CursorState::Initialized,
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.at_start = false;
        self.at_end = false;
        self.state = CursorState::Initialized;
    }

    fn dispose(&mut self) {
        self.inner.dispose();
        self.state = CursorState::None;
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        self.inner.subscribe(subscriber, sink);
    }
}
