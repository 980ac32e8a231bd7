//! Lag-step primitive, and the Lag and Window operators built on it.
//!
//! [`LagStep`] drives two cursors over the same source, `current` and
//! `lagged`, kept exactly `lag` positions apart. Each outer move advances both
//! by `step` positions. What the outer cursor exposes at each position is
//! decided by a [`LagProjection`]:
//!
//! - [`LagPair`] yields `(current_value, (lagged_key, lagged_value))`.
//! - [`WindowRange`] yields the inclusive range `[lagged_key, current_key]`
//!   as a nested [`Series`].
//!
//! # Example
//!
//! ```rust,ignore
//! // Windows of three elements, advancing one element at a time.
//! for (key, window) in series.window(3, 1).iter() {
//!     let total: f64 = window.iter().map(|(_, v)| v).sum();
//! }
//! ```

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{self, Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use crate::fault::{self, Fault};
use crate::ops::range::RangeCursor;
use crate::series::Series;
use std::sync::Arc;

/// What a [`LagStep`] cursor exposes at each position.
pub trait LagProjection<C: Cursor>: Clone {
    /// Value type of the outer cursor.
    type Output: Clone;

    /// Builds the value from the two positioned cursors.
    fn project(&self, current: &C, lagged: &C) -> Self::Output;
}

/// Projection to `(current_value, (lagged_key, lagged_value))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LagPair;

impl<C: Cursor> LagProjection<C> for LagPair {
    type Output = (C::Value, (C::Key, C::Value));

    fn project(&self, current: &C, lagged: &C) -> Self::Output {
        (current.current_value(), lagged.current())
    }
}

/// Projection to the window `[lagged_key, current_key]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowRange;

impl<C: Cursor> LagProjection<C> for WindowRange {
    type Output = Series<RangeCursor<C>>;

    fn project(&self, current: &C, lagged: &C) -> Self::Output {
        Series::new(RangeCursor::new(
            current.initialize(),
            Some(lagged.current_key().clone()),
            Some(current.current_key().clone()),
            true,
            true,
        ))
    }
}

/// Lag operator: each pair together with the pair `width` positions earlier.
pub type LagCursor<C> = LagStep<C, LagPair>;

/// Window operator: each position with the trailing window ending there.
pub type WindowCursor<C> = LagStep<C, WindowRange>;

/// Two cursors a fixed number of positions apart, moving in steps.
#[derive(Debug, Clone)]
pub struct LagStep<C, P> {
    current: C,
    lagged: C,
    lookup: Option<C>,
    lag: usize,
    step: usize,
    projection: P,
    state: CursorState,
}

impl<C: Cursor> LagCursor<C> {
    /// Pairs every element with the one `width` positions before it.
    pub fn lag(inner: C, width: usize, step: usize) -> Self {
        LagStep::new(inner, width, step, LagPair)
    }
}

impl<C: Cursor> WindowCursor<C> {
    /// Trailing windows of `width` elements, advancing by `step`.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn window(inner: C, width: usize, step: usize) -> Self {
        assert!(width >= 1, "window width must be at least 1");
        LagStep::new(inner, width - 1, step, WindowRange)
    }
}

impl<C, P> LagStep<C, P>
where
    C: Cursor,
    P: LagProjection<C>,
{
    /// Builds a lag-step cursor with an explicit projection.
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero.
    pub fn new(inner: C, lag: usize, step: usize, projection: P) -> Self {
        assert!(step >= 1, "lag step must be at least 1");
        Self {
            lagged: inner.clone(),
            current: inner,
            lookup: None,
            lag,
            step,
            projection,
            state: CursorState::Initialized,
        }
    }

    /// Number of positions between the current and lagged cursors.
    pub fn lag_width(&self) -> usize {
        self.lag
    }

    /// Runs a move on both cursors and rolls them back if it does not land.
    fn attempt(&mut self, op: impl FnOnce(&mut Self) -> bool) -> bool {
        let backup = (self.current.clone(), self.lagged.clone());
        if op(self) {
            self.state = CursorState::Moving;
            return true;
        }
        (self.current, self.lagged) = backup;
        false
    }

    /// Places `lagged` `lag` positions behind an already positioned `current`.
    fn trail_current(&mut self) -> bool {
        self.lagged = self.current.clone();
        cursor::step_by(&mut self.lagged, self.lag, false) == self.lag
    }
}

impl<C, P> Cursor for LagStep<C, P>
where
    C: Cursor,
    P: LagProjection<C>,
{
    type Key = C::Key;
    type Value = P::Output;

    fn state(&self) -> CursorState {
        self.state
    }

    fn comparer(&self) -> &KeyComparer<C::Key> {
        self.current.comparer()
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn is_indexed(&self) -> bool {
        self.current.is_indexed()
    }

    fn is_completed(&self) -> bool {
        self.current.is_completed()
    }

    fn move_first(&mut self) -> bool {
        self.state.ensure_initialized("move_first");
        self.attempt(|this| {
            this.lagged.move_first() && {
                this.current = this.lagged.clone();
                cursor::step_by(&mut this.current, this.lag, true) == this.lag
            }
        })
    }

    fn move_last(&mut self) -> bool {
        self.state.ensure_initialized("move_last");
        self.attempt(|this| this.current.move_last() && this.trail_current())
    }

    fn move_next(&mut self) -> bool {
        self.state.ensure_initialized("move_next");
        if !self.state.is_moving() {
            return self.move_first();
        }
        self.attempt(|this| {
            if cursor::step_by(&mut this.current, this.step, true) < this.step {
                return false;
            }
            if cursor::step_by(&mut this.lagged, this.step, true) < this.step {
                // The leading cursor got through, so the trailing one must too.
                fault::raise(Fault::OutOfOrder("lag"));
            }
            true
        })
    }

    fn move_previous(&mut self) -> bool {
        self.state.ensure_initialized("move_previous");
        if !self.state.is_moving() {
            return self.move_last();
        }
        self.attempt(|this| {
            if cursor::step_by(&mut this.lagged, this.step, false) < this.step {
                return false;
            }
            if cursor::step_by(&mut this.current, this.step, false) < this.step {
                fault::raise(Fault::OutOfOrder("lag"));
            }
            true
        })
    }

    fn move_at(&mut self, key: &C::Key, direction: Lookup) -> bool {
        self.state.ensure_initialized("move_at");
        if self.attempt(|this| this.current.move_at(key, direction) && this.trail_current()) {
            return true;
        }
        // Landing before the first complete position; the first one is the
        // nearest position satisfying a forward lookup.
        direction.is_forward()
            && self.current.initialize().move_at(key, direction)
            && self.move_first()
    }

    fn current_key(&self) -> &C::Key {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_key"));
        }
        self.current.current_key()
    }

    fn current_value(&self) -> P::Output {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_value"));
        }
        self.projection.project(&self.current, &self.lagged)
    }

    fn try_get_value(&mut self, key: &C::Key) -> Option<P::Output> {
        let current = &self.current;
        let lookup = self.lookup.get_or_insert_with(|| current.initialize());
        if !lookup.move_at(key, Lookup::Eq) {
            return None;
        }
        let mut lagged = lookup.clone();
        (cursor::step_by(&mut lagged, self.lag, false) == self.lag)
            .then(|| self.projection.project(lookup, &lagged))
    }

    fn initialize(&self) -> Self {
        Self::new(
            self.current.initialize(),
            self.lag,
            self.step,
            self.projection.clone(),
        )
    }

    fn reset(&mut self) {
        self.current.reset();
        self.lagged.reset();
        self.state = CursorState::Initialized;
    }

    fn dispose(&mut self) {
        self.current.dispose();
        self.lagged.dispose();
        if let Some(lookup) = self.lookup.as_mut() {
            lookup.dispose();
        }
        self.lookup = None;
        self.state = CursorState::None;
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        self.current.subscribe(subscriber, sink);
    }
}
