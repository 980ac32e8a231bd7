//! Filter - skips pairs rejected by a predicate.
//!
//! Three predicate shapes are supported. [`ByKey`] never touches the value,
//! which matters when values are produced lazily by an inner map.
//!
//! A move that runs out of matching pairs puts the inner cursor back on the
//! last published key, so a failed move leaves the filter where it was.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use crate::fault::{self, Fault};
use std::sync::Arc;

/// Decides which pairs a [`FilterCursor`] keeps.
pub trait FilterPredicate<K, V>: Clone {
    /// Tests the pair under `cursor`.
    fn test_current<C: Cursor<Key = K, Value = V>>(&self, cursor: &C) -> bool;

    /// Tests a key before its value is looked up.
    fn test_key(&self, _key: &K) -> bool {
        true
    }

    /// Tests a looked-up pair.
    fn test_pair(&self, key: &K, value: &V) -> bool;
}

/// Predicate over key and value.
#[derive(Debug, Clone, Copy)]
pub struct ByKeyValue<F>(pub F);

impl<K, V, F> FilterPredicate<K, V> for ByKeyValue<F>
where
    F: Fn(&K, &V) -> bool + Clone,
{
    fn test_current<C: Cursor<Key = K, Value = V>>(&self, cursor: &C) -> bool {
        (self.0)(cursor.current_key(), &cursor.current_value())
    }

    fn test_pair(&self, key: &K, value: &V) -> bool {
        (self.0)(key, value)
    }
}

/// Predicate over the key only.
#[derive(Debug, Clone, Copy)]
pub struct ByKey<F>(pub F);

impl<K, V, F> FilterPredicate<K, V> for ByKey<F>
where
    F: Fn(&K) -> bool + Clone,
{
    fn test_current<C: Cursor<Key = K, Value = V>>(&self, cursor: &C) -> bool {
        (self.0)(cursor.current_key())
    }

    fn test_key(&self, key: &K) -> bool {
        (self.0)(key)
    }

    fn test_pair(&self, key: &K, _value: &V) -> bool {
        (self.0)(key)
    }
}

/// Predicate over the value only.
#[derive(Debug, Clone, Copy)]
pub struct ByValue<F>(pub F);

impl<K, V, F> FilterPredicate<K, V> for ByValue<F>
where
    F: Fn(&V) -> bool + Clone,
{
    fn test_current<C: Cursor<Key = K, Value = V>>(&self, cursor: &C) -> bool {
        (self.0)(&cursor.current_value())
    }

    fn test_pair(&self, _key: &K, value: &V) -> bool {
        (self.0)(value)
    }
}

/// Cursor over the pairs of `inner` accepted by a predicate.
#[derive(Debug, Clone)]
pub struct FilterCursor<C, P> {
    inner: C,
    predicate: P,
    state: CursorState,
}

impl<C, P> FilterCursor<C, P>
where
    C: Cursor,
    P: FilterPredicate<C::Key, C::Value>,
{
    /// Wraps `inner`.
    pub fn new(inner: C, predicate: P) -> Self {
        Self {
            inner,
            predicate,
            state: CursorState::Initialized,
        }
    }

    /// Lands on the first match reached by `start` then repeated `step`.
    ///
    /// The search runs on a copy of the inner cursor, so a failed move
    /// leaves the filter exactly where it was.
    fn seek(
        &mut self,
        start: impl FnOnce(&mut C) -> bool,
        mut step: impl FnMut(&mut C) -> bool,
    ) -> bool {
        let mut trial = self.inner.clone();
        let mut found = start(&mut trial);
        while found && !self.predicate.test_current(&trial) {
            found = step(&mut trial);
        }
        if found {
            self.inner = trial;
            self.state = CursorState::Moving;
        }
        found
    }
}

impl<C, P> Cursor for FilterCursor<C, P>
where
    C: Cursor,
    P: FilterPredicate<C::Key, C::Value>,
{
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

    fn is_indexed(&self) -> bool {
        self.inner.is_indexed()
    }

    fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }

    fn move_first(&mut self) -> bool {
        self.state.ensure_initialized("move_first");
        self.seek(C::move_first, C::move_next)
    }

    fn move_last(&mut self) -> bool {
        self.state.ensure_initialized("move_last");
        self.seek(C::move_last, C::move_previous)
    }

    fn move_next(&mut self) -> bool {
        self.state.ensure_initialized("move_next");
        if !self.state.is_moving() {
            return self.move_first();
        }
        self.seek(C::move_next, C::move_next)
    }

    fn move_previous(&mut self) -> bool {
        self.state.ensure_initialized("move_previous");
        if !self.state.is_moving() {
            return self.move_last();
        }
        self.seek(C::move_previous, C::move_previous)
    }

    fn move_at(&mut self, key: &C::Key, direction: Lookup) -> bool {
        self.state.ensure_initialized("move_at");
        let start = |inner: &mut C| inner.move_at(key, direction);
        match direction {
            Lookup::Eq => self.seek(start, |_| false),
            Lookup::Ge | Lookup::Gt => self.seek(start, C::move_next),
            Lookup::Le | Lookup::Lt => self.seek(start, C::move_previous),
        }
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
        if !self.predicate.test_key(key) {
            return None;
        }
        self.inner
            .try_get_value(key)
            .filter(|value| self.predicate.test_pair(key, value))
    }

    fn initialize(&self) -> Self {
        Self::new(self.inner.initialize(), self.predicate.clone())
    }

    fn reset(&mut self) {
        self.inner.reset();
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
