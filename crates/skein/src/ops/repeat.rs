//! Repeat - step-function lookups.
//!
//! A repeated series is continuous: the value at any key is the latest stored
//! value at or before it. Lookups near the current position are answered from
//! the current pair or from a one-slot cache of the pair before it; anything
//! else goes through a separate lookup cursor, cloned lazily on first use.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use std::cmp::Ordering;
use std::sync::Arc;

/// Cursor answering lookups with the last value at or before the key.
#[derive(Debug, Clone)]
pub struct RepeatCursor<C: Cursor> {
    inner: C,
    lookup: Option<C>,
    previous: Option<(C::Key, C::Value)>,
}

impl<C: Cursor> RepeatCursor<C> {
    /// Wraps `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            lookup: None,
            previous: None,
        }
    }

    fn moved(&mut self, moved: bool) -> bool {
        if moved {
            self.previous = None;
        }
        moved
    }

    fn lookup_at_or_before(&mut self, key: &C::Key) -> Option<C::Value> {
        let inner = &self.inner;
        let lookup = self.lookup.get_or_insert_with(|| inner.initialize());
        lookup
            .move_at(key, Lookup::Le)
            .then(|| lookup.current_value())
    }
}

impl<C: Cursor> Cursor for RepeatCursor<C> {
    type Key = C::Key;
    type Value = C::Value;

    fn state(&self) -> CursorState {
        self.inner.state()
    }

    fn comparer(&self) -> &KeyComparer<C::Key> {
        self.inner.comparer()
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn is_indexed(&self) -> bool {
        self.inner.is_indexed()
    }

    fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }

    fn move_first(&mut self) -> bool {
        let moved = self.inner.move_first();
        self.moved(moved)
    }

    fn move_last(&mut self) -> bool {
        let moved = self.inner.move_last();
        self.moved(moved)
    }

    fn move_next(&mut self) -> bool {
        let before = self
            .inner
            .state()
            .is_moving()
            .then(|| self.inner.current());
        if !self.inner.move_next() {
            return false;
        }
        self.previous = before;
        true
    }

    fn move_previous(&mut self) -> bool {
        let moved = self.inner.move_previous();
        self.moved(moved)
    }

    fn move_at(&mut self, key: &C::Key, direction: Lookup) -> bool {
        let moved = self.inner.move_at(key, direction);
        self.moved(moved)
    }

    fn current_key(&self) -> &C::Key {
        self.inner.current_key()
    }

    fn current_value(&self) -> C::Value {
        self.inner.current_value()
    }

    fn try_get_value(&mut self, key: &C::Key) -> Option<C::Value> {
        if self.inner.state().is_moving() {
            let comparer = self.inner.comparer();
            match comparer.compare(key, self.inner.current_key()) {
                Ordering::Equal => return Some(self.inner.current_value()),
                Ordering::Less => {
                    if let Some((previous_key, previous_value)) = &self.previous {
                        if comparer.compare(key, previous_key) != Ordering::Less {
                            return Some(previous_value.clone());
                        }
                    }
                }
                Ordering::Greater => {}
            }
        }
        self.lookup_at_or_before(key)
    }

    fn initialize(&self) -> Self {
        Self::new(self.inner.initialize())
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.previous = None;
    }

    fn dispose(&mut self) {
        self.inner.dispose();
        if let Some(lookup) = self.lookup.as_mut() {
            lookup.dispose();
        }
        self.lookup = None;
        self.previous = None;
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        self.inner.subscribe(subscriber, sink);
    }
}
