//! Fill - makes a series continuous with a constant default.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use std::sync::Arc;

/// Cursor that answers point lookups at missing keys with a fixed value.
///
/// Navigation is unchanged; only [`Cursor::try_get_value`] differs.
#[derive(Debug, Clone)]
pub struct FillCursor<C: Cursor> {
    inner: C,
    default: C::Value,
}

impl<C: Cursor> FillCursor<C> {
    /// Wraps `inner`.
    pub fn new(inner: C, default: C::Value) -> Self {
        Self { inner, default }
    }
}

impl<C: Cursor> Cursor for FillCursor<C> {
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
        self.inner.move_first()
    }

    fn move_last(&mut self) -> bool {
        self.inner.move_last()
    }

    fn move_next(&mut self) -> bool {
        self.inner.move_next()
    }

    fn move_previous(&mut self) -> bool {
        self.inner.move_previous()
    }

    fn move_at(&mut self, key: &C::Key, direction: Lookup) -> bool {
        self.inner.move_at(key, direction)
    }

    fn current_key(&self) -> &C::Key {
        self.inner.current_key()
    }

    fn current_value(&self) -> C::Value {
        self.inner.current_value()
    }

    fn try_get_value(&mut self, key: &C::Key) -> Option<C::Value> {
        Some(
            self.inner
                .try_get_value(key)
                .unwrap_or_else(|| self.default.clone()),
        )
    }

    fn initialize(&self) -> Self {
        Self::new(self.inner.initialize(), self.default.clone())
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn dispose(&mut self) {
        self.inner.dispose();
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        self.inner.subscribe(subscriber, sink);
    }
}
