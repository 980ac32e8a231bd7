//! Map - lazy value projection.
//!
//! The selector runs only when a value is requested, never on navigation.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use std::sync::Arc;

/// A projection of a key-value pair.
pub trait Selector<K, V>: Clone {
    /// Projected value type.
    type Output: Clone;

    /// Projects one pair.
    fn select(&self, key: &K, value: &V) -> Self::Output;
}

/// Selector over both key and value.
#[derive(Debug, Clone, Copy)]
pub struct KeyValueSelector<F>(pub F);

impl<K, V, R, F> Selector<K, V> for KeyValueSelector<F>
where
    F: Fn(&K, &V) -> R + Clone,
    R: Clone,
{
    type Output = R;

    #[inline]
    fn select(&self, key: &K, value: &V) -> R {
        (self.0)(key, value)
    }
}

/// Selector over the value only.
#[derive(Debug, Clone, Copy)]
pub struct ValueSelector<F>(pub F);

impl<K, V, R, F> Selector<K, V> for ValueSelector<F>
where
    F: Fn(&V) -> R + Clone,
    R: Clone,
{
    type Output = R;

    #[inline]
    fn select(&self, _key: &K, value: &V) -> R {
        (self.0)(value)
    }
}

/// Selector over the two halves of a zipped pair.
#[derive(Debug, Clone, Copy)]
pub struct ZipSelector<F>(pub F);

impl<K, L, R, T, F> Selector<K, (L, R)> for ZipSelector<F>
where
    F: Fn(&L, &R) -> T + Clone,
    T: Clone,
{
    type Output = T;

    #[inline]
    fn select(&self, _key: &K, value: &(L, R)) -> T {
        (self.0)(&value.0, &value.1)
    }
}

/// Cursor yielding `selector(key, value)` for every pair of the inner cursor.
#[derive(Debug, Clone)]
pub struct MapCursor<C, S> {
    inner: C,
    selector: S,
}

impl<C, S> MapCursor<C, S>
where
    C: Cursor,
    S: Selector<C::Key, C::Value>,
{
    /// Wraps `inner`.
    pub fn new(inner: C, selector: S) -> Self {
        Self { inner, selector }
    }
}

impl<C, S> Cursor for MapCursor<C, S>
where
    C: Cursor,
    S: Selector<C::Key, C::Value>,
{
    type Key = C::Key;
    type Value = S::Output;

    fn state(&self) -> CursorState {
        self.inner.state()
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

    fn current_value(&self) -> S::Output {
        let value = self.inner.current_value();
        self.selector.select(self.inner.current_key(), &value)
    }

    fn try_get_value(&mut self, key: &C::Key) -> Option<S::Output> {
        self.inner
            .try_get_value(key)
            .map(|value| self.selector.select(key, &value))
    }

    fn initialize(&self) -> Self {
        Self::new(self.inner.initialize(), self.selector.clone())
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
