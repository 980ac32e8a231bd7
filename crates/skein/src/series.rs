//! Series - read-only ordered views and the pipeline surface.
//!
//! A [`Series`] wraps a prototype cursor. Every query opens a fresh cursor
//! through [`Cursor::initialize`], and that cursor is disposed on every exit
//! path, including an iterator dropped halfway.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_skein::container::SortedMap;
//!
//! let mut writer = SortedMap::<i64, f64>::writer();
//! for (k, v) in [(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)] {
//!     writer.append(k, v)?;
//! }
//!
//! let smoothed = writer.series().filter_values(|v| *v > 1.0).sma(2);
//! let points: Vec<(i64, f64)> = smoothed.iter().collect();
//! ```

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, KeyComparer, Lookup, SubscriptionSink};
use crate::online::{MovingSum, OnlineOp, Sma, SpanCursor, SpanWidth, Stat2Op};
use crate::ops::{
    ByKey, ByKeyValue, ByValue, FillCursor, FilterCursor, KeyValueSelector, LagCursor, MapCursor,
    RangeCursor, RepeatCursor, ValueSelector, WindowCursor, ZipCursor, ZipSelector,
};
use futures::task::AtomicWaker;
use futures::Stream;
use num_traits::{Num, ToPrimitive};
use std::iter::FusedIterator;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Read-only ordered view over a cursor.
#[derive(Debug, Clone)]
pub struct Series<C> {
    cursor: C,
}

/// A cursor that is disposed when dropped.
#[derive(Debug)]
pub struct ScopedCursor<C: Cursor>(C);

impl<C: Cursor> Deref for ScopedCursor<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C: Cursor> DerefMut for ScopedCursor<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

impl<C: Cursor> Drop for ScopedCursor<C> {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

impl<C: Cursor> Series<C> {
    /// Wraps `cursor` as a series.
    pub fn new(cursor: C) -> Self {
        Self { cursor }
    }

    /// A fresh, unpositioned cursor over the series.
    pub fn cursor(&self) -> C {
        self.cursor.initialize()
    }

    /// A fresh cursor that is disposed when dropped.
    pub fn scoped_cursor(&self) -> ScopedCursor<C> {
        ScopedCursor(self.cursor())
    }

    /// Unwraps the prototype cursor.
    pub fn into_cursor(self) -> C {
        self.cursor
    }

    /// Key order of the series.
    pub fn comparer(&self) -> &KeyComparer<C::Key> {
        self.cursor.comparer()
    }

    /// Whether point lookups answer at any key.
    pub fn is_continuous(&self) -> bool {
        self.cursor.is_continuous()
    }

    /// Whether keys are in insertion order.
    pub fn is_indexed(&self) -> bool {
        self.cursor.is_indexed()
    }

    /// Whether every source below the series is completed.
    pub fn is_completed(&self) -> bool {
        self.cursor.is_completed()
    }

    /// First pair.
    pub fn first(&self) -> Option<(C::Key, C::Value)> {
        let mut cursor = self.scoped_cursor();
        cursor.move_first().then(|| cursor.current())
    }

    /// Last pair.
    pub fn last(&self) -> Option<(C::Key, C::Value)> {
        let mut cursor = self.scoped_cursor();
        cursor.move_last().then(|| cursor.current())
    }

    /// Pair selected by `key` and `direction`.
    pub fn try_find(&self, key: &C::Key, direction: Lookup) -> Option<(C::Key, C::Value)> {
        let mut cursor = self.scoped_cursor();
        cursor.move_at(key, direction).then(|| cursor.current())
    }

    /// Value at `key`; continuous series answer between stored keys too.
    pub fn try_get_value(&self, key: &C::Key) -> Option<C::Value> {
        self.scoped_cursor().try_get_value(key)
    }

    /// Pairs in key order.
    pub fn iter(&self) -> SeriesIter<C> {
        SeriesIter::new(self.scoped_cursor(), true)
    }

    /// Pairs in reverse key order.
    pub fn iter_rev(&self) -> SeriesIter<C> {
        SeriesIter::new(self.scoped_cursor(), false)
    }

    /// Lazily projects every pair with `selector`.
    pub fn map<F, R>(&self, selector: F) -> Series<MapCursor<C, KeyValueSelector<F>>>
    where
        F: Fn(&C::Key, &C::Value) -> R + Clone,
        R: Clone,
    {
        Series::new(MapCursor::new(self.cursor(), KeyValueSelector(selector)))
    }

    /// Lazily projects every value with `selector`.
    pub fn map_values<F, R>(&self, selector: F) -> Series<MapCursor<C, ValueSelector<F>>>
    where
        F: Fn(&C::Value) -> R + Clone,
        R: Clone,
    {
        Series::new(MapCursor::new(self.cursor(), ValueSelector(selector)))
    }

    /// Keeps the pairs accepted by `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Series<FilterCursor<C, ByKeyValue<F>>>
    where
        F: Fn(&C::Key, &C::Value) -> bool + Clone,
    {
        Series::new(FilterCursor::new(self.cursor(), ByKeyValue(predicate)))
    }

    /// Keeps the pairs whose key is accepted; values are never evaluated.
    pub fn filter_keys<F>(&self, predicate: F) -> Series<FilterCursor<C, ByKey<F>>>
    where
        F: Fn(&C::Key) -> bool + Clone,
    {
        Series::new(FilterCursor::new(self.cursor(), ByKey(predicate)))
    }

    /// Keeps the pairs whose value is accepted.
    pub fn filter_values<F>(&self, predicate: F) -> Series<FilterCursor<C, ByValue<F>>>
    where
        F: Fn(&C::Value) -> bool + Clone,
    {
        Series::new(FilterCursor::new(self.cursor(), ByValue(predicate)))
    }

    /// Continuous view answering missing keys with `default`.
    pub fn fill(&self, default: C::Value) -> Series<FillCursor<C>> {
        Series::new(FillCursor::new(self.cursor(), default))
    }

    /// Continuous view answering each key with the last value at or before it.
    pub fn repeat(&self) -> Series<RepeatCursor<C>> {
        Series::new(RepeatCursor::new(self.cursor()))
    }

    /// Pairs with keys between `start` and `end`; `None` leaves a side open.
    pub fn range(
        &self,
        start: Option<C::Key>,
        end: Option<C::Key>,
        start_inclusive: bool,
        end_inclusive: bool,
    ) -> Series<RangeCursor<C>> {
        Series::new(RangeCursor::new(
            self.cursor(),
            start,
            end,
            start_inclusive,
            end_inclusive,
        ))
    }

    /// Pairs with keys at or after `start`.
    pub fn after(&self, start: C::Key) -> Series<RangeCursor<C>> {
        self.range(Some(start), None, true, true)
    }

    /// Pairs with keys at or before `end`.
    pub fn before(&self, end: C::Key) -> Series<RangeCursor<C>> {
        self.range(None, Some(end), true, true)
    }

    /// Trailing windows of `width` elements, advancing by `step`.
    pub fn window(&self, width: usize, step: usize) -> Series<WindowCursor<C>> {
        Series::new(WindowCursor::window(self.cursor(), width, step))
    }

    /// Each pair with the pair `width` positions earlier, advancing by `step`.
    pub fn lag(&self, width: usize, step: usize) -> Series<LagCursor<C>> {
        Series::new(LagCursor::lag(self.cursor(), width, step))
    }

    /// Online aggregate `op` over trailing windows.
    pub fn span<Op>(
        &self,
        op: Op,
        width: SpanWidth,
        allow_incomplete: bool,
    ) -> Series<SpanCursor<C, Op>>
    where
        Op: OnlineOp<C::Key, C::Value>,
    {
        Series::new(SpanCursor::new(self.cursor(), op, width, allow_incomplete))
    }

    /// Simple moving average over `width` elements; complete windows only.
    pub fn sma(&self, width: usize) -> Series<SpanCursor<C, Sma>>
    where
        C::Value: ToPrimitive,
    {
        self.span(Sma::new(), SpanWidth::Count(width), false)
    }

    /// Moving sum over `width` elements; complete windows only.
    pub fn moving_sum(&self, width: usize) -> Series<SpanCursor<C, MovingSum<C::Value>>>
    where
        C::Value: Num + Copy,
    {
        self.span(MovingSum::new(), SpanWidth::Count(width), false)
    }

    /// Count, sum, mean and variance over `width` elements; complete windows only.
    pub fn stat2(&self, width: usize) -> Series<SpanCursor<C, Stat2Op>>
    where
        C::Value: ToPrimitive,
    {
        self.span(Stat2Op::new(), SpanWidth::Count(width), false)
    }

    /// Joins with `other` on equal keys.
    pub fn zip<R>(&self, other: &Series<R>) -> Series<ZipCursor<C, R>>
    where
        R: Cursor<Key = C::Key>,
    {
        Series::new(ZipCursor::new(self.cursor(), other.cursor()))
    }

    /// Joins with `other` and combines the two values with `selector`.
    pub fn zip_with<R, F, T>(
        &self,
        other: &Series<R>,
        selector: F,
    ) -> Series<MapCursor<ZipCursor<C, R>, ZipSelector<F>>>
    where
        R: Cursor<Key = C::Key>,
        F: Fn(&C::Value, &R::Value) -> T + Clone,
        T: Clone,
    {
        Series::new(MapCursor::new(
            ZipCursor::new(self.cursor(), other.cursor()),
            ZipSelector(selector),
        ))
    }

    /// Stream of pairs: existing ones first, then new ones as they arrive.
    ///
    /// The stream ends once every source is completed and drained.
    pub fn updates(&self) -> SeriesUpdates<C> {
        SeriesUpdates {
            cursor: self.scoped_cursor(),
            signal: Arc::new(UpdateSignal::default()),
            subscriptions: None,
            done: false,
        }
    }
}

impl<'a, C: Cursor> IntoIterator for &'a Series<C> {
    type Item = (C::Key, C::Value);
    type IntoIter = SeriesIter<C>;

    fn into_iter(self) -> SeriesIter<C> {
        self.iter()
    }
}

/// Iterator over a series; owns and finally disposes its cursor.
#[derive(Debug)]
pub struct SeriesIter<C: Cursor> {
    cursor: ScopedCursor<C>,
    forward: bool,
    done: bool,
}

impl<C: Cursor> SeriesIter<C> {
    fn new(cursor: ScopedCursor<C>, forward: bool) -> Self {
        Self {
            cursor,
            forward,
            done: false,
        }
    }
}

impl<C: Cursor> Iterator for SeriesIter<C> {
    type Item = (C::Key, C::Value);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let moved = if self.forward {
            self.cursor.move_next()
        } else {
            self.cursor.move_previous()
        };
        if !moved {
            self.done = true;
            self.cursor.dispose();
            return None;
        }
        Some(self.cursor.current())
    }
}

impl<C: Cursor> FusedIterator for SeriesIter<C> {}

/// Subscriber that wakes a stream task.
#[derive(Debug, Default)]
pub struct UpdateSignal {
    waker: AtomicWaker,
    pending: AtomicBool,
}

impl AsyncSubscriber for UpdateSignal {
    fn try_complete(&self, _is_final: bool) -> bool {
        self.pending.store(true, Ordering::Release);
        self.waker.wake();
        true
    }
}

/// Stream returned by [`Series::updates`].
#[derive(Debug)]
pub struct SeriesUpdates<C: Cursor> {
    cursor: ScopedCursor<C>,
    signal: Arc<UpdateSignal>,
    subscriptions: Option<SubscriptionSink>,
    done: bool,
}

impl<C: Cursor> SeriesUpdates<C> {
    fn finish(&mut self) {
        self.done = true;
        self.subscriptions = None;
        self.cursor.dispose();
    }
}

impl<C: Cursor + Unpin> Stream for SeriesUpdates<C> {
    type Item = (C::Key, C::Value);

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }
        loop {
            this.signal.pending.store(false, Ordering::Release);
            if this.cursor.move_next() {
                return Poll::Ready(Some(this.cursor.current()));
            }
            if this.cursor.is_completed() {
                // Writes published before completion are visible now.
                if this.cursor.move_next() {
                    return Poll::Ready(Some(this.cursor.current()));
                }
                this.finish();
                return Poll::Ready(None);
            }
            this.signal.waker.register(cx.waker());
            if this.subscriptions.is_none() {
                let subscriber: Arc<dyn AsyncSubscriber> = this.signal.clone();
                let mut sink = SubscriptionSink::new();
                this.cursor.subscribe(&subscriber, &mut sink);
                this.subscriptions = Some(sink);
                continue;
            }
            if this.signal.pending.swap(false, Ordering::AcqRel) {
                continue;
            }
            return Poll::Pending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SortedMap;
    use crate::cursor::CursorState;

    fn source() -> Series<crate::container::ContainerCursor<i64, i64>> {
        (1..=5).map(|k| (k, k * 10)).collect()
    }

    #[test]
    fn test_first_last_find() {
        let series = source();
        assert_eq!(series.first(), Some((1, 10)));
        assert_eq!(series.last(), Some((5, 50)));
        assert_eq!(series.try_find(&3, Lookup::Gt), Some((4, 40)));
        assert_eq!(series.try_get_value(&2), Some(20));
        assert_eq!(series.try_get_value(&9), None);
    }

    #[test]
    fn test_iter_both_directions() {
        let series = source();
        let keys: Vec<_> = series.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
        let keys: Vec<_> = series.iter_rev().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![5, 4, 3, 2, 1]);
        let total: i64 = (&series).into_iter().map(|(_, v)| v).sum();
        assert_eq!(total, 150);
    }

    #[test]
    fn test_iterator_disposes_cursor() {
        let series = source();
        let mut iter = series.iter();
        assert!(iter.next().is_some());
        for _ in iter.by_ref() {}
        assert_eq!(iter.cursor.state(), CursorState::None);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_subscriptions_end_on_drop() {
        let mut writer = SortedMap::<i64, i64>::writer();
        writer.append(1, 1).unwrap();
        let series = writer.series();
        let updates = series.updates();
        let subscriber: Arc<dyn AsyncSubscriber> = Arc::new(UpdateSignal::default());
        let mut sink = SubscriptionSink::new();
        updates.cursor.subscribe(&subscriber, &mut sink);
        assert_eq!(writer.map().subscriber_count(), 1);
        drop(sink);
        assert_eq!(writer.map().subscriber_count(), 0);
    }

    #[test]
    fn test_pipeline_composition() {
        let series = source();
        let doubled = series.map_values(|v| v * 2).filter_keys(|k| k % 2 == 1);
        let pairs: Vec<_> = doubled.iter().collect();
        assert_eq!(pairs, vec![(1, 20), (3, 60), (5, 100)]);

        let bounded = series.after(2).before(4);
        assert_eq!(bounded.iter().count(), 3);

        let summed = series.zip_with(&series.repeat(), |a, b| a + b);
        assert_eq!(summed.last(), Some((5, 100)));
    }
}
