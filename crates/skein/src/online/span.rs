//! Span - a trailing window driven by an online operator.
//!
//! Two cursors delimit the window: `right` is the outer position, `left` the
//! oldest element still inside. Forward moves are applied to the operator as
//! boundary events. Backward moves are too, unless the operator is forward
//! only, in which case the window is rebuilt at the new position. A move that
//! would publish an incomplete window while incomplete windows are disabled
//! is rolled back as a whole.

use crate::container::subscription::AsyncSubscriber;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SubscriptionSink};
use crate::fault::{self, Fault};
use crate::online::{OnlineOp, SpanWidth};
use std::sync::Arc;

/// Cursor yielding an online aggregate over the trailing window at each key.
#[derive(Debug, Clone)]
pub struct SpanCursor<C: Cursor, Op> {
    right: C,
    left: C,
    op: Op,
    width: SpanWidth,
    allow_incomplete: bool,
    count: usize,
    origin: Option<C::Key>,
    state: CursorState,
}

impl<C, Op> SpanCursor<C, Op>
where
    C: Cursor,
    Op: OnlineOp<C::Key, C::Value>,
{
    /// Windows of `width` over `inner`, aggregated by `op`.
    ///
    /// With `allow_incomplete` the windows at the start of the series that
    /// are shorter than `width` are yielded too.
    ///
    /// # Panics
    ///
    /// Panics if the width is zero. Faults if `width` is a distance and the
    /// comparer has no key arithmetic.
    pub fn new(inner: C, op: Op, width: SpanWidth, allow_incomplete: bool) -> Self {
        match width {
            SpanWidth::Count(n) => assert!(n >= 1, "span width must be at least 1"),
            SpanWidth::Distance(d) => {
                assert!(d >= 1, "span width must be at least 1");
                if !inner.comparer().is_diffable() {
                    fault::raise(Fault::NotDiffable("span"));
                }
            }
        }
        let mut op = op;
        op.reset();
        Self {
            left: inner.clone(),
            right: inner,
            op,
            width,
            allow_incomplete,
            count: 0,
            origin: None,
            state: CursorState::Initialized,
        }
    }

    /// Number of elements in the current window.
    pub fn window_len(&self) -> usize {
        self.count
    }

    /// Returns true if `key` still belongs to the window ending at `right`.
    fn fits(&self, key: &C::Key) -> bool {
        match self.width {
            SpanWidth::Count(_) => true,
            SpanWidth::Distance(d) => self
                .right
                .comparer()
                .diff(self.right.current_key(), key)
                .is_some_and(|distance| distance < d),
        }
    }

    fn is_full(&self) -> bool {
        match self.width {
            SpanWidth::Count(n) => self.count >= n,
            SpanWidth::Distance(d) => self.origin.as_ref().is_some_and(|origin| {
                self.right
                    .comparer()
                    .diff(self.right.current_key(), origin)
                    .is_some_and(|distance| distance >= d - 1)
            }),
        }
    }

    fn acceptable(&self) -> bool {
        self.allow_incomplete || self.is_full()
    }

    /// Moves `left` forward one element; it never passes `right`.
    fn advance_left(&mut self) {
        if !self.left.move_next() {
            fault::raise(Fault::OutOfOrder("span"));
        }
    }

    /// Rebuilds the window and operator state around a positioned `right`.
    fn rebuild(&mut self) {
        self.left = self.right.clone();
        self.count = 1;
        match self.width {
            SpanWidth::Count(n) => {
                while self.count < n && self.left.move_previous() {
                    self.count += 1;
                }
            }
            SpanWidth::Distance(_) => {
                while self.left.move_previous() {
                    if !self.fits(self.left.current_key()) {
                        self.advance_left();
                        break;
                    }
                    self.count += 1;
                }
            }
        }

        self.op.reset();
        let mut walker = self.left.clone();
        for i in 0..self.count {
            if i > 0 && !walker.move_next() {
                fault::raise(Fault::OutOfOrder("span"));
            }
            let (key, value) = walker.current();
            self.op.on_next(None, Some((&key, &value)));
        }

        if matches!(self.width, SpanWidth::Distance(_)) {
            let mut first = self.right.initialize();
            self.origin = first.move_first().then(|| first.current_key().clone());
            first.dispose();
        }
        self.state = CursorState::Moving;
    }

    fn step_forward(&mut self) -> bool {
        if !self.right.move_next() {
            return false;
        }
        let (key, value) = self.right.current();
        match self.width {
            SpanWidth::Count(n) if self.count >= n => {
                let (old_key, old_value) = self.left.current();
                self.advance_left();
                self.op
                    .on_next(Some((&old_key, &old_value)), Some((&key, &value)));
            }
            SpanWidth::Count(_) => {
                self.count += 1;
                self.op.on_next(None, Some((&key, &value)));
            }
            SpanWidth::Distance(_) => {
                self.count += 1;
                self.op.on_next(None, Some((&key, &value)));
                while !self.fits(self.left.current_key()) {
                    let (old_key, old_value) = self.left.current();
                    self.advance_left();
                    self.count -= 1;
                    self.op.on_next(Some((&old_key, &old_value)), None);
                }
            }
        }
        true
    }

    fn step_backward(&mut self) -> bool {
        let (old_key, old_value) = self.right.current();
        if !self.right.move_previous() {
            return false;
        }
        match self.width {
            SpanWidth::Count(_) => {
                if self.left.move_previous() {
                    let (key, value) = self.left.current();
                    self.op
                        .on_previous(Some((&key, &value)), Some((&old_key, &old_value)));
                } else {
                    self.count -= 1;
                    self.op.on_previous(None, Some((&old_key, &old_value)));
                }
            }
            SpanWidth::Distance(_) => {
                self.count -= 1;
                self.op.on_previous(None, Some((&old_key, &old_value)));
                while self.left.move_previous() {
                    if !self.fits(self.left.current_key()) {
                        self.advance_left();
                        break;
                    }
                    self.count += 1;
                    let (key, value) = self.left.current();
                    self.op.on_previous(Some((&key, &value)), None);
                }
            }
        }
        true
    }

    /// Steps forward until the window is acceptable.
    fn fill_forward(&mut self) -> bool {
        while !self.acceptable() {
            if !self.step_forward() {
                return false;
            }
        }
        true
    }
}

impl<C, Op> Cursor for SpanCursor<C, Op>
where
    C: Cursor,
    Op: OnlineOp<C::Key, C::Value>,
{
    type Key = C::Key;
    type Value = Op::Output;

    fn state(&self) -> CursorState {
        self.state
    }

    fn comparer(&self) -> &KeyComparer<C::Key> {
        self.right.comparer()
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn is_indexed(&self) -> bool {
        self.right.is_indexed()
    }

    fn is_completed(&self) -> bool {
        self.right.is_completed()
    }

    fn move_first(&mut self) -> bool {
        self.state.ensure_initialized("move_first");
        let backup = self.clone();
        if self.right.move_first() {
            self.rebuild();
            if self.fill_forward() {
                return true;
            }
        }
        *self = backup;
        false
    }

    fn move_last(&mut self) -> bool {
        self.state.ensure_initialized("move_last");
        let backup = self.clone();
        if self.right.move_last() {
            self.rebuild();
            if self.acceptable() {
                return true;
            }
        }
        *self = backup;
        false
    }

    fn move_next(&mut self) -> bool {
        self.state.ensure_initialized("move_next");
        if !self.state.is_moving() {
            return self.move_first();
        }
        self.step_forward()
    }

    fn move_previous(&mut self) -> bool {
        self.state.ensure_initialized("move_previous");
        if !self.state.is_moving() {
            return self.move_last();
        }
        let backup = self.clone();
        let moved = if self.op.is_forward_only() {
            let moved = self.right.move_previous();
            if moved {
                self.rebuild();
            }
            moved
        } else {
            self.step_backward()
        };
        if moved && self.acceptable() {
            return true;
        }
        *self = backup;
        false
    }

    fn move_at(&mut self, key: &C::Key, direction: Lookup) -> bool {
        self.state.ensure_initialized("move_at");
        let backup = self.clone();
        if self.right.move_at(key, direction) {
            self.rebuild();
            let landed = if direction.is_forward() {
                self.fill_forward()
            } else {
                self.acceptable()
            };
            if landed {
                return true;
            }
        }
        *self = backup;
        false
    }

    fn current_key(&self) -> &C::Key {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_key"));
        }
        self.right.current_key()
    }

    fn current_value(&self) -> Op::Output {
        if !self.state.is_moving() {
            fault::raise(Fault::NotPositioned("current_value"));
        }
        self.op.result()
    }

    fn try_get_value(&mut self, key: &C::Key) -> Option<Op::Output> {
        let mut trial = self.initialize();
        let found = trial
            .move_at(key, Lookup::Eq)
            .then(|| trial.current_value());
        trial.dispose();
        found
    }

    fn initialize(&self) -> Self {
        Self::new(
            self.right.initialize(),
            self.op.clone(),
            self.width,
            self.allow_incomplete,
        )
    }

    fn reset(&mut self) {
        self.right.reset();
        self.left.reset();
        self.op.reset();
        self.count = 0;
        self.state = CursorState::Initialized;
    }

    fn dispose(&mut self) {
        self.right.dispose();
        self.left.dispose();
        self.state = CursorState::None;
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        self.right.subscribe(subscriber, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::online::{MovingSum, Sma, Stat2Op};
    use crate::ops::test_util::{backward, forward, tens};

    /// Sum that must never see a backward event.
    #[derive(Debug, Clone, Default)]
    struct ForwardSum {
        sum: i64,
    }

    impl OnlineOp<i64, i64> for ForwardSum {
        type Output = i64;

        fn result(&self) -> i64 {
            self.sum
        }

        fn on_next(&mut self, old: Option<(&i64, &i64)>, new: Option<(&i64, &i64)>) {
            self.sum += new.map_or(0, |(_, v)| *v) - old.map_or(0, |(_, v)| *v);
        }

        fn on_previous(&mut self, _: Option<(&i64, &i64)>, _: Option<(&i64, &i64)>) {
            panic!("backward event on a forward-only operator");
        }

        fn reset(&mut self) {
            self.sum = 0;
        }

        fn is_forward_only(&self) -> bool {
            true
        }
    }

    fn values<C: Cursor>(mut cursor: C) -> Vec<(C::Key, C::Value)> {
        let mut out = Vec::new();
        while cursor.move_next() {
            out.push(cursor.current());
        }
        out
    }

    #[test]
    fn test_sma_complete_windows_only() {
        let source = tens(&[1, 2, 3, 4, 5]);
        let cursor = SpanCursor::new(source.cursor(), Sma::new(), SpanWidth::Count(3), false);
        assert_eq!(
            values(cursor),
            vec![(3, 20.0), (4, 30.0), (5, 40.0)]
        );
    }

    #[test]
    fn test_incomplete_windows_allowed() {
        let source = tens(&[1, 2, 3]);
        let cursor = SpanCursor::new(source.cursor(), MovingSum::new(), SpanWidth::Count(2), true);
        assert_eq!(values(cursor), vec![(1, 10), (2, 30), (3, 50)]);
    }

    #[test]
    fn test_backward_matches_forward() {
        let source = tens(&[1, 2, 3, 4, 5, 6]);
        let cursor = SpanCursor::new(source.cursor(), MovingSum::new(), SpanWidth::Count(3), false);
        let mut forward_values = values(cursor.clone());
        forward_values.reverse();

        let mut cursor = cursor;
        let mut backward_values = Vec::new();
        while cursor.move_previous() {
            backward_values.push(cursor.current());
        }
        assert_eq!(backward_values, forward_values);
        // The incomplete window before key 3 was rejected in place.
        assert_eq!(*cursor.current_key(), 3);
        assert_eq!(cursor.current_value(), 60);
    }

    #[test]
    fn test_distance_width() {
        let source = tens(&[1, 2, 4, 7, 8]);
        let cursor = SpanCursor::new(source.cursor(), MovingSum::new(), SpanWidth::Distance(3), false);
        // Windows cover (k - 3, k].
        assert_eq!(values(cursor.clone()), vec![(4, 60), (7, 70), (8, 150)]);
        assert_eq!(backward(cursor), vec![8, 7, 4]);
    }

    #[test]
    fn test_forward_only_rebuilds_backward() {
        let source = tens(&[1, 2, 3, 4]);
        let mut cursor = SpanCursor::new(source.cursor(), ForwardSum::default(), SpanWidth::Count(2), false);
        assert!(cursor.move_last());
        assert_eq!(cursor.current_value(), 70);
        assert!(cursor.move_previous());
        assert_eq!(cursor.current_value(), 50);
        assert!(cursor.move_previous());
        assert_eq!(cursor.current_value(), 30);
        assert!(!cursor.move_previous());
        assert_eq!(*cursor.current_key(), 2);
    }

    #[test]
    fn test_move_at_and_lookup() {
        let source = tens(&[1, 2, 3, 4, 5]);
        let mut cursor = SpanCursor::new(source.cursor(), Stat2Op::new(), SpanWidth::Count(3), false);
        assert!(cursor.move_at(&1, Lookup::Ge));
        assert_eq!(*cursor.current_key(), 3);
        assert!(!cursor.move_at(&2, Lookup::Le));
        assert_eq!(*cursor.current_key(), 3);
        let stats = cursor.try_get_value(&5).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 40.0);
        assert_eq!(cursor.try_get_value(&2), None);
        assert_eq!(forward(cursor.initialize()), vec![3, 4, 5]);
    }

    #[test]
    #[should_panic(expected = "comparer does not support key arithmetic")]
    fn test_distance_needs_key_arithmetic() {
        let source: crate::series::Series<_> =
            vec![("a".to_string(), 1i64)].into_iter().collect();
        let _ = SpanCursor::new(source.cursor(), MovingSum::new(), SpanWidth::Distance(2), false);
    }
}
