//! Online rolling statistics.
//!
//! An [`OnlineOp`] keeps O(1) accumulator state that is updated as elements
//! enter and leave a trailing window. [`SpanCursor`] slides that window along
//! a series and feeds the boundary changes to the operator, so each move
//! costs O(1) amortized instead of O(width).
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_skein::online::{SpanWidth, Stat2Op};
//!
//! let sma = series.sma(20);
//! let stats = series.span(Stat2Op::default(), SpanWidth::Distance(60), true);
//! ```

pub mod span;
pub mod stat2;
pub mod sum;

pub use span::SpanCursor;
pub use stat2::{Stat2, Stat2Op};
pub use sum::{MovingSum, Sma};

/// An incrementally maintained aggregate over a sliding window.
///
/// The window moves by boundary events. Moving forward, `on_next` receives
/// the element that left the back of the window (if any) and the element
/// that entered at the front (if any). Moving backward, `on_previous`
/// receives the element that entered at the back and the element that left
/// the front.
pub trait OnlineOp<K, V>: Clone {
    /// Aggregate type.
    type Output: Clone;

    /// Aggregate over the current window.
    fn result(&self) -> Self::Output;

    /// Applies a forward window move.
    fn on_next(&mut self, old_previous: Option<(&K, &V)>, new_next: Option<(&K, &V)>);

    /// Applies a backward window move.
    ///
    /// Never called on a forward-only operator.
    fn on_previous(&mut self, new_previous: Option<(&K, &V)>, old_next: Option<(&K, &V)>);

    /// Empties the window.
    fn reset(&mut self);

    /// If true the window is rebuilt from scratch on backward moves.
    fn is_forward_only(&self) -> bool {
        false
    }
}

/// Extent of a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanWidth {
    /// A fixed number of elements.
    Count(usize),
    /// Every key `k` with `diff(current, k) < d`, in comparer key units.
    Distance(i64),
}
