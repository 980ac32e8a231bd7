//! Operator cursors.
//!
//! Each operator wraps one or two inner cursors by value and implements
//! [`Cursor`](crate::cursor::Cursor) itself, so operators nest freely:
//! `Range<Filter<Map<ContainerCursor>>>` is one concrete type with static
//! dispatch on every move.

pub mod fill;
pub mod filter;
pub mod lag;
pub mod map;
pub mod range;
pub mod repeat;
pub mod zip;

pub use fill::FillCursor;
pub use filter::{ByKey, ByKeyValue, ByValue, FilterCursor, FilterPredicate};
pub use lag::{LagCursor, LagPair, LagProjection, LagStep, WindowCursor, WindowRange};
pub use map::{KeyValueSelector, MapCursor, Selector, ValueSelector, ZipSelector};
pub use range::RangeCursor;
pub use repeat::RepeatCursor;
pub use zip::{ZipCursor, ZipMode};
