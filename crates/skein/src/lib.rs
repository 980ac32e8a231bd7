//! Skein - Alopex Series Cursor Engine
//!
//! This crate provides a composable cursor algebra over ordered key-value
//! series, backed by mutable containers that many readers can observe while a
//! single writer appends.
//!
//! # Components
//!
//! - [`Cursor`]: the seekable, bidirectional navigation contract
//! - [`SortedMap`] / [`SeriesWriter`]: in-memory container and its only writer
//! - [`Series`]: read-only views and the operator pipeline
//! - [`ops`]: map, filter, fill, repeat, range, window, lag and zip
//! - [`online`]: rolling statistics over trailing windows
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_skein::{Lookup, SortedMap};
//!
//! let mut writer = SortedMap::<i64, f64>::writer();
//! let series = writer.series();
//!
//! for (k, v) in [(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0), (5, 5.0)] {
//!     writer.append(k, v)?;
//! }
//!
//! // Averages over three elements: (3, 2.0), (4, 3.0), (5, 4.0)
//! let sma: Vec<_> = series.sma(3).iter().collect();
//!
//! // Readers see appends as they are published
//! writer.append(6, 6.0)?;
//! assert_eq!(series.try_find(&5, Lookup::Gt), Some((6, 6.0)));
//! ```

#![deny(missing_docs)]

pub mod container;
pub mod cursor;
pub mod error;
pub mod fault;
pub mod online;
pub mod ops;
pub mod series;

pub use container::{
    AsyncSubscriber, ContainerConfig, KeyOrdering, SeriesWriter, SortedMap, Subscription,
};
pub use cursor::{Cursor, CursorState, Descending, KeyComparer, KeyOrder, Lookup, SeriesKey};
pub use error::{Result, SeriesError};
pub use fault::Fault;
pub use online::{OnlineOp, SpanWidth, Stat2};
pub use series::{Series, SeriesIter, SeriesUpdates};
