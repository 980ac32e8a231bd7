//! Mutable, concurrently readable containers.
//!
//! A container owns its data and a [`ContainerCore`]: the version pair, the
//! single-writer spinlock and the subscriber registry. Writers publish through
//! the version protocol; cursors read optimistically and never block the writer.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_skein::container::SortedMap;
//!
//! let mut writer = SortedMap::<i64, f64>::writer();
//! let series = writer.series();
//!
//! writer.append(1, 10.0)?;
//! writer.append(2, 20.0)?;
//! assert_eq!(series.last(), Some((2, 20.0)));
//!
//! // Completing (or dropping) the writer closes the container for good.
//! writer.complete();
//! ```

pub mod base;
pub mod cursor;
pub mod sorted_map;
pub mod subscription;

pub use base::{ContainerCore, LockGuard, WriteTxn};
pub use cursor::ContainerCursor;
pub use sorted_map::{SeriesWriter, SortedMap};
pub use subscription::{AsyncSubscriber, Subscription};

use std::time::Duration;

/// Default number of pre-allocated entries.
pub const DEFAULT_INITIAL_CAPACITY: usize = 0;

/// Default number of busy spins before a contended lock or read starts yielding.
pub const DEFAULT_SPIN_BUDGET: u32 = 1 << 10;

/// Default sanity timeout for lock acquisition and read retries (500 ms).
///
/// Locks are held for sub-microsecond durations; waiting this long means the
/// container is broken, not busy.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// How a container orders its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOrdering {
    /// Keys kept sorted by the comparer; lookups use binary search.
    #[default]
    Sorted,
    /// Keys kept in insertion order; only exact lookups are supported.
    Indexed,
}

/// Configuration for a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Number of entries to pre-allocate.
    ///
    /// Default: 0.
    pub initial_capacity: usize,

    /// Busy spins before yielding while waiting on the lock or a writer.
    ///
    /// Default: 1024.
    pub spin_budget: u32,

    /// Time after which a wait on the lock or a writer is a fatal fault.
    ///
    /// Default: 500 ms.
    pub lock_timeout: Duration,

    /// Key ordering of the container.
    ///
    /// Default: [`KeyOrdering::Sorted`].
    pub ordering: KeyOrdering,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            spin_budget: DEFAULT_SPIN_BUDGET,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            ordering: KeyOrdering::default(),
        }
    }
}

impl ContainerConfig {
    /// Sets the number of pre-allocated entries.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the spin budget.
    pub fn with_spin_budget(mut self, spins: u32) -> Self {
        self.spin_budget = spins;
        self
    }

    /// Sets the lock sanity timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the key ordering.
    pub fn with_ordering(mut self, ordering: KeyOrdering) -> Self {
        self.ordering = ordering;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert_eq!(config.spin_budget, DEFAULT_SPIN_BUDGET);
        assert_eq!(config.lock_timeout, DEFAULT_LOCK_TIMEOUT);
        assert_eq!(config.ordering, KeyOrdering::Sorted);
    }

    #[test]
    fn test_config_builders() {
        let config = ContainerConfig::default()
            .with_initial_capacity(16)
            .with_spin_budget(8)
            .with_lock_timeout(Duration::from_secs(2))
            .with_ordering(KeyOrdering::Indexed);
        assert_eq!(config.initial_capacity, 16);
        assert_eq!(config.spin_budget, 8);
        assert_eq!(config.lock_timeout, Duration::from_secs(2));
        assert_eq!(config.ordering, KeyOrdering::Indexed);
    }
}
