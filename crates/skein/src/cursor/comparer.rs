//! Key ordering.
//!
//! Every cursor exposes the [`KeyComparer`] its keys are ordered by. Binary
//! operators such as zip need both inputs to agree on order, and that is
//! checked by comparer identity rather than by equal behaviour: two custom
//! comparers built separately are never the same instance, while every
//! natural comparer for a key type is.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Identity of the natural ordering.
const NATURAL_ID: u64 = 0;

/// Source of identities for custom comparers.
static NEXT_COMPARER_ID: AtomicU64 = AtomicU64::new(NATURAL_ID + 1);

/// A key usable in a series.
///
/// Keys are totally ordered through [`Ord`]. Types laid out on a regular grid
/// (integers) also provide key arithmetic, which distance-based windows need.
pub trait SeriesKey: Ord + Clone + fmt::Debug + Send + Sync + 'static {
    /// Whether [`SeriesKey::key_diff`] and [`SeriesKey::key_add`] are implemented.
    const DIFFABLE: bool = false;

    /// Distance from `other` to `self` in key units, if defined.
    fn key_diff(&self, _other: &Self) -> Option<i64> {
        None
    }

    /// `self` shifted by `delta` key units, if defined and in range.
    fn key_add(&self, _delta: i64) -> Option<Self> {
        None
    }
}

macro_rules! diffable_key {
    ($($t:ty),*) => {
        $(
            impl SeriesKey for $t {
                const DIFFABLE: bool = true;

                fn key_diff(&self, other: &Self) -> Option<i64> {
                    let diff = (*self as i128) - (*other as i128);
                    i64::try_from(diff).ok()
                }

                fn key_add(&self, delta: i64) -> Option<Self> {
                    let sum = (*self as i128) + (delta as i128);
                    <$t>::try_from(sum).ok()
                }
            }
        )*
    };
}

diffable_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl SeriesKey for String {}
impl SeriesKey for &'static str {}
impl SeriesKey for char {}
impl SeriesKey for bool {}

/// A custom total order over keys.
pub trait KeyOrder<K>: Send + Sync + 'static {
    /// Compares two keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// Whether this order provides key arithmetic.
    fn is_diffable(&self) -> bool {
        false
    }

    /// Distance from `b` to `a` in key units.
    fn diff(&self, _a: &K, _b: &K) -> Option<i64> {
        None
    }

    /// `key` shifted by `delta` key units.
    fn add(&self, _key: &K, _delta: i64) -> Option<K> {
        None
    }
}

enum Repr<K> {
    Natural,
    Custom(Arc<dyn KeyOrder<K>>),
}

impl<K> Clone for Repr<K> {
    fn clone(&self) -> Self {
        match self {
            Repr::Natural => Repr::Natural,
            Repr::Custom(order) => Repr::Custom(Arc::clone(order)),
        }
    }
}

/// Total order over keys, shared by every cursor over one logical key domain.
///
/// The natural comparer compares with [`Ord`] and is statically dispatched; a
/// custom comparer goes through one virtual call.
pub struct KeyComparer<K> {
    id: u64,
    repr: Repr<K>,
}

impl<K> Clone for KeyComparer<K> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            repr: self.repr.clone(),
        }
    }
}

impl<K> fmt::Debug for KeyComparer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.repr {
            Repr::Natural => "natural",
            Repr::Custom(_) => "custom",
        };
        f.debug_struct("KeyComparer")
            .field("id", &self.id)
            .field("kind", &kind)
            .finish()
    }
}

impl<K: SeriesKey> Default for KeyComparer<K> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<K: SeriesKey> KeyComparer<K> {
    /// The natural ordering of `K`.
    pub fn natural() -> Self {
        Self {
            id: NATURAL_ID,
            repr: Repr::Natural,
        }
    }

    /// A new comparer instance backed by `order`.
    ///
    /// Each call yields a distinct identity, even for the same `order` type.
    pub fn custom(order: impl KeyOrder<K>) -> Self {
        Self {
            id: NEXT_COMPARER_ID.fetch_add(1, AtomicOrdering::Relaxed),
            repr: Repr::Custom(Arc::new(order)),
        }
    }

    /// Compares two keys.
    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        match &self.repr {
            Repr::Natural => a.cmp(b),
            Repr::Custom(order) => order.compare(a, b),
        }
    }

    /// Returns true if both comparers are the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Whether [`diff`](Self::diff) and [`add`](Self::add) are supported.
    pub fn is_diffable(&self) -> bool {
        match &self.repr {
            Repr::Natural => K::DIFFABLE,
            Repr::Custom(order) => order.is_diffable(),
        }
    }

    /// Distance from `b` to `a` in key units.
    pub fn diff(&self, a: &K, b: &K) -> Option<i64> {
        match &self.repr {
            Repr::Natural => a.key_diff(b),
            Repr::Custom(order) => order.diff(a, b),
        }
    }

    /// `key` shifted by `delta` key units.
    pub fn add(&self, key: &K, delta: i64) -> Option<K> {
        match &self.repr {
            Repr::Natural => key.key_add(delta),
            Repr::Custom(order) => order.add(key, delta),
        }
    }
}

/// Reverse of the natural key order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Descending;

impl<K: SeriesKey> KeyOrder<K> for Descending {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }

    fn is_diffable(&self) -> bool {
        K::DIFFABLE
    }

    fn diff(&self, a: &K, b: &K) -> Option<i64> {
        b.key_diff(a)
    }

    fn add(&self, key: &K, delta: i64) -> Option<K> {
        key.key_add(delta.checked_neg()?)
    }
}
