//! SortedMap - in-memory series container.
//!
//! Keys and values live in two parallel vectors behind a
//! [`parking_lot::RwLock`]. Readers never park on that lock: every read runs
//! inside [`ContainerCore::read`] and uses `try_read`, so a read that overlaps a
//! write is retried exactly like a torn seqlock read would be. The lock only
//! exists to keep overlapping reads memory-safe for arbitrary key and value
//! types.
//!
//! # Single writer
//!
//! A container has exactly one [`SeriesWriter`], handed out at construction.
//! The writer is `Send` but neither `Sync` nor `Clone`, and every mutation
//! takes `&mut self`, so the single-writer assumption of the version protocol
//! holds by construction. Dropping the writer completes the container.

use crate::container::base::ContainerCore;
use crate::container::cursor::ContainerCursor;
use crate::container::subscription::{AsyncSubscriber, Subscription};
use crate::container::{ContainerConfig, KeyOrdering};
use crate::cursor::{KeyComparer, Lookup, SeriesKey};
use crate::error::{Result, SeriesError};
use crate::series::Series;
use parking_lot::RwLock;
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Parallel key and value vectors.
pub(crate) struct MapData<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K: SeriesKey, V: Clone> MapData<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn pair(&self, index: usize) -> (K, V) {
        (self.keys[index].clone(), self.values[index].clone())
    }

    pub(crate) fn value(&self, index: usize) -> V {
        self.values[index].clone()
    }

    /// Exact index of `key`, or where it would be inserted.
    ///
    /// For insertion-ordered data a miss reports the end of the data.
    pub(crate) fn position(
        &self,
        key: &K,
        comparer: &KeyComparer<K>,
        ordering: KeyOrdering,
    ) -> std::result::Result<usize, usize> {
        match ordering {
            KeyOrdering::Sorted => self
                .keys
                .binary_search_by(|trial| comparer.compare(trial, key)),
            KeyOrdering::Indexed => self
                .keys
                .iter()
                .position(|trial| comparer.compare(trial, key) == Ordering::Equal)
                .ok_or(self.keys.len()),
        }
    }

    /// Re-finds `key` starting from a cached index.
    ///
    /// `Ok(i)` is the exact index, `Err(i)` where the key would be inserted.
    pub(crate) fn anchor(
        &self,
        key: &K,
        cached: usize,
        comparer: &KeyComparer<K>,
        ordering: KeyOrdering,
    ) -> std::result::Result<usize, usize> {
        match self.keys.get(cached) {
            Some(trial) if comparer.compare(trial, key) == Ordering::Equal => Ok(cached),
            _ => self.position(key, comparer, ordering),
        }
    }

    /// Index selected by `key` and `direction`.
    pub(crate) fn locate(
        &self,
        key: &K,
        direction: Lookup,
        comparer: &KeyComparer<K>,
        ordering: KeyOrdering,
    ) -> Option<usize> {
        let position = self.position(key, comparer, ordering);
        match ordering {
            KeyOrdering::Sorted => direction.resolve(position, self.len()),
            KeyOrdering::Indexed if direction == Lookup::Eq => position.ok(),
            KeyOrdering::Indexed => None,
        }
    }
}

/// Mutable, concurrently readable ordered map.
pub struct SortedMap<K, V> {
    core: Arc<ContainerCore>,
    data: RwLock<MapData<K, V>>,
    comparer: KeyComparer<K>,
    ordering: KeyOrdering,
}

impl<K, V> fmt::Debug for SortedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedMap")
            .field("comparer", &self.comparer)
            .field("ordering", &self.ordering)
            .field("version", &self.core.version())
            .field("completed", &self.core.is_completed())
            .finish()
    }
}

impl<K, V> SortedMap<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty map with the natural key order and returns its writer.
    pub fn writer() -> SeriesWriter<K, V> {
        Self::writer_with(KeyComparer::natural(), ContainerConfig::default())
    }

    /// Creates an empty map and returns its writer.
    pub fn writer_with(comparer: KeyComparer<K>, config: ContainerConfig) -> SeriesWriter<K, V> {
        let map = Arc::new(Self {
            core: Arc::new(ContainerCore::new(&config)),
            data: RwLock::new(MapData::with_capacity(config.initial_capacity)),
            comparer,
            ordering: config.ordering,
        });
        SeriesWriter {
            map,
            _not_sync: PhantomData,
        }
    }

    /// Runs `body` against a consistent snapshot of the data.
    ///
    /// `body` also receives the published version current at the time of the
    /// read, so cursors can tell whether a cached position is still valid.
    pub(crate) fn read<R>(&self, mut body: impl FnMut(&MapData<K, V>, u64) -> R) -> (R, u64) {
        self.core.read(|| {
            let data = self.data.try_read()?;
            Some(body(&data, self.core.version()))
        })
    }

    pub(crate) fn core(&self) -> &ContainerCore {
        &self.core
    }

    /// Key order of the map.
    pub fn comparer(&self) -> &KeyComparer<K> {
        &self.comparer
    }

    /// Key ordering mode.
    pub fn ordering(&self) -> KeyOrdering {
        self.ordering
    }

    /// Last published version.
    pub fn version(&self) -> u64 {
        self.core.version()
    }

    /// Version of the write in flight, or `version()` when idle.
    pub fn next_version(&self) -> u64 {
        self.core.next_version()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.core.subscriber_count()
    }

    /// Returns true once the writer completed the map.
    pub fn is_completed(&self) -> bool {
        self.core.is_completed()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read(|data, _| data.len()).0
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First entry.
    pub fn first(&self) -> Option<(K, V)> {
        self.read(|data, _| (data.len() > 0).then(|| data.pair(0))).0
    }

    /// Last entry.
    pub fn last(&self) -> Option<(K, V)> {
        self.read(|data, _| data.len().checked_sub(1).map(|i| data.pair(i)))
            .0
    }

    /// Value stored at exactly `key`.
    pub fn try_get_value(&self, key: &K) -> Option<V> {
        self.read(|data, _| {
            data.locate(key, Lookup::Eq, &self.comparer, self.ordering)
                .map(|i| data.value(i))
        })
        .0
    }

    /// Entry selected by `key` and `direction`.
    pub fn try_find(&self, key: &K, direction: Lookup) -> Option<(K, V)> {
        self.read(|data, _| {
            data.locate(key, direction, &self.comparer, self.ordering)
                .map(|i| data.pair(i))
        })
        .0
    }

    /// Registers `subscriber` for update notifications.
    pub fn subscribe(&self, subscriber: Arc<dyn AsyncSubscriber>) -> Subscription {
        self.core.subscribe(subscriber)
    }

    /// A new cursor over the map, in the `Initialized` state.
    pub fn cursor(self: &Arc<Self>) -> ContainerCursor<K, V> {
        ContainerCursor::new(Arc::clone(self))
    }

    /// A read-only series view over the map.
    pub fn series(self: &Arc<Self>) -> Series<ContainerCursor<K, V>> {
        Series::new(self.cursor())
    }
}

/// The only handle allowed to mutate a [`SortedMap`].
///
/// Completes the map when dropped.
pub struct SeriesWriter<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    map: Arc<SortedMap<K, V>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<K, V> fmt::Debug for SeriesWriter<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SeriesWriter").field(&self.map).finish()
    }
}

impl<K, V> SeriesWriter<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    /// The map this writer mutates.
    pub fn map(&self) -> &Arc<SortedMap<K, V>> {
        &self.map
    }

    /// A read-only series view over the map.
    pub fn series(&self) -> Series<ContainerCursor<K, V>> {
        self.map.series()
    }

    /// A new cursor over the map.
    pub fn cursor(&self) -> ContainerCursor<K, V> {
        self.map.cursor()
    }

    /// Runs one write transaction.
    ///
    /// `apply` returns its result and whether it changed the data; unchanged
    /// writes and errors roll the version back.
    fn write<R>(
        &mut self,
        apply: impl FnOnce(&mut MapData<K, V>, &KeyComparer<K>, KeyOrdering) -> Result<(R, bool)>,
    ) -> Result<R> {
        if self.map.is_completed() {
            return Err(SeriesError::Completed);
        }
        let map = &*self.map;
        let mut txn = map.core.before_write();
        let mut data = map.data.write();
        let (result, changed) = apply(&mut data, &map.comparer, map.ordering)?;
        // Publish under the payload lock so no reader pairs new data with the
        // old version; subscribers run once readers can get in again.
        txn.publish(changed);
        drop(data);
        drop(txn);
        Ok(result)
    }

    /// Inserts or replaces the value at `key`; returns the replaced value.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.write(|data, comparer, ordering| {
            match data.position(&key, comparer, ordering) {
                Ok(i) => Ok((Some(std::mem::replace(&mut data.values[i], value)), true)),
                Err(i) => {
                    data.keys.insert(i, key);
                    data.values.insert(i, value);
                    Ok((None, true))
                }
            }
        })
    }

    /// Inserts `value` at `key` only if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::DuplicateKey`] if the key exists.
    pub fn try_add(&mut self, key: K, value: V) -> Result<()> {
        self.write(|data, comparer, ordering| {
            match data.position(&key, comparer, ordering) {
                Ok(_) => Err(SeriesError::duplicate(&key)),
                Err(i) => {
                    data.keys.insert(i, key);
                    data.values.insert(i, value);
                    Ok(((), true))
                }
            }
        })
    }

    /// Appends `value` at `key`, which must sort after the last key.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::OutOfOrderAppend`] if the key does not sort
    /// after the last key, or [`SeriesError::DuplicateKey`] if an
    /// insertion-ordered map already holds it.
    pub fn append(&mut self, key: K, value: V) -> Result<()> {
        self.write(|data, comparer, ordering| {
            match ordering {
                KeyOrdering::Sorted => {
                    if let Some(last) = data.keys.last() {
                        if comparer.compare(&key, last) != Ordering::Greater {
                            return Err(SeriesError::out_of_order(&key, last));
                        }
                    }
                }
                KeyOrdering::Indexed => {
                    if data.position(&key, comparer, ordering).is_ok() {
                        return Err(SeriesError::duplicate(&key));
                    }
                }
            }
            data.keys.push(key);
            data.values.push(value);
            Ok(((), true))
        })
    }

    /// Removes the entry at `key`; returns its value.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        self.write(|data, comparer, ordering| {
            match data.position(key, comparer, ordering) {
                Ok(i) => {
                    data.keys.remove(i);
                    Ok((Some(data.values.remove(i)), true))
                }
                Err(_) => Ok((None, false)),
            }
        })
    }

    /// Removes every entry selected by `key` and `direction`: `Eq` removes
    /// one entry, `Ge`/`Gt` everything from the selected key to the end, and
    /// `Le`/`Lt` everything from the start up to the selected key.
    ///
    /// Returns the number of removed entries.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::IndexedMutation`] on an insertion-ordered map.
    pub fn remove_many(&mut self, key: &K, direction: Lookup) -> Result<usize> {
        let removed = self.write(|data, comparer, ordering| {
            if ordering == KeyOrdering::Indexed {
                return Err(SeriesError::IndexedMutation("remove_many"));
            }
            let Some(index) = data.locate(key, direction, comparer, ordering) else {
                return Ok((0, false));
            };
            let removed = match direction {
                Lookup::Eq => {
                    data.keys.remove(index);
                    data.values.remove(index);
                    1
                }
                Lookup::Ge | Lookup::Gt => {
                    let count = data.len() - index;
                    data.keys.truncate(index);
                    data.values.truncate(index);
                    count
                }
                Lookup::Le | Lookup::Lt => {
                    data.keys.drain(..=index);
                    data.values.drain(..=index);
                    index + 1
                }
            };
            Ok((removed, true))
        })?;
        debug!(removed, ?direction, "removed entries");
        Ok(removed)
    }

    /// Completes the map: no further writes, final notification sent.
    pub fn complete(self) {
        drop(self);
    }
}

impl<K, V> Drop for SeriesWriter<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.map.core.complete();
    }
}

impl<K, V> FromIterator<(K, V)> for Series<ContainerCursor<K, V>>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    /// Builds a completed map from unordered pairs; later duplicates win.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut writer = SortedMap::writer();
        for (key, value) in iter {
            // A fresh, uncompleted sorted map accepts every set.
            let _ = writer.set(key, value);
        }
        let series = writer.series();
        writer.complete();
        series
    }
}
