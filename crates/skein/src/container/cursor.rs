//! Base cursor over a [`SortedMap`].
//!
//! The cursor caches the index of its current entry together with the
//! container version it was read at. While the version is unchanged the index
//! is trusted as is; after a write the entry is re-found by key before the
//! cursor steps. Every step is computed inside one consistent read and only
//! then landed, so a move either completes against a single snapshot or leaves
//! the cursor where it was.

use crate::container::sorted_map::{MapData, SortedMap};
use crate::container::subscription::AsyncSubscriber;
use crate::container::KeyOrdering;
use crate::cursor::{Cursor, CursorState, KeyComparer, Lookup, SeriesKey, SubscriptionSink};
use crate::fault::{self, Fault};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Cursor over the entries of a [`SortedMap`].
#[derive(Clone)]
pub struct ContainerCursor<K, V> {
    source: Arc<SortedMap<K, V>>,
    state: CursorState,
    index: usize,
    version: u64,
    current: Option<(K, V)>,
}

impl<K: fmt::Debug, V> fmt::Debug for ContainerCursor<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerCursor")
            .field("state", &self.state)
            .field("index", &self.index)
            .field("version", &self.version)
            .field("key", &self.current.as_ref().map(|(k, _)| k))
            .finish()
    }
}

impl<K, V> ContainerCursor<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unpositioned cursor over `source`.
    pub fn new(source: Arc<SortedMap<K, V>>) -> Self {
        Self {
            source,
            state: CursorState::Initialized,
            index: 0,
            version: 0,
            current: None,
        }
    }

    /// The container this cursor reads.
    pub fn source(&self) -> &Arc<SortedMap<K, V>> {
        &self.source
    }

    /// Index of the current entry in `data`, or its insertion point if the
    /// entry was removed since the cursor landed on it.
    fn locate_current(&self, data: &MapData<K, V>, version: u64) -> Result<usize, usize> {
        let Some((key, _)) = &self.current else {
            fault::raise(Fault::NotPositioned("container cursor"));
        };
        if version == self.version {
            return Ok(self.index);
        }
        let ordering = self.source.ordering();
        match data.anchor(key, self.index, self.source.comparer(), ordering) {
            Err(_) if ordering == KeyOrdering::Indexed => {
                // Insertion order has no neighbour for a vanished key.
                fault::raise(Fault::OutOfOrder("container cursor"))
            }
            found => found,
        }
    }

    fn land(&mut self, found: Option<(usize, (K, V))>, version: u64, state: CursorState) -> bool {
        match found {
            Some((index, pair)) => {
                if self.state.is_moving() && version != self.version {
                    debug!(from = self.version, to = version, index, "cursor relocated");
                }
                self.index = index;
                self.version = version;
                self.current = Some(pair);
                self.state = state;
                true
            }
            None => false,
        }
    }

    fn move_to(&mut self, select: impl Fn(&Self, &MapData<K, V>, u64) -> Option<usize>) -> bool {
        let (found, version) = self.source.read(|data, version| {
            select(self, data, version)
                .filter(|&i| i < data.len())
                .map(|i| (i, data.pair(i)))
        });
        self.land(found, version, CursorState::Moving)
    }

    /// Moves forward over up to `max` entries in one consistent read.
    ///
    /// Returns the entries passed, ending with the new current entry, and
    /// leaves the cursor in the `BatchMoving` state. Returns `None` without
    /// moving if there is nothing ahead.
    pub fn move_next_batch(&mut self, max: usize) -> Option<Vec<(K, V)>> {
        self.state.ensure_initialized("move_next_batch");
        if max == 0 {
            return None;
        }
        let moving = self.state.is_moving();
        let (batch, version) = self.source.read(|data, version| {
            let start = if moving {
                match self.locate_current(data, version) {
                    Ok(i) => i + 1,
                    Err(i) => i,
                }
            } else {
                0
            };
            let end = data.len().min(start.saturating_add(max));
            (start < end).then(|| (end - 1, (start..end).map(|i| data.pair(i)).collect::<Vec<_>>()))
        });
        let (last, batch) = batch?;
        let pair = batch.last().cloned();
        self.land(pair.map(|p| (last, p)), version, CursorState::BatchMoving);
        Some(batch)
    }
}

impl<K, V> Cursor for ContainerCursor<K, V>
where
    K: SeriesKey,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn state(&self) -> CursorState {
        self.state
    }

    fn comparer(&self) -> &KeyComparer<K> {
        self.source.comparer()
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn is_indexed(&self) -> bool {
        self.source.ordering() == KeyOrdering::Indexed
    }

    fn is_completed(&self) -> bool {
        self.source.is_completed()
    }

    fn move_first(&mut self) -> bool {
        self.state.ensure_initialized("move_first");
        self.move_to(|_, _, _| Some(0))
    }

    fn move_last(&mut self) -> bool {
        self.state.ensure_initialized("move_last");
        self.move_to(|_, data, _| data.len().checked_sub(1))
    }

    fn move_next(&mut self) -> bool {
        self.state.ensure_initialized("move_next");
        if !self.state.is_moving() {
            return self.move_first();
        }
        self.move_to(|this, data, version| match this.locate_current(data, version) {
            Ok(i) => Some(i + 1),
            Err(i) => Some(i),
        })
    }

    fn move_previous(&mut self) -> bool {
        self.state.ensure_initialized("move_previous");
        if !self.state.is_moving() {
            return self.move_last();
        }
        self.move_to(|this, data, version| match this.locate_current(data, version) {
            Ok(i) | Err(i) => i.checked_sub(1),
        })
    }

    fn move_at(&mut self, key: &K, direction: Lookup) -> bool {
        self.state.ensure_initialized("move_at");
        self.move_to(|this, data, _| {
            data.locate(key, direction, this.source.comparer(), this.source.ordering())
        })
    }

    fn current_key(&self) -> &K {
        match &self.current {
            Some((key, _)) if self.state.is_moving() => key,
            _ => fault::raise(Fault::NotPositioned("current_key")),
        }
    }

    fn current_value(&self) -> V {
        match &self.current {
            Some((_, value)) if self.state.is_moving() => value.clone(),
            _ => fault::raise(Fault::NotPositioned("current_value")),
        }
    }

    fn try_get_value(&mut self, key: &K) -> Option<V> {
        self.state.ensure_initialized("try_get_value");
        self.source.try_get_value(key)
    }

    fn initialize(&self) -> Self {
        Self::new(Arc::clone(&self.source))
    }

    fn reset(&mut self) {
        self.state.ensure_initialized("reset");
        self.state = CursorState::Initialized;
        self.current = None;
    }

    fn dispose(&mut self) {
        self.state = CursorState::None;
        self.current = None;
    }

    fn subscribe(&self, subscriber: &Arc<dyn AsyncSubscriber>, sink: &mut SubscriptionSink) {
        sink.push(self.source.subscribe(Arc::clone(subscriber)));
    }
}
