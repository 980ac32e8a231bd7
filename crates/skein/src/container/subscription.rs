//! Subscriber registry.
//!
//! Consumers that want to suspend until a container changes register an
//! [`AsyncSubscriber`]. The registry is an immutable [`Subscribers`] value
//! published through an [`ArcSwap`]: writers of the registry (subscribe and
//! unsubscribe) hold the container lock and publish a replacement, while the
//! update broadcast takes one atomic load and walks that snapshot lock-free.
//! A subscriber added during a broadcast may miss it; it sees the new version
//! on its own next read.

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Completion callback of an async consumer.
pub trait AsyncSubscriber: Send + Sync {
    /// Signals that the container changed (`is_final == false`) or was
    /// completed (`is_final == true`).
    ///
    /// Returns true if the signal was accepted by a live consumer.
    fn try_complete(&self, is_final: bool) -> bool;
}

#[derive(Clone)]
pub(crate) struct Slot {
    id: u64,
    handle: Arc<dyn AsyncSubscriber>,
}

/// Registered subscribers of one container.
///
/// Removal from `Many` leaves a `None` tombstone so slot positions stay stable;
/// later subscriptions reuse tombstones before growing the vector.
#[derive(Clone, Default)]
pub(crate) enum Subscribers {
    #[default]
    Empty,
    One(Slot),
    Many(Vec<Option<Slot>>),
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscribers({})", self.len())
    }
}

impl Subscribers {
    /// Number of live subscribers.
    pub(crate) fn len(&self) -> usize {
        match self {
            Subscribers::Empty => 0,
            Subscribers::One(_) => 1,
            Subscribers::Many(slots) => slots.iter().filter(|s| s.is_some()).count(),
        }
    }

    fn with(&self, slot: Slot) -> Subscribers {
        match self {
            Subscribers::Empty => Subscribers::One(slot),
            Subscribers::One(existing) => Subscribers::Many(vec![Some(existing.clone()), Some(slot)]),
            Subscribers::Many(slots) => {
                let mut slots = slots.clone();
                match slots.iter_mut().find(|s| s.is_none()) {
                    Some(free) => *free = Some(slot),
                    None => slots.push(Some(slot)),
                }
                Subscribers::Many(slots)
            }
        }
    }

    fn without(&self, id: u64) -> Option<Subscribers> {
        match self {
            Subscribers::Empty => None,
            Subscribers::One(slot) if slot.id == id => Some(Subscribers::Empty),
            Subscribers::One(_) => None,
            Subscribers::Many(slots) => {
                let position = slots
                    .iter()
                    .position(|s| s.as_ref().is_some_and(|s| s.id == id))?;
                let mut slots = slots.clone();
                slots[position] = None;
                if slots.iter().all(Option::is_none) {
                    Some(Subscribers::Empty)
                } else {
                    Some(Subscribers::Many(slots))
                }
            }
        }
    }

    /// Calls `try_complete` on every live subscriber; returns how many accepted.
    pub(crate) fn broadcast(&self, is_final: bool) -> usize {
        match self {
            Subscribers::Empty => 0,
            Subscribers::One(slot) => usize::from(slot.handle.try_complete(is_final)),
            Subscribers::Many(slots) => slots
                .iter()
                .flatten()
                .filter(|slot| slot.handle.try_complete(is_final))
                .count(),
        }
    }
}

/// Lock-guarded mutation of the published registry.
pub(crate) struct Registry {
    current: ArcSwap<Subscribers>,
    next_id: std::sync::atomic::AtomicU64,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registry").field(&*self.current.load()).finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(Subscribers::Empty),
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl Registry {
    /// Adds `handle`. Caller holds the container lock.
    pub(crate) fn insert_locked(&self, handle: Arc<dyn AsyncSubscriber>) -> u64 {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let next = self.current.load().with(Slot { id, handle });
        self.current.store(Arc::new(next));
        id
    }

    /// Removes the slot `id`. Caller holds the container lock.
    pub(crate) fn remove_locked(&self, id: u64) -> bool {
        match self.current.load().without(id) {
            Some(next) => {
                self.current.store(Arc::new(next));
                true
            }
            None => false,
        }
    }

    /// Drops every subscriber; returns how many were live. Caller holds the container lock.
    pub(crate) fn clear_locked(&self) -> usize {
        self.current.swap(Arc::new(Subscribers::Empty)).len()
    }

    /// Snapshot of the registry, one atomic load.
    pub(crate) fn snapshot(&self) -> Arc<Subscribers> {
        self.current.load_full()
    }
}

/// Anything that can drop a subscription by id.
pub(crate) trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

/// Disposable token returned by `subscribe`.
///
/// Dropping or disposing the token removes the subscriber. Disposal is
/// idempotent and does nothing if the container is already gone.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    host: Option<Weak<dyn Unsubscribe>>,
    id: u64,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    pub(crate) fn new(host: Weak<dyn Unsubscribe>, id: u64) -> Self {
        Self {
            host: Some(host),
            id,
        }
    }

    /// A token for a subscriber that was never registered, e.g. because the
    /// container was already completed.
    pub(crate) fn inert() -> Self {
        Self { host: None, id: 0 }
    }

    /// Returns true until the token is disposed.
    pub fn is_active(&self) -> bool {
        self.host.is_some()
    }

    /// Unregisters the subscriber.
    pub fn dispose(&mut self) {
        if let Some(host) = self.host.take().and_then(|weak| weak.upgrade()) {
            host.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
