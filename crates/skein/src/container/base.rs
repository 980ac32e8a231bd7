//! Optimistic concurrency core shared by mutable containers.
//!
//! # Protocol
//!
//! ```text
//! writer:  lock ─▶ next_version += 1 ─▶ mutate ─▶ version = next_version ─▶ broadcast ─▶ unlock
//!                                          └── unchanged ──▶ next_version = version ──▶ unlock
//! reader:  v0 = next_version ─▶ body() ─▶ v1 = version ─▶ v0 == v1 ? done : retry
//! ```
//!
//! `next_version == version` means no write is in flight. A reader that sees
//! the same value before and after its body observed a consistent snapshot.
//! Readers never take the lock; they spin only while a write overlaps them.
//!
//! The same binary spinlock serves a plain mutual-exclusion path for
//! structural operations (subscribe, unsubscribe, completion) that do not
//! need the versioning dance.

use crate::container::subscription::{AsyncSubscriber, Registry, Subscription, Unsubscribe};
use crate::container::ContainerConfig;
use crate::fault::{self, Fault};
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Version counters, writer spinlock and subscriber registry of a container.
#[derive(Debug)]
pub struct ContainerCore {
    version: AtomicU64,
    next_version: AtomicU64,
    locker: AtomicBool,
    completed: AtomicBool,
    registry: Registry,
    spin_budget: u32,
    lock_timeout: Duration,
}

/// Holds the container spinlock; releases it on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    core: &'a ContainerCore,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.core.release_lock();
    }
}

/// An in-flight write.
///
/// Created by [`ContainerCore::before_write`]. [`publish`](WriteTxn::publish)
/// makes the new version visible to readers or rolls it back; subscribers are
/// notified when the transaction is dropped, after the caller released the
/// payload. Dropping an unpublished transaction rolls back. The lock is
/// released last in every case.
#[derive(Debug)]
pub struct WriteTxn<'a> {
    core: &'a ContainerCore,
    published: Option<bool>,
    _lock: LockGuard<'a>,
}

impl WriteTxn<'_> {
    /// Publishes (`changed`) or rolls back the version without notifying.
    pub fn publish(&mut self, changed: bool) {
        if self.published.is_none() {
            self.core.after_write(changed);
            self.published = Some(changed);
        }
    }

    /// Publishes or rolls back, then notifies subscribers of a change.
    pub fn commit(mut self, changed: bool) {
        self.publish(changed);
    }
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        match self.published {
            None => self.core.after_write(false),
            Some(true) => {
                self.core.notify(false);
            }
            Some(false) => {}
        }
    }
}

/// Spin-then-yield backoff with a starvation deadline.
struct Backoff {
    attempts: u32,
    started: Option<Instant>,
}

impl Backoff {
    fn new() -> Self {
        Self {
            attempts: 0,
            started: None,
        }
    }

    fn wait(&mut self, core: &ContainerCore, what: &'static str) {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts < core.spin_budget {
            std::hint::spin_loop();
            return;
        }
        let started = *self.started.get_or_insert_with(Instant::now);
        if self.attempts == core.spin_budget {
            warn!(what, spins = core.spin_budget, "container contended past spin budget");
        }
        if started.elapsed() > core.lock_timeout {
            fault::raise(Fault::LockStarvation(core.lock_timeout));
        }
        std::thread::yield_now();
    }
}

impl ContainerCore {
    /// Creates a core with both versions at zero.
    pub fn new(config: &ContainerConfig) -> Self {
        Self {
            version: AtomicU64::new(0),
            next_version: AtomicU64::new(0),
            locker: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            registry: Registry::default(),
            spin_budget: config.spin_budget.max(1),
            lock_timeout: config.lock_timeout,
        }
    }

    /// Last published version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Version of the write in flight, or `version()` when idle.
    pub fn next_version(&self) -> u64 {
        self.next_version.load(Ordering::Acquire)
    }

    /// Returns true once the container is permanently closed for writes.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.snapshot().len()
    }

    /// Acquires the spinlock for a structural operation.
    pub(crate) fn acquire_lock(&self) -> LockGuard<'_> {
        let mut backoff = Backoff::new();
        while self
            .locker
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.wait(self, "lock");
        }
        LockGuard { core: self }
    }

    fn release_lock(&self) {
        self.locker.store(false, Ordering::Release);
    }

    /// Starts a write: takes the lock and announces the next version.
    pub(crate) fn before_write(&self) -> WriteTxn<'_> {
        let lock = self.acquire_lock();
        self.next_version.fetch_add(1, Ordering::AcqRel);
        WriteTxn {
            core: self,
            published: None,
            _lock: lock,
        }
    }

    fn after_write(&self, changed: bool) {
        if changed {
            let next = self.next_version.load(Ordering::Relaxed);
            self.version.store(next, Ordering::Release);
        } else {
            let current = self.version.load(Ordering::Relaxed);
            self.next_version.store(current, Ordering::Release);
        }
    }

    /// Runs a pure read `body` until it observes a consistent snapshot.
    ///
    /// `body` returns `None` when it could not read at all (the payload was
    /// being written); that counts as a conflict and the read is retried.
    /// Returns the result together with the version it is consistent with.
    pub fn read<R>(&self, mut body: impl FnMut() -> Option<R>) -> (R, u64) {
        let mut backoff = Backoff::new();
        loop {
            let before = self.next_version.load(Ordering::Acquire);
            if let Some(result) = body() {
                fence(Ordering::Acquire);
                let after = self.version.load(Ordering::Relaxed);
                if before == after {
                    return (result, after);
                }
            }
            backoff.wait(self, "read");
        }
    }

    /// Broadcasts to every subscriber without taking the lock.
    ///
    /// Returns the number of subscribers that accepted the signal.
    pub(crate) fn notify(&self, is_final: bool) -> usize {
        self.registry.snapshot().broadcast(is_final)
    }

    /// Marks the container completed and sends the final notification.
    ///
    /// Returns false if it was already completed.
    pub(crate) fn complete(&self) -> bool {
        let _lock = self.acquire_lock();
        if self.completed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let accepted = self.notify(true);
        let cleared = self.registry.clear_locked();
        debug!(accepted, cleared, "container completed");
        true
    }

    /// Registers `handle` for update notifications.
    ///
    /// On a completed container the handle receives its final notification
    /// immediately and is not registered.
    pub fn subscribe(self: &Arc<Self>, handle: Arc<dyn AsyncSubscriber>) -> Subscription {
        let lock = self.acquire_lock();
        if self.is_completed() {
            drop(lock);
            handle.try_complete(true);
            return Subscription::inert();
        }
        let id = self.registry.insert_locked(handle);
        drop(lock);
        debug!(id, "subscriber registered");
        let host: Weak<dyn Unsubscribe> = Arc::downgrade(self) as Weak<dyn Unsubscribe>;
        Subscription::new(host, id)
    }
}

impl Unsubscribe for ContainerCore {
    fn unsubscribe(&self, id: u64) {
        let removed = {
            let _lock = self.acquire_lock();
            self.registry.remove_locked(id)
        };
        debug!(id, removed, "subscriber removed");
    }
}
