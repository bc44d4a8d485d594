// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Spin-lock baseline.
//!
//! The lock owns its data in an `UnsafeCell`; this is the only module of the
//! crate that needs `unsafe`.

#![allow(unsafe_code)]

use std::{
    cell::UnsafeCell,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use crossbeam::utils::Backoff;

use crate::{backoff::BackoffPolicy, hazard::WorkerId, node::NodeId};

/// Test-and-set lock. Spins with exponential snoozing first, then waits
/// according to its [`BackoffPolicy`] between attempts once snoozing is
/// exhausted.
pub struct SpinLock<T> {
    locked:  AtomicBool,
    backoff: BackoffPolicy,
    data:    UnsafeCell<T>,
}

// SAFETY: `data` is only reachable through a `SpinGuard`, and at most one
// guard exists at a time.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// A lock that waits the default 250 µs once snoozing is exhausted.
    pub fn new(data: T) -> Self { Self::with_backoff(data, BackoffPolicy::default()) }

    pub const fn with_backoff(data: T, backoff: BackoffPolicy) -> Self {
        Self {
            locked: AtomicBool::new(false),
            backoff,
            data: UnsafeCell::new(data),
        }
    }

    pub const fn backoff(&self) -> BackoffPolicy { self.backoff }

    pub fn lock(&self) -> SpinGuard<'_, T> {
        let snooze = Backoff::new();
        let mut retry = self.backoff.start();
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            if snooze.is_completed() {
                retry.wait();
            } else {
                snooze.snooze();
            }
        }
    }

    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinGuard {
                lock:    self,
                _marker: PhantomData,
            })
    }

    pub fn into_inner(self) -> T { self.data.into_inner() }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self { Self::new(T::default()) }
}

impl<T> std::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

pub struct SpinGuard<'a, T> {
    lock:    &'a SpinLock<T>,
    // Shares `&mut T`'s auto traits, so a guard is `Sync` only for `T: Sync`.
    _marker: PhantomData<&'a mut T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: holding the guard means holding the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard means holding the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) { self.lock.locked.store(false, Ordering::Release); }
}

/// Spinning baseline: a vector of ids behind a [`SpinLock`].
#[derive(Debug, Default)]
pub struct SpinLockStack {
    items: SpinLock<Vec<NodeId>>,
}

impl SpinLockStack {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_backoff(capacity, BackoffPolicy::default())
    }

    /// Reserves room for `capacity` ids and waits per `backoff` on a
    /// contended lock.
    #[must_use]
    pub fn with_backoff(capacity: usize, backoff: BackoffPolicy) -> Self {
        Self {
            items: SpinLock::with_backoff(Vec::with_capacity(capacity), backoff),
        }
    }

    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy { self.items.backoff() }

    pub fn push(&self, id: NodeId) { self.items.lock().push(id); }

    /// `worker` is accepted for interface parity and ignored.
    pub fn pop(&self, _worker: WorkerId) -> Option<NodeId> { self.items.lock().pop() }

    #[must_use]
    pub fn len(&self) -> usize { self.items.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.lock().is_empty() }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::{
        sync::atomic::AtomicUsize,
        time::{Duration, Instant},
    };

    use super::*;

    /// Time `lock` takes while another thread holds the lock for `held`.
    fn contended_wait(lock: &SpinLock<()>, held: Duration) -> Duration {
        let guard = lock.lock();
        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let start = Instant::now();
                drop(lock.lock());
                start.elapsed()
            });
            thread::sleep(held);
            drop(guard);
            waiter.join().unwrap()
        })
    }

    #[test]
    fn test_try_lock_excludes() {
        let lock = SpinLock::new(0u32);
        let guard = lock.try_lock().unwrap();
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_lock_serializes_increments() {
        let lock = SpinLock::new(0usize);
        let entered = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        let mut guard = lock.lock();
                        assert_eq!(entered.fetch_add(1, Ordering::SeqCst), 0);
                        *guard += 1;
                        entered.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(lock.into_inner(), 8_000);
    }

    #[test]
    fn test_lock_waits_per_policy() {
        let lock = SpinLock::with_backoff((), BackoffPolicy::Fixed(Duration::from_millis(300)));
        assert!(contended_wait(&lock, Duration::from_millis(20)) >= Duration::from_millis(300));
    }

    #[test]
    fn test_zero_delay_lock_never_sleeps() {
        let lock = SpinLock::with_backoff((), BackoffPolicy::Fixed(Duration::ZERO));
        assert!(contended_wait(&lock, Duration::from_millis(20)) < Duration::from_millis(150));
    }

    #[test]
    fn test_spin_stack_keeps_its_backoff() {
        let policy = BackoffPolicy::Fixed(Duration::ZERO);
        assert_eq!(SpinLockStack::with_backoff(4, policy).backoff(), policy);
        assert_eq!(SpinLockStack::new().backoff(), BackoffPolicy::default());
    }

    #[test]
    fn test_spin_stack_lifo() {
        let stack = SpinLockStack::with_capacity(3);
        for i in 0..3 {
            stack.push(NodeId::new(i).unwrap());
        }
        assert_eq!(stack.len(), 3);
        for i in (0..3).rev() {
            assert_eq!(stack.pop(WorkerId::new(0)), NodeId::new(i));
        }
        assert!(stack.is_empty());
    }
}
