/*!
 * Exclusive Lock
 *
 * Mutual exclusion with an explicit holder. The lock can be driven two ways:
 * - Scoped: `lock()` returns a guard that releases on every exit path,
 *   including unwinding, and is the only way to reach the protected data
 * - Raw: `acquire()` / `release()` pairs for coordination without data,
 *   where releasing from anything but the raw holder is reported
 */

use super::types::LockError;
use crate::core::sync::{SpinWait, SyncConfig};
use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Holder {
    thread: ThreadId,
    /// Held through a `LockGuard`; raw `release()` must not free it
    scoped: bool,
}

#[derive(Debug, Default)]
struct LockState {
    holder: Option<Holder>,
    waiters: usize,
}

/// Exclusive lock with holder tracking
///
/// # Examples
///
/// ```
/// use coord_kit::Lock;
///
/// let counter = Lock::new(0u64);
/// *counter.lock() += 1;
/// assert_eq!(*counter.lock(), 1);
///
/// let gate = Lock::new(());
/// gate.acquire();
/// gate.release().unwrap();
/// assert!(gate.release().is_err());
/// ```
pub struct Lock<T = ()> {
    state: Mutex<LockState>,
    condvar: Condvar,
    spin: Option<SpinWait>,
    data: UnsafeCell<T>,
}

// SAFETY: `data` is only reachable through a `LockGuard`, which exists only
// while the holder is set to the guard's thread. Holder transitions happen
// under `state`.
unsafe impl<T: Send> Send for Lock<T> {}
unsafe impl<T: Send> Sync for Lock<T> {}

impl<T> Lock<T> {
    /// Create a free lock protecting `data`
    pub fn new(data: T) -> Self {
        Self::with_config(data, SyncConfig::default())
    }

    /// Create a free lock with a specific wait strategy
    pub fn with_config(data: T, config: SyncConfig) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            condvar: Condvar::new(),
            spin: config.spin_wait(),
            data: UnsafeCell::new(data),
        }
    }

    /// Block until the lock is free, then hold it as the calling worker
    ///
    /// Must be paired with `release()` from the same worker.
    pub fn acquire(&self) {
        self.acquire_as(false);
    }

    /// Hold the lock if it is free right now
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_as(false)
    }

    /// Free a lock taken with `acquire()`
    ///
    /// Fails with `NotHeld` when the lock is free, held by another worker,
    /// or held through a guard.
    pub fn release(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.holder {
            Some(holder) if holder.thread == me && !holder.scoped => {
                self.unlock(&mut state);
                Ok(())
            }
            holder => {
                warn!(?holder, releaser = ?me, "Lock released without being held");
                Err(LockError::NotHeld)
            }
        }
    }

    /// Scoped acquisition; the guard releases on drop
    pub fn lock(&self) -> LockGuard<'_, T> {
        self.acquire_as(true);
        LockGuard::new(self)
    }

    /// Scoped acquisition if the lock is free right now
    pub fn try_lock(&self) -> Option<LockGuard<'_, T>> {
        self.try_acquire_as(true).then(|| LockGuard::new(self))
    }

    /// Run `f` with exclusive access to the data
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Whether any worker holds the lock
    pub fn is_locked(&self) -> bool {
        self.state.lock().holder.is_some()
    }

    /// Mutable access without locking; the borrow proves exclusivity
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the lock, returning the data
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn try_acquire_as(&self, scoped: bool) -> bool {
        let mut state = self.state.lock();
        if state.holder.is_some() {
            return false;
        }
        state.holder = Some(Holder {
            thread: thread::current().id(),
            scoped,
        });
        true
    }

    fn acquire_as(&self, scoped: bool) {
        if self.try_acquire_as(scoped) {
            return;
        }

        if let Some(spin) = &self.spin {
            if spin.spin_until(|| self.try_acquire_as(scoped)) {
                return;
            }
        }

        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.holder.is_some() {
            state.waiters += 1;
            trace!(thread = ?me, waiters = state.waiters, "Parking on held lock");
            self.condvar.wait(&mut state);
            state.waiters -= 1;
        }
        state.holder = Some(Holder { thread: me, scoped });
    }

    fn unlock(&self, state: &mut LockState) {
        state.holder = None;
        if state.waiters > 0 {
            self.condvar.notify_one();
        }
    }

    fn release_scoped(&self) {
        let mut state = self.state.lock();
        self.unlock(&mut state);
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Lock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Lock")
            .field("holder", &state.holder.map(|h| h.thread))
            .field("waiters", &state.waiters)
            .finish_non_exhaustive()
    }
}

/// Scoped hold on a `Lock`
///
/// Derefs to the protected data and releases the lock when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, T> {
    lock: &'a Lock<T>,
    // Sharing the guard shares `&T`, so the guard is only `Sync` for `T: Sync`
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> LockGuard<'a, T> {
    fn new(lock: &'a Lock<T>) -> Self {
        Self {
            lock,
            _marker: PhantomData,
        }
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard's existence means this thread holds the lock
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, and `&mut self` rules out aliasing through the guard
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_scoped();
    }
}

impl<T: fmt::Debug> fmt::Debug for LockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockGuard").field(&**self).finish()
    }
}
