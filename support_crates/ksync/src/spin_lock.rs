use core::cell::UnsafeCell;
use core::fmt::{Debug, Formatter};
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};
use thiserror_no_std::Error;

/// The error returned by [`SpinLock::try_lock`] when the lock is currently held by someone else
#[derive(Debug, Error, Eq, PartialEq, Copy, Clone)]
#[error("the lock is currently held by another context")]
pub struct WouldBlock;

/// A SpinLock Mutex implementation
///
/// Critical sections guarded by this lock are expected to be short (a queue push or pop), so contending contexts
/// simply spin instead of being parked.
pub struct SpinLock<T> {
    is_locked: AtomicBool,
    value: UnsafeCell<T>,
}

/// A Guard protecting some data locked through a [`SpinLock`].
///
/// Use it via the implemented [`Deref`] and [`DerefMut`] traits.
/// The lock is released when the guard is dropped.
pub struct Guard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            is_locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Try to lock the lock and return a [`Guard`] if successful
    pub fn try_lock(&self) -> Result<Guard<T>, WouldBlock> {
        if self.is_locked.swap(true, Ordering::Acquire) {
            Err(WouldBlock)
        } else {
            Ok(Guard { lock: self })
        }
    }

    /// Try to repeatedly lock the lock until it succeeds, returning the protected data via a [`Guard`]
    pub fn spin_lock(&self) -> Guard<T> {
        while self.is_locked.swap(true, Ordering::Acquire) {
            spin_loop();
        }
        Guard { lock: self }
    }

    /// Run `f` with exclusive access to the protected data and release the lock afterwards
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.spin_lock();
        f(&mut guard)
    }

    /// Access the protected data without locking.
    ///
    /// This is safe because the exclusive borrow proves that no [`Guard`] can exist.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    fn unlock(&self) {
        self.is_locked.store(false, Ordering::Release)
    }
}

unsafe impl<T> Sync for SpinLock<T> where T: Send {}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for SpinLock<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpinLock")
            .field("is_locked", &self.is_locked.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T> Deref for Guard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Safety: The very existence of this Guard guarantees we've exclusively locked the lock
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for Guard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Safety: The very existence of this Guard guarantees we've exclusively locked the lock
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for Guard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn try_lock_fails_while_guard_is_alive() {
        let lock = SpinLock::new(0u32);
        let guard = lock.try_lock().unwrap();
        assert_eq!(lock.try_lock().err(), Some(WouldBlock));
        drop(guard);
        assert!(lock.try_lock().is_ok());
    }

    #[test]
    fn with_releases_the_lock() {
        let lock = SpinLock::new(Vec::new());
        lock.with(|v| v.push(1));
        lock.with(|v| v.push(2));
        assert_eq!(lock.into_inner(), [1, 2]);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let lock = Arc::new(SpinLock::new(0usize));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *lock.spin_lock() += 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*lock.spin_lock(), 4000);
    }
}
