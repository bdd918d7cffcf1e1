//! Bounded mutual exclusion for the single panel handle.

use crate::error::{MirageError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Proof of exclusive access to the guarded hardware handle.
///
/// Release happens when the permit is dropped, so every exit path
/// (return, error, cancellation) gives the lock back.
pub type Permit<'a, T> = MutexGuard<'a, T>;

/// A mutex whose acquisition is bounded by a per-call timeout.
///
/// At most one [`Permit`] is outstanding at any time. Acquisition order
/// is not guaranteed to be FIFO; only mutual exclusion is. Cancelling a
/// caller while it is still waiting is safe and leaves the lock
/// untouched; once a permit is granted the operation it guards runs to
/// completion.
pub struct HardwareLock<T> {
    inner: Mutex<T>,
    acquisitions: AtomicU64,
}

impl<T> HardwareLock<T> {
    /// Wrap `value` in a new lock.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Wait for exclusive access, giving up after `timeout`.
    ///
    /// A timeout is a distinguishable [`MirageError::LockTimeout`], not
    /// a generic failure.
    pub async fn acquire(&self, timeout: Duration) -> Result<Permit<'_, T>> {
        match tokio::time::timeout(timeout, self.inner.lock()).await {
            Ok(permit) => {
                self.acquisitions.fetch_add(1, Ordering::Relaxed);
                Ok(permit)
            }
            Err(_) => Err(MirageError::LockTimeout(timeout)),
        }
    }

    /// Number of permits granted so far.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}
