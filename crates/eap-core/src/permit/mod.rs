//! Counting permit set that throttles pending-instance creation.
//!
//! Workers take a permit before asking the platform for a new pod. The capacity
//! reconciler moves the available count up and down with relative operations
//! (`release`, `try_acquire`, `drain`) so it never races a worker with a blind store.
//!
//! The available count always stays within `[0, ceiling]`.
//! Waiters are not served in FIFO order.
mod error;
pub use error::PermitError;

use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use tokio::sync::Notify;

pub struct PermitSet {
    ceiling: usize,
    available: AtomicUsize,
    closed: AtomicBool,
    released: Notify,
}

impl PermitSet {
    /// Create an empty permit set; the first reconciliation pass fills it.
    pub fn new(ceiling: usize) -> Self {
        Self::with_available(ceiling, 0)
    }

    /// Create a permit set with an initial available count (clamped to `ceiling`).
    pub fn with_available(ceiling: usize, available: usize) -> Self {
        Self {
            ceiling,
            available: AtomicUsize::new(available.min(ceiling)),
            closed: AtomicBool::new(false),
            released: Notify::new(),
        }
    }

    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Point-in-time available count.
    ///
    /// May be stale by the time the caller acts on it.
    #[inline]
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until `n` permits are available and consume them.
    ///
    /// Cancel safe: a dropped future never holds permits.
    pub async fn acquire(&self, n: usize) -> Result<(), PermitError> {
        if n > self.ceiling {
            return Err(PermitError::ExceedsCeiling {
                requested: n,
                ceiling: self.ceiling,
            });
        }
        loop {
            // Register interest before checking, so a release in between is not missed.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if self.is_closed() {
                return Err(PermitError::Closed);
            }
            if self.try_acquire_exact(n) {
                return Ok(());
            }
            released.await;
        }
    }

    /// [`PermitSet::acquire`] bounded by `timeout`.
    pub async fn acquire_timeout(&self, n: usize, timeout: Duration) -> Result<(), PermitError> {
        match tokio::time::timeout(timeout, self.acquire(n)).await {
            Ok(res) => res,
            Err(_) => Err(PermitError::Timeout {
                requested: n,
                waited: timeout,
            }),
        }
    }

    /// Consume up to `n` permits without waiting; returns how many were taken.
    pub fn try_acquire(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur > 0).then(|| cur - cur.min(n))
            })
            .map(|prev| prev.min(n))
            .unwrap_or(0)
    }

    /// Consume exactly `n` permits without waiting, or none at all.
    pub fn try_acquire_exact(&self, n: usize) -> bool {
        if n == 0 {
            return true;
        }
        self.available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_sub(n))
            .is_ok()
    }

    /// Return `n` permits; returns how many were actually added.
    ///
    /// Saturates at the ceiling.
    pub fn release(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let ceiling = self.ceiling;
        match self
            .available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                let next = cur.saturating_add(n).min(ceiling);
                (next != cur).then_some(next)
            }) {
            Ok(prev) => {
                self.released.notify_waiters();
                prev.saturating_add(n).min(ceiling) - prev
            }
            Err(_) => 0,
        }
    }

    /// Set the available count to zero; returns how many permits were removed.
    pub fn drain(&self) -> usize {
        self.available.swap(0, Ordering::AcqRel)
    }

    /// Fail every pending and future [`PermitSet::acquire`] with [`PermitError::Closed`].
    ///
    /// `release`, `try_acquire` and `drain` keep working after close.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.released.notify_waiters();
    }
}

impl fmt::Debug for PermitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermitSet")
            .field("ceiling", &self.ceiling)
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish()
    }
}
