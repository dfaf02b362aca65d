/*!
 * Lock
 *
 * Blocking mutual exclusion built purely on sleep and wakeup
 */

use super::wait_queue::WaitQueue;
use crate::core::errors::{ThreadError, ThreadResult};
use crate::core::types::Tid;
use crate::interrupt::InterruptGuard;
use crate::scheduler::{self, sleep, wakeup, ThreadKey};
use std::cell::Cell;
use std::fmt;

/// Mutual-exclusion lock for threads of one scheduler
///
/// Release wakes every waiter and each of them re-checks the owner, so the
/// lock passes to exactly one of them while the rest go back to sleep.
///
/// A lock whose holder exits without releasing it (for instance because it
/// was killed inside its critical section) is abandoned. The next `acquire`
/// takes it over; threads already blocked on it wait for that acquirer's
/// `release`.
pub struct Lock {
    waiters: WaitQueue,
    owner: Cell<Option<ThreadKey>>,
}

impl Lock {
    pub fn new() -> Self {
        Self {
            waiters: WaitQueue::new(),
            owner: Cell::new(None),
        }
    }

    /// Block until the lock is free, then take it
    ///
    /// Fails with `Invalid` when the caller already holds the lock and with
    /// `NoCandidate` when the lock is held and no other thread can run to
    /// release it.
    pub fn acquire(&self) -> ThreadResult<()> {
        let _gate = InterruptGuard::new();
        let me = scheduler::current_key()?;
        if self.live_owner() == Some(me) {
            return Err(ThreadError::Invalid);
        }
        while self.live_owner().is_some() {
            sleep(&self.waiters)?;
        }
        self.owner.set(Some(me));
        Ok(())
    }

    /// Give the lock up and wake every waiter
    ///
    /// Fails with `Invalid`, changing nothing, when the caller is not the
    /// holder.
    pub fn release(&self) -> ThreadResult<()> {
        let _gate = InterruptGuard::new();
        let me = scheduler::current_key()?;
        if self.owner.get() != Some(me) {
            return Err(ThreadError::Invalid);
        }
        self.owner.set(None);
        wakeup(&self.waiters, true)?;
        Ok(())
    }

    /// Acquire and return a guard that releases on drop
    pub fn lock(&self) -> ThreadResult<LockGuard<'_>> {
        self.acquire()?;
        Ok(LockGuard { lock: self })
    }

    /// Current holder, if any
    pub fn holder(&self) -> Option<Tid> {
        let _gate = InterruptGuard::new();
        self.live_owner().map(|key| key.tid)
    }

    pub fn is_locked(&self) -> bool {
        self.holder().is_some()
    }

    /// Whether the running thread holds the lock
    pub fn is_held_by_current(&self) -> bool {
        match scheduler::current_key() {
            Ok(me) => self.owner.get() == Some(me),
            Err(_) => false,
        }
    }

    /// Owner, after dropping one that exited while holding the lock
    ///
    /// Callers keep the gate closed.
    fn live_owner(&self) -> Option<ThreadKey> {
        let key = self.owner.get()?;
        // Without a scheduler nothing can be checked; trust the record
        if scheduler::is_live(key).unwrap_or(true) {
            return Some(key);
        }
        log::warn!("Thread {} exited while holding a lock; lock recovered", key.tid);
        self.owner.set(None);
        None
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("owner", &self.owner.get().map(|key| key.tid))
            .field("waiters", &self.waiters)
            .finish()
    }
}

/// Holds a `Lock` until dropped
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
}

impl LockGuard<'_> {
    /// The guarded lock, e.g. for `Condvar::wait`
    pub fn lock(&self) -> &Lock {
        self.lock
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release() {
            log::error!("Failed to release lock on guard drop: {}", err);
        }
    }
}
