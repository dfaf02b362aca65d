/*!
 * Condition Variable
 *
 * Mesa-style condition variable paired with a `Lock`
 */

use super::lock::Lock;
use super::wait_queue::WaitQueue;
use crate::core::errors::ThreadResult;
use crate::interrupt::InterruptGuard;
use crate::scheduler::{sleep, wakeup};
use std::fmt;

/// Condition variable for threads of one scheduler
///
/// Waiters re-check their condition after waking: a signal only moves a
/// waiter to the ready queue, and another thread may get the lock first.
pub struct Condvar {
    waiters: WaitQueue,
}

impl Condvar {
    pub fn new() -> Self {
        Self {
            waiters: WaitQueue::new(),
        }
    }

    /// Release `lock`, block until signalled, then re-acquire `lock`
    ///
    /// The caller must hold `lock` (`Invalid` otherwise). If nothing else can
    /// run, the lock is re-acquired and `NoCandidate` is returned.
    pub fn wait(&self, lock: &Lock) -> ThreadResult<()> {
        let _gate = InterruptGuard::new();
        lock.release()?;
        let slept = sleep(&self.waiters);
        lock.acquire()?;
        slept.map(drop)
    }

    /// Wake the earliest waiter, if any
    pub fn signal(&self, lock: &Lock) -> ThreadResult<usize> {
        self.notify(lock, false)
    }

    /// Wake every waiter
    pub fn broadcast(&self, lock: &Lock) -> ThreadResult<usize> {
        self.notify(lock, true)
    }

    /// Number of blocked waiters
    pub fn waiters(&self) -> usize {
        self.waiters.len()
    }

    fn notify(&self, lock: &Lock, all: bool) -> ThreadResult<usize> {
        let _gate = InterruptGuard::new();
        if !lock.is_held_by_current() {
            log::warn!(
                "Condition variable notified without holding its lock (holder: {:?})",
                lock.holder()
            );
        }
        wakeup(&self.waiters, all)
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Condvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar")
            .field("waiters", &self.waiters)
            .finish()
    }
}
