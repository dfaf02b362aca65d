/*!
 * Wait Queue
 *
 * FIFO of thread identifiers blocked until someone calls `wakeup`.
 */

use crate::core::types::Tid;
use crate::interrupt::InterruptGuard;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// Threads blocked pending a wakeup, earliest sleeper first
///
/// Owned by whatever it guards (a lock, a condition variable, a thread's
/// joiners). Dropping a queue that still holds waiters orphans them: they
/// stay blocked forever and their identifiers stay in use.
///
/// # Examples
///
/// ```
/// use uthreads::{wakeup, WaitQueue};
///
/// uthreads::init().unwrap();
/// let queue = WaitQueue::new();
/// assert!(queue.is_empty());
/// // Nobody is waiting, so nobody moves
/// assert_eq!(wakeup(&queue, true).unwrap(), 0);
/// uthreads::shutdown().unwrap();
/// ```
pub struct WaitQueue {
    waiters: RefCell<VecDeque<Tid>>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            waiters: RefCell::new(VecDeque::new()),
        }
    }

    /// Number of blocked threads
    pub fn len(&self) -> usize {
        let _gate = InterruptGuard::new();
        self.waiters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocked threads, earliest first
    pub fn waiters(&self) -> Vec<Tid> {
        let _gate = InterruptGuard::new();
        self.waiters.borrow().iter().copied().collect()
    }

    // Mutators below run inside scheduler operations, with the gate closed

    pub(crate) fn push(&self, tid: Tid) {
        self.waiters.borrow_mut().push_back(tid);
    }

    pub(crate) fn pop(&self) -> Option<Tid> {
        self.waiters.borrow_mut().pop_front()
    }

    /// Forget every waiter without waking it
    pub(crate) fn clear(&self) {
        self.waiters.borrow_mut().clear();
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitQueue")
            .field("waiters", &self.waiters())
            .finish()
    }
}

impl Drop for WaitQueue {
    fn drop(&mut self) {
        let orphaned = self.waiters.get_mut();
        if !orphaned.is_empty() {
            log::error!(
                "Wait queue destroyed with {} blocked threads {:?}; they will never wake",
                orphaned.len(),
                orphaned
            );
        }
    }
}
