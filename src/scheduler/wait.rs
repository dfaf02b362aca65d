/*!
 * Sleep and Wakeup
 * Blocking on wait queues and moving waiters back to the ready queue
 */

use super::operations::Handoff;
use super::{with_scheduler, Scheduler};
use crate::core::errors::{fatal, ThreadError, ThreadResult};
use crate::core::types::{ThreadState, Tid};
use crate::interrupt::InterruptGuard;
use crate::sync::WaitQueue;

impl Scheduler {
    pub(super) fn plan_sleep(&mut self, queue: &WaitQueue) -> ThreadResult<Handoff> {
        let next = self.ready.pop_front().ok_or(ThreadError::NoCandidate)?;
        let me = self.running;

        let caller = self.current_mut();
        caller.state = ThreadState::Wait;
        let from = Self::save_slot(caller);
        queue.push(me);

        let to = self.promote(next);
        Ok(Handoff::Switch { from, to, next })
    }

    /// Move waiters from `queue` to the ready queue, FIFO
    pub(super) fn wake(&mut self, queue: &WaitQueue, all: bool) -> usize {
        let mut woken = 0;
        while let Some(tid) = queue.pop() {
            self.make_ready(tid);
            woken += 1;
            if !all {
                break;
            }
        }
        woken
    }

    fn make_ready(&mut self, tid: Tid) {
        let tcb = self.tcb_mut(tid);
        match tcb.state {
            ThreadState::Wait => tcb.state = ThreadState::Ready,
            // Stays killed; it exits as soon as it is scheduled
            ThreadState::Killed => {}
            _ => fatal("wait queue held a thread that was not waiting"),
        }
        self.ready.push_back(tid);
    }
}

/// Block the caller on `queue` and run the head of the ready queue
///
/// Returns the identifier of the thread that was switched to, once the
/// caller has been woken and scheduled again. Fails with `NoCandidate`, and
/// keeps running, when nothing else is ready.
pub fn sleep(queue: &WaitQueue) -> ThreadResult<Tid> {
    let _gate = InterruptGuard::new();
    let handoff = with_scheduler(|s| s.plan_sleep(queue))??;
    // SAFETY: planned just now with the gate closed
    Ok(unsafe { handoff.perform() })
}

/// Move one waiter (or all of them) from `queue` to the ready queue
///
/// Returns how many threads were moved. Never switches.
pub fn wakeup(queue: &WaitQueue, all: bool) -> ThreadResult<usize> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.wake(queue, all))
}
