/*!
 * Synchronization Layer
 *
 * Wait queues, locks, condition variables and join, all built from the
 * scheduler's sleep and wakeup without touching contexts directly.
 */

mod condvar;
mod join;
mod lock;
mod wait_queue;

pub use condvar::Condvar;
pub use join::join;
pub use lock::{Lock, LockGuard};
pub use wait_queue::WaitQueue;
