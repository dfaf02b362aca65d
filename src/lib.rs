/*!
 * uthreads
 * User-level threads with cooperative scheduling and optional timer preemption
 *
 * All threads of a scheduler share the OS thread that called `init`. They
 * switch only at `yield_to`, `sleep` (and everything built on it), `exit`,
 * or, when preemption is configured, at a timer tick while the interrupt
 * gate is open.
 */

mod context;
pub mod core;
pub mod interrupt;
pub mod monitoring;
pub mod scheduler;
pub mod sync;

// Re-exports
pub use crate::core::errors::{ThreadError, ThreadResult};
pub use crate::core::types::{
    Target, ThreadInfo, ThreadState, Tid, THREAD_ANY, THREAD_FAILED, THREAD_INVALID,
    THREAD_NOMEMORY, THREAD_NOMORE, THREAD_NONE, THREAD_SELF,
};
pub use crate::core::SchedulerConfig;
pub use interrupt::{without_preemption, InterruptGuard};
pub use monitoring::init_tracing;
pub use scheduler::{
    create, current_id, exit, init, init_with, kill, shutdown, sleep, state_of, stats, threads,
    wakeup, yield_now, yield_to, SchedulerStats,
};
pub use sync::{join, Condvar, Lock, LockGuard, WaitQueue};
