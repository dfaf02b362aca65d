/*!
 * Thread Scheduler
 *
 * One scheduler per OS thread, created by `init` and reached through a
 * thread-local handle. Operations plan their state changes while holding a
 * short-lived borrow of the scheduler, release it, and only then switch
 * contexts, so no borrow is ever alive across a switch.
 */

mod entry;
mod operations;
mod stats;
mod tcb;
mod wait;

pub use stats::SchedulerStats;
pub use wait::{sleep, wakeup};

use crate::context::Context;
use crate::core::config::SchedulerConfig;
use crate::core::errors::{ThreadError, ThreadResult};
use crate::core::limits::BOOTSTRAP_TID;
use crate::core::types::{Target, ThreadInfo, ThreadState, Tid};
use crate::interrupt::{InterruptGuard, PreemptionTimer};
use crate::sync::WaitQueue;
use log::{debug, info, warn};
use std::cell::Cell;
use std::collections::VecDeque;
use std::ptr;
use std::rc::Rc;
use entry::ThreadMain;
pub(crate) use tcb::ThreadKey;
use tcb::Tcb;

/// Scheduler state for one OS thread
///
/// # Performance
/// - Identifier-indexed table: O(1) lookup, lowest-free-id allocation
/// - Ready and exit queues preallocated to the table capacity, so the
///   preemption path never allocates
pub(crate) struct Scheduler {
    /// Live threads by identifier; `None` marks a free identifier
    table: Vec<Option<Box<Tcb>>>,
    running: Tid,
    ready: VecDeque<Tid>,
    /// Exited threads whose stacks may still be in use by the last switch
    exited: VecDeque<Box<Tcb>>,
    counters: stats::Counters,
    config: SchedulerConfig,
    timer: Option<PreemptionTimer>,
}

thread_local! {
    static SCHEDULER: Cell<*mut Scheduler> = const { Cell::new(ptr::null_mut()) };
}

/// Run `f` against this OS thread's scheduler
///
/// Callers keep the interrupt gate closed and never switch inside `f`.
pub(crate) fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> ThreadResult<R> {
    let raw = SCHEDULER.with(Cell::get);
    if raw.is_null() {
        return Err(ThreadError::Uninitialized);
    }
    // SAFETY: the pointer stays valid until shutdown clears it, and the
    // closed gate keeps the preemption handler from creating a second borrow
    Ok(f(unsafe { &mut *raw }))
}

/// Detach the scheduler from this OS thread
fn take_scheduler() -> Option<Box<Scheduler>> {
    let raw = SCHEDULER.with(|cell| cell.replace(ptr::null_mut()));
    // SAFETY: produced by Box::into_raw in `init_with`
    (!raw.is_null()).then(|| unsafe { Box::from_raw(raw) })
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Initialize the thread library on the calling OS thread with defaults
///
/// The caller becomes thread 0 and keeps running on its own stack.
pub fn init() -> ThreadResult<()> {
    init_with(SchedulerConfig::default())
}

/// Initialize the thread library with an explicit configuration
///
/// The interrupt gate is left as the caller had it, so initializing inside
/// `without_preemption` keeps preemption off until the caller's guard ends.
pub fn init_with(config: SchedulerConfig) -> ThreadResult<()> {
    config.validate()?;

    let _gate = InterruptGuard::new();
    if !SCHEDULER.with(Cell::get).is_null() {
        return Err(ThreadError::AlreadyInitialized);
    }

    let preemption = config.preemption;
    let raw = Box::into_raw(Box::new(Scheduler::new(config)));
    SCHEDULER.with(|cell| cell.set(raw));

    if let Some(interval) = preemption {
        match PreemptionTimer::arm(interval) {
            Ok(timer) => with_scheduler(|s| s.timer = Some(timer))?,
            Err(err) => {
                drop(take_scheduler());
                return Err(err);
            }
        }
    }

    info!("Thread library initialized: preemption={}", preemption.is_some());
    Ok(())
}

/// Tear down this OS thread's scheduler
///
/// Only thread 0 may shut down, since every other thread runs on a stack the
/// scheduler owns. Threads that have not finished are discarded: unstarted
/// closures are dropped, suspended ones are abandoned mid-flight.
pub fn shutdown() -> ThreadResult<()> {
    let _gate = InterruptGuard::new();
    if with_scheduler(|s| s.running)? != BOOTSTRAP_TID {
        return Err(ThreadError::Invalid);
    }
    if let Some(scheduler) = take_scheduler() {
        let live = scheduler.live_tcbs().count();
        scheduler.teardown();
        info!("Thread library shut down ({} live threads discarded)", live.saturating_sub(1));
    }
    Ok(())
}

// =============================================================================
// THREAD OPERATIONS
// =============================================================================

/// Create a thread running `f` and append it to the ready queue
///
/// Does not yield. Fails with `NoMore` when the table is full and `NoMemory`
/// when the stack cannot be allocated; `f` is dropped in both cases.
pub fn create<F>(f: F) -> ThreadResult<Tid>
where
    F: FnOnce() + 'static,
{
    let _gate = InterruptGuard::new();
    let main = ThreadMain::new(f);
    let tid = with_scheduler(|s| s.spawn(main))??;
    debug!("Thread {} created", tid);
    Ok(tid)
}

/// Identifier of the running thread
///
/// # Panics
/// When the library has not been initialized on this OS thread.
pub fn current_id() -> Tid {
    match running() {
        Ok(tid) => tid,
        Err(_) => panic!("uthreads::current_id called before uthreads::init"),
    }
}

pub(crate) fn running() -> ThreadResult<Tid> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.running)
}

/// Identity of the running thread that survives identifier reuse
pub(crate) fn current_key() -> ThreadResult<ThreadKey> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.current_mut().key())
}

/// Whether `key` still names a live thread
pub(crate) fn is_live(key: ThreadKey) -> ThreadResult<bool> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.is_live(key))
}

/// Give the CPU to `target`
///
/// Returns the identifier of the thread that was switched to, once the
/// caller runs again. `Target::Current` (or the caller's own id) returns
/// immediately.
pub fn yield_to(target: Target) -> ThreadResult<Tid> {
    let _gate = InterruptGuard::new();
    let handoff = with_scheduler(|s| s.plan_yield(target, Reclaim::Now))??;
    // SAFETY: planned just now with the gate closed
    Ok(unsafe { handoff.perform() })
}

/// Yield to the head of the ready queue
pub fn yield_now() -> ThreadResult<Tid> {
    yield_to(Target::Any)
}

/// Involuntary yield driven by the preemption timer
///
/// Skips exit-queue reclamation: freeing memory here could re-enter an
/// allocator the interrupted code was in the middle of.
pub(crate) fn preempt() {
    if let Ok(Ok(handoff)) = with_scheduler(|s| s.plan_preempt()) {
        // SAFETY: planned just now with the gate closed
        unsafe { handoff.perform() };
    }
}

/// Terminate the calling thread
///
/// Wakes every joiner. When no other thread is ready, this is the last
/// runnable thread and the process exits with status 0.
pub fn exit() -> ! {
    let _gate = InterruptGuard::new();
    match with_scheduler(|s| s.plan_exit()) {
        Ok(ExitPlan::Handoff(to)) => {
            // SAFETY: `to` belongs to a live, promoted thread
            unsafe { Context::resume(to) }
        }
        Ok(ExitPlan::Last(tid)) => {
            info!("Thread {} was the last runnable thread; exiting process", tid);
            if let Some(scheduler) = take_scheduler() {
                scheduler.teardown_from(tid);
            }
            std::process::exit(0)
        }
        Err(_) => {
            warn!("exit called without an initialized thread library");
            std::process::exit(0)
        }
    }
}

/// Mark a ready or waiting thread for termination
///
/// The victim exits the next time it is scheduled, without running any more
/// of its own code.
pub fn kill(tid: Tid) -> ThreadResult<Tid> {
    let _gate = InterruptGuard::new();
    let killed = with_scheduler(|s| s.kill(tid))??;
    debug!("Thread {} killed", killed);
    Ok(killed)
}

/// Joiner queue of `tid`, for `join`
pub(crate) fn joiners_of(tid: Tid) -> ThreadResult<Rc<WaitQueue>> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.joiners_of(tid))?
}

// =============================================================================
// INTROSPECTION
// =============================================================================

/// Statistics snapshot of this OS thread's scheduler
pub fn stats() -> ThreadResult<SchedulerStats> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.snapshot())
}

/// State of a live thread; `None` when `tid` is not in use
pub fn state_of(tid: Tid) -> ThreadResult<Option<ThreadState>> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.state_of(tid))
}

/// Every live thread, in identifier order
pub fn threads() -> ThreadResult<Vec<ThreadInfo>> {
    let _gate = InterruptGuard::new();
    with_scheduler(|s| s.thread_infos())
}

/// Whether the exit queue is reclaimed by this yield
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reclaim {
    Now,
    Deferred,
}

/// Outcome of planning an exit
pub(crate) enum ExitPlan {
    /// Continue from this context; the caller's record is on the exit queue
    Handoff(*const Context),
    /// Nothing else can run; carries the caller's id
    Last(Tid),
}
