/*!
 * Scheduler Core Operations
 * Create, yield, exit, kill and teardown planning
 */

use super::entry::{killed_stub, ThreadMain};
use super::tcb::{Tcb, ThreadKey};
use super::{ExitPlan, Reclaim, Scheduler};
use crate::context::{Context, Stack};
use crate::core::config::SchedulerConfig;
use crate::core::errors::{fatal, ThreadError, ThreadResult};
use crate::core::limits::BOOTSTRAP_TID;
use crate::core::types::{Target, ThreadState, Tid};
use crate::sync::WaitQueue;
use std::collections::VecDeque;
use std::rc::Rc;

/// What the caller must do once its scheduler borrow has ended
#[derive(Debug)]
pub(crate) enum Handoff {
    /// Keep running; carries the value to return
    Stay(Tid),
    /// Save into `from`, continue from `to`, and report `next` on return
    Switch {
        from: *mut Context,
        to: *const Context,
        next: Tid,
    },
}

impl Handoff {
    /// Carry out the planned transfer
    ///
    /// # Safety
    /// Must run right after planning, with the gate still closed and no
    /// scheduler borrow alive.
    pub(crate) unsafe fn perform(self) -> Tid {
        match self {
            Handoff::Stay(tid) => tid,
            Handoff::Switch { from, to, next } => {
                Context::switch(from, to);
                next
            }
        }
    }
}

impl Scheduler {
    pub(super) fn new(config: SchedulerConfig) -> Self {
        let capacity = config.max_threads;
        let mut table = Vec::with_capacity(capacity);
        table.resize_with(capacity, || None);
        table[BOOTSTRAP_TID as usize] = Some(Tcb::bootstrap());

        Self {
            table,
            running: BOOTSTRAP_TID,
            ready: VecDeque::with_capacity(capacity),
            exited: VecDeque::with_capacity(capacity),
            counters: Default::default(),
            config,
            timer: None,
        }
    }

    // -------------------------------------------------------------------------
    // Table access
    // -------------------------------------------------------------------------

    #[inline]
    pub(super) fn slot(&self, tid: Tid) -> Option<&Tcb> {
        self.table.get(tid as usize)?.as_deref()
    }

    #[inline]
    fn slot_mut(&mut self, tid: Tid) -> Option<&mut Tcb> {
        self.table.get_mut(tid as usize)?.as_deref_mut()
    }

    /// Record of a thread the caller knows to be live
    pub(super) fn tcb_mut(&mut self, tid: Tid) -> &mut Tcb {
        match self.slot_mut(tid) {
            Some(tcb) => tcb,
            None => fatal("scheduler referenced a thread that is not live"),
        }
    }

    pub(super) fn current_mut(&mut self) -> &mut Tcb {
        let running = self.running;
        self.tcb_mut(running)
    }

    /// Whether the thread `key` names is still live, not a later reuse of its id
    pub(super) fn is_live(&self, key: ThreadKey) -> bool {
        self.slot(key.tid).is_some_and(|tcb| tcb.serial == key.serial)
    }

    pub(super) fn live_tcbs(&self) -> impl Iterator<Item = &Tcb> + Clone + '_ {
        self.table.iter().filter_map(|slot| slot.as_deref())
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    pub(super) fn spawn(&mut self, main: ThreadMain) -> ThreadResult<Tid> {
        let id = self
            .table
            .iter()
            .position(Option::is_none)
            .ok_or(ThreadError::NoMore)? as Tid;
        let stack = Stack::new(self.config.stack_size)?;

        self.counters.created += 1;
        let serial = self.counters.created;
        self.table[id as usize] = Some(Tcb::spawn(id, serial, stack, main));
        self.ready.push_back(id);
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Yield
    // -------------------------------------------------------------------------

    pub(super) fn plan_yield(&mut self, target: Target, reclaim: Reclaim) -> ThreadResult<Handoff> {
        let me = self.running;
        let next = match target {
            Target::Current => return Ok(Handoff::Stay(me)),
            Target::Id(id) if id == me => return Ok(Handoff::Stay(me)),
            Target::Any => self.ready.pop_front().ok_or(ThreadError::NoCandidate)?,
            Target::Id(id) => {
                if self.slot(id).is_none() {
                    return Err(ThreadError::Invalid);
                }
                if self.ready.is_empty() {
                    return Err(ThreadError::NoCandidate);
                }
                // Live but not queued: blocked, so it cannot take the CPU
                let position = self
                    .ready
                    .iter()
                    .position(|&tid| tid == id)
                    .ok_or(ThreadError::Invalid)?;
                match self.ready.remove(position) {
                    Some(tid) => tid,
                    None => fatal("ready queue position vanished"),
                }
            }
        };

        if reclaim == Reclaim::Now {
            self.reclaim_exited();
        }

        let caller = self.current_mut();
        caller.state = ThreadState::Ready;
        let from = Self::save_slot(caller);
        self.ready.push_back(me);
        let to = self.promote(next);
        Ok(Handoff::Switch { from, to, next })
    }

    /// Timer-driven yield; no reclamation, no logging, no allocation
    pub(super) fn plan_preempt(&mut self) -> ThreadResult<Handoff> {
        let handoff = self.plan_yield(Target::Any, Reclaim::Deferred)?;
        self.counters.preemptions += 1;
        Ok(handoff)
    }

    /// Context a suspending thread saves into, after checking its stack
    pub(super) fn save_slot(caller: &mut Tcb) -> *mut Context {
        if !caller.stack_intact() {
            fatal("stack overflow detected on thread switch");
        }
        &mut caller.context
    }

    /// Make `next` the running thread and return its saved context
    ///
    /// A killed thread keeps its state: it only runs the exit path.
    pub(super) fn promote(&mut self, next: Tid) -> *const Context {
        let tcb = self.tcb_mut(next);
        if !tcb.state.is_schedulable() {
            fatal("switching to a thread that is not runnable");
        }
        if tcb.state == ThreadState::Ready {
            tcb.state = ThreadState::Running;
        }
        let to: *const Context = &tcb.context;
        self.running = next;
        self.counters.context_switches += 1;
        to
    }

    /// Free the records and stacks of exited threads
    ///
    /// Only called while running on a stack that is not in the exit queue.
    pub(super) fn reclaim_exited(&mut self) {
        while let Some(tcb) = self.exited.pop_front() {
            if !tcb.stack_intact() {
                fatal("stack overflow detected on reclaim");
            }
            self.counters.reclaimed += 1;
            drop(tcb);
        }
    }

    // -------------------------------------------------------------------------
    // Exit
    // -------------------------------------------------------------------------

    pub(super) fn plan_exit(&mut self) -> ExitPlan {
        let me = self.running;
        let caller = self.current_mut();
        caller.state = ThreadState::Exited;
        if let Some(joiners) = caller.joiners.take() {
            self.wake(&joiners, true);
        }
        self.counters.exited += 1;
        self.reclaim_exited();

        let Some(next) = self.ready.pop_front() else {
            return ExitPlan::Last(me);
        };

        // The identifier is free from here on; the record waits for reclaim
        let record = match self.table[me as usize].take() {
            Some(record) => record,
            None => fatal("running thread missing from the table"),
        };
        if !record.stack_intact() {
            fatal("stack overflow detected on exit");
        }
        self.exited.push_back(record);
        ExitPlan::Handoff(self.promote(next))
    }

    // -------------------------------------------------------------------------
    // Kill / join
    // -------------------------------------------------------------------------

    pub(super) fn kill(&mut self, tid: Tid) -> ThreadResult<Tid> {
        let tcb = self.slot_mut(tid).ok_or(ThreadError::Invalid)?;
        match tcb.state {
            ThreadState::Ready | ThreadState::Wait => {
                tcb.state = ThreadState::Killed;
                let resume_at = tcb.context.instruction_pointer();
                tcb.context.redirect(killed_stub);
                self.counters.killed += 1;
                log::trace!("Thread {} redirected from {:#x} to exit", tid, resume_at);
                Ok(tid)
            }
            ThreadState::Running | ThreadState::Killed | ThreadState::Exited => {
                Err(ThreadError::Invalid)
            }
        }
    }

    pub(super) fn joiners_of(&self, tid: Tid) -> ThreadResult<Rc<WaitQueue>> {
        if tid == self.running {
            return Err(ThreadError::Invalid);
        }
        let tcb = self.slot(tid).ok_or(ThreadError::Invalid)?;
        if tcb.state == ThreadState::Exited {
            return Err(ThreadError::Invalid);
        }
        tcb.joiners.clone().ok_or(ThreadError::Invalid)
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Release everything; the caller is thread 0 on the original stack
    pub(super) fn teardown(mut self: Box<Self>) {
        if let Some(timer) = self.timer.take() {
            timer.disarm();
        }
        self.release_records();
    }

    /// Release everything except the stack `survivor` is running on
    pub(super) fn teardown_from(mut self: Box<Self>, survivor: Tid) {
        if let Some(record) = self.table.get_mut(survivor as usize).and_then(Option::take) {
            // Still executing on this stack until the process exits
            std::mem::forget(record);
        }
        self.teardown();
    }

    fn release_records(&mut self) {
        self.ready.clear();
        let exited = self.exited.drain(..);
        let live = self.table.iter_mut().filter_map(Option::take);
        for mut record in exited.chain(live) {
            // Anyone still blocked in join is discarded along with the table
            if let Some(joiners) = record.joiners.take() {
                joiners.clear();
            }
            drop(record);
        }
    }
}
