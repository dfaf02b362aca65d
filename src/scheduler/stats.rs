/*!
 * Scheduler Statistics
 * Track and report scheduler activity and thread table contents
 */

use super::Scheduler;
use crate::core::types::{ThreadInfo, ThreadState, Tid};
use serde::{Deserialize, Serialize};

/// Event counters updated in place by the scheduler
///
/// Plain integers: every update happens with the interrupt gate closed on
/// the scheduler's own OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub created: u64,
    pub exited: u64,
    pub killed: u64,
    pub reclaimed: u64,
    pub context_switches: u64,
    pub preemptions: u64,
    pub panicked: u64,
}

/// Point-in-time scheduler statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Thread that took the snapshot
    pub running: Tid,
    pub live_threads: usize,
    pub ready_threads: usize,
    pub waiting_threads: usize,
    /// Exited threads whose stacks are not reclaimed yet
    pub pending_reclaim: usize,
    pub max_threads: usize,
    pub created: u64,
    pub exited: u64,
    pub killed: u64,
    pub reclaimed: u64,
    pub context_switches: u64,
    pub preemptions: u64,
    pub panicked: u64,
    pub preemption_interval_us: Option<u64>,
}

impl Scheduler {
    pub(super) fn snapshot(&self) -> SchedulerStats {
        let live = self.live_tcbs();
        SchedulerStats {
            running: self.running,
            live_threads: live.clone().count(),
            ready_threads: self.ready.len(),
            waiting_threads: live.filter(|t| t.state == ThreadState::Wait).count(),
            pending_reclaim: self.exited.len(),
            max_threads: self.config.max_threads,
            created: self.counters.created,
            exited: self.counters.exited,
            killed: self.counters.killed,
            reclaimed: self.counters.reclaimed,
            context_switches: self.counters.context_switches,
            preemptions: self.counters.preemptions,
            panicked: self.counters.panicked,
            preemption_interval_us: self
                .timer
                .as_ref()
                .map(|timer| timer.interval().as_micros() as u64),
        }
    }

    pub(super) fn thread_infos(&self) -> Vec<ThreadInfo> {
        self.live_tcbs().map(|tcb| tcb.info()).collect()
    }

    pub(super) fn state_of(&self, tid: Tid) -> Option<ThreadState> {
        self.slot(tid).map(|tcb| tcb.state)
    }
}
