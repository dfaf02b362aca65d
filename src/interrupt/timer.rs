/*!
 * Preemption Timer
 *
 * POSIX interval timer whose SIGALRM is delivered to the OS thread that owns
 * the scheduler. The handler switches threads only while the interrupt gate
 * is open, and never allocates or logs: the interrupted code may be inside
 * the allocator or holding the logger.
 *
 * Code that runs with preemption enabled should wrap allocator-heavy work in
 * `without_preemption`, since a thread preempted while holding the
 * allocator's lock would block every other thread that allocates.
 */

use crate::core::errors::ThreadResult;
use crate::scheduler;
use nix::errno::Errno;
use nix::sys::signal::{
    sigaction, SaFlags, SigAction, SigEvent, SigHandler, SigSet, SigevNotify, Signal,
};
use nix::sys::time::TimeSpec;
use nix::sys::timer::{Expiration, Timer, TimerSetTimeFlags};
use nix::time::ClockId;
use nix::unistd::gettid;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Signal used for preemption ticks
const TICK_SIGNAL: Signal = Signal::SIGALRM;

static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Armed interval timer; disarmed and deleted on drop
pub(crate) struct PreemptionTimer {
    timer: Timer,
    interval: Duration,
}

impl PreemptionTimer {
    /// Install the tick handler (once per process) and start ticking at
    /// `interval` on the calling OS thread
    pub(crate) fn arm(interval: Duration) -> ThreadResult<Self> {
        install_handler()?;

        let event = SigEvent::new(SigevNotify::SigevThreadId {
            signal: TICK_SIGNAL,
            thread_id: gettid().as_raw(),
            si_value: 0,
        });
        let mut timer = Timer::new(ClockId::CLOCK_MONOTONIC, event)?;
        timer.set(
            Expiration::Interval(TimeSpec::from_duration(interval)),
            TimerSetTimeFlags::empty(),
        )?;

        log::info!("Preemption timer armed: interval {:?}", interval);
        Ok(Self { timer, interval })
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop ticking and delete the timer
    pub(crate) fn disarm(mut self) {
        // A zero one-shot expiration disables the timer before it is deleted
        let stop = Expiration::OneShot(TimeSpec::from_duration(Duration::ZERO));
        if let Err(err) = self.timer.set(stop, TimerSetTimeFlags::empty()) {
            log::warn!("Failed to disarm preemption timer: {}", err);
        }
        log::info!("Preemption timer disarmed");
    }
}

impl std::fmt::Debug for PreemptionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreemptionTimer")
            .field("interval", &self.interval)
            .finish()
    }
}

fn install_handler() -> ThreadResult<()> {
    if HANDLER_INSTALLED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Ok(());
    }

    // SA_NODEFER keeps the tick unmasked while a handler runs, so a thread
    // switched to from inside the handler can itself be preempted
    let action = SigAction::new(
        SigHandler::Handler(on_tick),
        SaFlags::SA_RESTART | SaFlags::SA_NODEFER,
        SigSet::empty(),
    );
    // SAFETY: on_tick only touches thread-local state and performs the switch
    if let Err(err) = unsafe { sigaction(TICK_SIGNAL, &action) } {
        HANDLER_INSTALLED.store(false, Ordering::Release);
        return Err(err.into());
    }
    log::debug!("Preemption handler installed for {:?}", TICK_SIGNAL);
    Ok(())
}

extern "C" fn on_tick(_signal: c_int) {
    if !super::enabled() {
        return;
    }
    let saved_errno = Errno::last_raw();
    {
        let _gate = super::InterruptGuard::new();
        scheduler::preempt();
    }
    Errno::set_raw(saved_errno);
}
