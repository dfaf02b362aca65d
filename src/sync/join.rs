/*!
 * Join
 */

use crate::core::errors::ThreadResult;
use crate::core::types::Tid;
use crate::interrupt::InterruptGuard;
use crate::scheduler::{self, sleep};

/// Block until thread `tid` exits, then return `tid`
///
/// Fails with `Invalid` for the caller's own id or a thread that is not live
/// (never created, or already exited and released). Fails with `NoCandidate`
/// when nothing else can run, since the target could then never finish.
pub fn join(tid: Tid) -> ThreadResult<Tid> {
    let _gate = InterruptGuard::new();
    let joiners = scheduler::joiners_of(tid)?;
    sleep(&joiners)?;
    log::debug!("Joined thread {}", tid);
    Ok(tid)
}
