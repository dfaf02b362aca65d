/*!
 * Core Types
 * Thread identifiers, states, yield targets and the raw status codes
 */

use super::errors::{ThreadError, ThreadResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread identifier
///
/// Small non-negative integer, unique among live threads and reused after a
/// thread exits. The bootstrap thread is always 0.
pub type Tid = u32;

/// Raw target code: any ready thread
pub const THREAD_ANY: i32 = -1;
/// Raw target code: the calling thread
pub const THREAD_SELF: i32 = -2;
/// Raw status: invalid thread identifier or argument
pub const THREAD_INVALID: i32 = -3;
/// Raw status: no other thread is ready to run
pub const THREAD_NONE: i32 = -4;
/// Raw status: thread table is full
pub const THREAD_NOMORE: i32 = -5;
/// Raw status: stack allocation failed
pub const THREAD_NOMEMORY: i32 = -6;
/// Raw status: unclassified failure
pub const THREAD_FAILED: i32 = -7;

/// Scheduling state of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    /// Currently executing; exactly one thread at a time
    Running,
    /// Queued on the ready queue
    Ready,
    /// Blocked on a wait queue
    Wait,
    /// Marked for termination; exits the next time it is scheduled
    Killed,
    /// Finished; awaiting reclamation
    Exited,
}

impl ThreadState {
    /// Whether the thread may still be handed the CPU
    #[inline]
    pub fn is_schedulable(self) -> bool {
        matches!(self, ThreadState::Ready | ThreadState::Killed)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadState::Running => "running",
            ThreadState::Ready => "ready",
            ThreadState::Wait => "wait",
            ThreadState::Killed => "killed",
            ThreadState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// Who should run next when yielding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The caller itself (a no-op turn)
    Current,
    /// The head of the ready queue
    Any,
    /// A specific ready thread
    Id(Tid),
}

impl Target {
    /// Parse a raw target code (`THREAD_ANY`, `THREAD_SELF` or an id)
    pub fn from_raw(raw: i32) -> ThreadResult<Self> {
        match raw {
            THREAD_ANY => Ok(Target::Any),
            THREAD_SELF => Ok(Target::Current),
            id if id >= 0 => Ok(Target::Id(id as Tid)),
            _ => Err(ThreadError::Invalid),
        }
    }

    /// Raw code for this target
    pub fn as_raw(self) -> i32 {
        match self {
            Target::Any => THREAD_ANY,
            Target::Current => THREAD_SELF,
            Target::Id(id) => id as i32,
        }
    }
}

impl From<Tid> for Target {
    fn from(id: Tid) -> Self {
        Target::Id(id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Current => f.write_str("self"),
            Target::Any => f.write_str("any"),
            Target::Id(id) => write!(f, "thread {}", id),
        }
    }
}

/// Snapshot of one live thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: Tid,
    pub state: ThreadState,
    /// Zero for the bootstrap thread, which runs on the original stack
    pub stack_size: usize,
}
