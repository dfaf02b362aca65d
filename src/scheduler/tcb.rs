/*!
 * Thread Control Block
 */

use super::entry::{thread_stub, ThreadMain};
use crate::context::{Context, Stack};
use crate::core::limits::BOOTSTRAP_TID;
use crate::core::types::{ThreadInfo, ThreadState, Tid};
use crate::sync::WaitQueue;
use std::rc::Rc;

/// A thread identifier paired with the serial of the thread that holds it
///
/// Identifiers are reused once a thread exits; serials never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThreadKey {
    pub(crate) tid: Tid,
    pub(crate) serial: u64,
}

/// Per-thread scheduler record
///
/// Always boxed, so the saved context keeps its address while the record
/// moves between the table and the exit queue.
#[derive(Debug)]
pub(crate) struct Tcb {
    pub(crate) id: Tid,
    /// Creation serial; 0 for the bootstrap thread
    pub(crate) serial: u64,
    pub(crate) state: ThreadState,
    pub(crate) context: Context,
    /// `None` for thread 0, which runs on the original OS stack
    pub(crate) stack: Option<Stack>,
    /// Threads blocked in `join` on this one; taken when the thread exits
    pub(crate) joiners: Option<Rc<WaitQueue>>,
    /// Closure not yet claimed by the trampoline
    pub(crate) entry: Option<ThreadMain>,
}

impl Tcb {
    /// Record for the thread that called `init`
    pub(crate) fn bootstrap() -> Box<Self> {
        Box::new(Self {
            id: BOOTSTRAP_TID,
            serial: 0,
            state: ThreadState::Running,
            context: Context::empty(),
            stack: None,
            joiners: Some(Rc::new(WaitQueue::new())),
            entry: None,
        })
    }

    /// Ready-to-run record whose first switch enters the trampoline
    pub(crate) fn spawn(id: Tid, serial: u64, stack: Stack, entry: ThreadMain) -> Box<Self> {
        let (invoke, data) = entry.arguments();
        let context = Context::seeded(&stack, thread_stub, invoke, data);
        Box::new(Self {
            id,
            serial,
            state: ThreadState::Ready,
            context,
            stack: Some(stack),
            joiners: Some(Rc::new(WaitQueue::new())),
            entry: Some(entry),
        })
    }

    #[inline]
    pub(crate) fn key(&self) -> ThreadKey {
        ThreadKey {
            tid: self.id,
            serial: self.serial,
        }
    }

    /// False when the stack canary was overwritten
    #[inline]
    pub(crate) fn stack_intact(&self) -> bool {
        self.stack.as_ref().map_or(true, Stack::is_intact)
    }

    pub(crate) fn info(&self) -> ThreadInfo {
        ThreadInfo {
            id: self.id,
            state: self.state,
            stack_size: self.stack.as_ref().map_or(0, Stack::size),
        }
    }
}
