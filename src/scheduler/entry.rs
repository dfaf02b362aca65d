/*!
 * Thread Entry
 * Type-erased thread closures and the first code every thread runs
 */

use super::with_scheduler;
use crate::core::errors::fatal;
use crate::interrupt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

/// A thread's closure, erased to a function pointer plus an argument pointer
///
/// Owned by the thread's TCB until the thread starts. Dropping it before then
/// drops the closure without running it.
pub(crate) struct ThreadMain {
    invoke: unsafe fn(*mut ()),
    discard: unsafe fn(*mut ()),
    data: *mut (),
}

impl ThreadMain {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        unsafe fn invoke<F: FnOnce()>(data: *mut ()) {
            let f = Box::from_raw(data.cast::<F>());
            f()
        }

        unsafe fn discard<F>(data: *mut ()) {
            drop(Box::from_raw(data.cast::<F>()));
        }

        Self {
            invoke: invoke::<F>,
            discard: discard::<F>,
            data: Box::into_raw(Box::new(f)).cast::<()>(),
        }
    }

    /// The two values seeded into a fresh context's argument registers
    pub(crate) fn arguments(&self) -> (usize, usize) {
        (self.invoke as usize, self.data as usize)
    }

    /// Hand the closure over to the running trampoline
    fn release(self) {
        mem::forget(self);
    }
}

impl std::fmt::Debug for ThreadMain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadMain").field("data", &self.data).finish()
    }
}

impl Drop for ThreadMain {
    fn drop(&mut self) {
        // SAFETY: data came from Box::into_raw in `new` and was never invoked
        unsafe { (self.discard)(self.data) };
    }
}

/// Trampoline every created thread starts in
///
/// Runs with the gate closed (the switching thread closed it), claims the
/// closure, opens the gate, runs the closure and exits. A panic is contained
/// here so it never unwinds into the switch routine.
pub(super) extern "C" fn thread_stub(invoke: usize, data: usize) -> ! {
    match with_scheduler(|s| s.current_mut().entry.take()) {
        Ok(Some(main)) => main.release(),
        _ => fatal("thread started without a pending entry"),
    }
    interrupt::on();

    // SAFETY: `invoke` is the pointer produced by ThreadMain::arguments
    let invoke: unsafe fn(*mut ()) = unsafe { mem::transmute(invoke) };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| unsafe { invoke(data as *mut ()) }));

    if let Err(payload) = outcome {
        interrupt::without_preemption(|| {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic payload>");
            let _ = with_scheduler(|s| {
                s.counters.panicked += 1;
                log::error!("Thread {} panicked: {}", s.running, message);
            });
        });
    }
    super::exit()
}

/// Entry point installed into a killed thread's context
pub(super) extern "C" fn killed_stub() -> ! {
    super::exit()
}
