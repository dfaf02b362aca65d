/*!
 * Interrupt Gate
 *
 * Per-OS-thread flag that decides whether the preemption signal may switch
 * threads. Every scheduler operation closes the gate on entry and restores
 * the previous value on exit, which makes the gate the only concurrency
 * control the scheduler internals need.
 *
 * The gate starts open on every OS thread; nothing can preempt until a
 * scheduler arms its timer.
 */

mod timer;

pub(crate) use timer::PreemptionTimer;

use std::sync::atomic::{compiler_fence, AtomicBool, Ordering};
use std::time::{Duration, Instant};

thread_local! {
    static ENABLED: AtomicBool = const { AtomicBool::new(true) };
}

/// Set the gate and return its previous value
///
/// `true` lets the preemption signal switch threads.
#[inline]
pub fn set_enabled(enabled: bool) -> bool {
    compiler_fence(Ordering::SeqCst);
    let previous = ENABLED.with(|flag| flag.swap(enabled, Ordering::SeqCst));
    compiler_fence(Ordering::SeqCst);
    previous
}

/// Whether preemption is currently allowed
#[inline]
pub fn enabled() -> bool {
    ENABLED.with(|flag| flag.load(Ordering::SeqCst))
}

/// Open the gate, returning the previous value
#[inline]
pub fn on() -> bool {
    set_enabled(true)
}

/// Close the gate, returning the previous value
#[inline]
pub fn off() -> bool {
    set_enabled(false)
}

/// Closes the gate for its lifetime and restores the previous value on drop
///
/// Guards nest: an inner guard restores "closed", never "open".
#[must_use = "the gate reopens as soon as the guard is dropped"]
pub struct InterruptGuard {
    previous: bool,
    // !Send: the gate belongs to one OS thread
    _not_send: std::marker::PhantomData<*const ()>,
}

impl InterruptGuard {
    #[inline]
    pub fn new() -> Self {
        Self {
            previous: set_enabled(false),
            _not_send: std::marker::PhantomData,
        }
    }

    /// Gate value that will be restored on drop
    #[inline]
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    #[inline]
    fn drop(&mut self) {
        set_enabled(self.previous);
    }
}

/// Run `f` with preemption disabled
pub fn without_preemption<R>(f: impl FnOnce() -> R) -> R {
    let _gate = InterruptGuard::new();
    f()
}

/// Busy-wait for `duration` without yielding
///
/// With preemption enabled this is where the timer gets to switch threads.
pub fn spin(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[doc(hidden)]
pub fn print_uninterrupted(args: std::fmt::Arguments<'_>) {
    use std::io::Write;

    let _gate = InterruptGuard::new();
    // stdout's lock is re-entrant per OS thread, so two green threads could
    // interleave inside it; the gate above rules that out
    let mut out = std::io::stdout().lock();
    let _ = out.write_fmt(args);
    let _ = out.write_all(b"\n");
}

/// `println!` that cannot be preempted halfway through a line
#[macro_export]
macro_rules! uprintln {
    ($($arg:tt)*) => {
        $crate::interrupt::print_uninterrupted(format_args!($($arg)*))
    };
}
