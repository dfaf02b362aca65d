/*!
 * Execution Context
 *
 * Saved register snapshots and the switch routines that move the CPU
 * between them. Saving and restoring are fused into one call, so a thread
 * that switches away simply returns from `Context::switch` when it is
 * scheduled again.
 */

mod stack;

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
use self::x86_64 as arch;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
use self::aarch64 as arch;

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
compile_error!("uthreads supports Linux on x86_64 and aarch64 only");

pub(crate) use stack::Stack;

use arch::Registers;

/// First code a fresh thread runs, receiving the two seeded arguments
pub(crate) type Trampoline = extern "C" fn(usize, usize) -> !;

/// Replacement entry point installed by `Context::redirect`
pub(crate) type Entry = extern "C" fn() -> !;

extern "C" {
    fn uthread_switch_context(from: *mut Registers, to: *const Registers);
    fn uthread_restore_context(to: *const Registers) -> !;
}

/// Saved execution state of a suspended thread
#[repr(transparent)]
#[derive(Debug, Default)]
pub(crate) struct Context {
    regs: Registers,
}

impl Context {
    /// Placeholder for a thread that is currently running; filled by the
    /// first `switch` away from it
    pub(crate) const fn empty() -> Self {
        Self {
            regs: Registers::zeroed(),
        }
    }

    /// Snapshot that starts `trampoline(arg0, arg1)` at the top of `stack`
    pub(crate) fn seeded(stack: &Stack, trampoline: Trampoline, arg0: usize, arg1: usize) -> Self {
        // SAFETY: top() bounds a live, writable allocation owned by `stack`
        let regs = unsafe { Registers::fresh(stack.top(), trampoline as usize, arg0, arg1) };
        Self { regs }
    }

    /// Make the next resume of this snapshot enter `entry` instead of
    /// continuing where it stopped
    ///
    /// The saved stack pointer is kept, so `entry` runs on the thread's own
    /// stack with the alignment of a fresh call.
    pub(crate) fn redirect(&mut self, entry: Entry) {
        self.regs.set_instruction_pointer(entry as usize);
    }

    #[inline]
    pub(crate) fn instruction_pointer(&self) -> usize {
        self.regs.instruction_pointer()
    }

    /// Save the caller into `from` and continue from `to`
    ///
    /// Returns when another thread switches or resumes back to `from`.
    ///
    /// # Safety
    /// Both pointers must reference live contexts that stay put until the
    /// caller resumes, and `to` must hold a seeded or previously saved
    /// snapshot whose stack is still allocated.
    #[inline(never)]
    pub(crate) unsafe fn switch(from: *mut Context, to: *const Context) {
        uthread_switch_context(from.cast::<Registers>(), to.cast::<Registers>());
    }

    /// Continue from `to` without saving the caller
    ///
    /// # Safety
    /// Same requirements on `to` as `switch`. Whatever runs on the current
    /// stack is abandoned.
    pub(crate) unsafe fn resume(to: *const Context) -> ! {
        uthread_restore_context(to.cast::<Registers>())
    }
}
