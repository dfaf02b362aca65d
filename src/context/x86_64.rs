/*!
 * x86_64 Context Switch
 * System V callee-saved state plus the two argument registers
 */

use std::arch::global_asm;

/// Default MXCSR: all exceptions masked, round to nearest
const MXCSR_DEFAULT: u32 = 0x1F80;
/// Default x87 control word: extended precision, exceptions masked
const FPUCW_DEFAULT: u16 = 0x037F;

/// Register snapshot; field offsets are hard-coded in the assembly below
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(dead_code)]
pub(crate) struct Registers {
    rsp: u64,   // 0x00
    rbp: u64,   // 0x08
    rbx: u64,   // 0x10
    r12: u64,   // 0x18
    r13: u64,   // 0x20
    r14: u64,   // 0x28
    r15: u64,   // 0x30
    rip: u64,   // 0x38
    rdi: u64,   // 0x40
    rsi: u64,   // 0x48
    mxcsr: u32, // 0x50
    fpucw: u16, // 0x54
    _pad: u16,
}

impl Registers {
    pub(crate) const fn zeroed() -> Self {
        Self {
            rsp: 0,
            rbp: 0,
            rbx: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rip: 0,
            rdi: 0,
            rsi: 0,
            mxcsr: 0,
            fpucw: 0,
            _pad: 0,
        }
    }

    /// Snapshot that enters `entry(arg0, arg1)` on a fresh stack
    ///
    /// # Safety
    /// `top` must be the exclusive upper bound of a writable stack region.
    pub(crate) unsafe fn fresh(top: *mut u8, entry: usize, arg0: usize, arg1: usize) -> Self {
        // Entry expects rsp = 16n - 8, as if a call had pushed a return address
        let aligned = (top as usize) & !0xF;
        let rsp = aligned - 8;
        (rsp as *mut u64).write(0);
        Self {
            rsp: rsp as u64,
            rip: entry as u64,
            rdi: arg0 as u64,
            rsi: arg1 as u64,
            mxcsr: MXCSR_DEFAULT,
            fpucw: FPUCW_DEFAULT,
            ..Self::zeroed()
        }
    }

    #[inline]
    pub(crate) fn set_instruction_pointer(&mut self, ip: usize) {
        self.rip = ip as u64;
    }

    #[inline]
    pub(crate) fn instruction_pointer(&self) -> usize {
        self.rip as usize
    }
}

global_asm!(
    ".text",
    ".globl uthread_switch_context",
    ".type uthread_switch_context, @function",
    ".p2align 4",
    "uthread_switch_context:",
    // Save into the context in rdi
    "mov [rdi + 0x00], rsp",
    "mov [rdi + 0x08], rbp",
    "mov [rdi + 0x10], rbx",
    "mov [rdi + 0x18], r12",
    "mov [rdi + 0x20], r13",
    "mov [rdi + 0x28], r14",
    "mov [rdi + 0x30], r15",
    "lea rax, [rip + uthread_resume_point]",
    "mov [rdi + 0x38], rax",
    "stmxcsr dword ptr [rdi + 0x50]",
    "fnstcw word ptr [rdi + 0x54]",
    "mov rdi, rsi",
    // Falls through into the restore half with the target in rdi
    ".globl uthread_restore_context",
    ".type uthread_restore_context, @function",
    "uthread_restore_context:",
    "mov rsp, [rdi + 0x00]",
    "mov rbp, [rdi + 0x08]",
    "mov rbx, [rdi + 0x10]",
    "mov r12, [rdi + 0x18]",
    "mov r13, [rdi + 0x20]",
    "mov r14, [rdi + 0x28]",
    "mov r15, [rdi + 0x30]",
    "ldmxcsr dword ptr [rdi + 0x50]",
    "fldcw word ptr [rdi + 0x54]",
    "mov rax, [rdi + 0x38]",
    "mov rsi, [rdi + 0x48]",
    "mov rdi, [rdi + 0x40]",
    "jmp rax",
    // A saved context resumes here and returns to whoever called switch
    "uthread_resume_point:",
    "ret",
    ".size uthread_switch_context, . - uthread_switch_context",
);
