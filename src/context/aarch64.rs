/*!
 * aarch64 Context Switch
 * AAPCS64 callee-saved state plus the two argument registers
 */

use std::arch::global_asm;

/// Register snapshot; field offsets are hard-coded in the assembly below
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(dead_code)]
pub(crate) struct Registers {
    sp: u64,            // 0x00
    x19_x28: [u64; 10], // 0x08
    fp: u64,            // 0x58
    lr: u64,            // 0x60
    pc: u64,            // 0x68
    x0: u64,            // 0x70
    x1: u64,            // 0x78
    d8_d15: [u64; 8],   // 0x80
    fpcr: u64,          // 0xC0
}

impl Registers {
    pub(crate) const fn zeroed() -> Self {
        Self {
            sp: 0,
            x19_x28: [0; 10],
            fp: 0,
            lr: 0,
            pc: 0,
            x0: 0,
            x1: 0,
            d8_d15: [0; 8],
            fpcr: 0,
        }
    }

    /// Snapshot that enters `entry(arg0, arg1)` on a fresh stack
    ///
    /// # Safety
    /// `top` must be the exclusive upper bound of a writable stack region.
    pub(crate) unsafe fn fresh(top: *mut u8, entry: usize, arg0: usize, arg1: usize) -> Self {
        Self {
            sp: ((top as usize) & !0xF) as u64,
            pc: entry as u64,
            x0: arg0 as u64,
            x1: arg1 as u64,
            ..Self::zeroed()
        }
    }

    #[inline]
    pub(crate) fn set_instruction_pointer(&mut self, ip: usize) {
        self.pc = ip as u64;
    }

    #[inline]
    pub(crate) fn instruction_pointer(&self) -> usize {
        self.pc as usize
    }
}

global_asm!(
    ".text",
    ".globl uthread_switch_context",
    ".type uthread_switch_context, %function",
    ".p2align 4",
    "uthread_switch_context:",
    // Save into the context in x0; resuming returns through lr
    "mov x9, sp",
    "str x9, [x0, #0x00]",
    "stp x19, x20, [x0, #0x08]",
    "stp x21, x22, [x0, #0x18]",
    "stp x23, x24, [x0, #0x28]",
    "stp x25, x26, [x0, #0x38]",
    "stp x27, x28, [x0, #0x48]",
    "stp x29, x30, [x0, #0x58]",
    "str x30, [x0, #0x68]",
    "stp d8, d9, [x0, #0x80]",
    "stp d10, d11, [x0, #0x90]",
    "stp d12, d13, [x0, #0xa0]",
    "stp d14, d15, [x0, #0xb0]",
    "mrs x9, fpcr",
    "str x9, [x0, #0xc0]",
    "mov x0, x1",
    // Falls through into the restore half with the target in x0
    ".globl uthread_restore_context",
    ".type uthread_restore_context, %function",
    "uthread_restore_context:",
    "ldr x9, [x0, #0x00]",
    "mov sp, x9",
    "ldp x19, x20, [x0, #0x08]",
    "ldp x21, x22, [x0, #0x18]",
    "ldp x23, x24, [x0, #0x28]",
    "ldp x25, x26, [x0, #0x38]",
    "ldp x27, x28, [x0, #0x48]",
    "ldp x29, x30, [x0, #0x58]",
    "ldp d8, d9, [x0, #0x80]",
    "ldp d10, d11, [x0, #0x90]",
    "ldp d12, d13, [x0, #0xa0]",
    "ldp d14, d15, [x0, #0xb0]",
    "ldr x9, [x0, #0xc0]",
    "msr fpcr, x9",
    "ldr x9, [x0, #0x68]",
    "ldr x1, [x0, #0x78]",
    "ldr x0, [x0, #0x70]",
    "br x9",
    ".size uthread_switch_context, . - uthread_switch_context",
);
