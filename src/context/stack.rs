/*!
 * Thread Stacks
 * Heap-allocated stack regions with an overflow canary at the low end
 */

use crate::core::errors::{ThreadError, ThreadResult};
use crate::core::limits::{STACK_ALIGN, STACK_CANARY};
use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;

/// Owned stack region for one thread
///
/// Stacks grow downward, so the canary at the lowest address is the first
/// word an overflow clobbers.
pub(crate) struct Stack {
    base: NonNull<u8>,
    layout: Layout,
}

impl Stack {
    /// Allocate a stack of `size` bytes
    ///
    /// Fails with `NoMemory` when the allocator refuses or the size cannot
    /// form a valid layout.
    pub(crate) fn new(size: usize) -> ThreadResult<Self> {
        if size < STACK_ALIGN {
            return Err(ThreadError::NoMemory);
        }
        let layout = Layout::from_size_align(size, STACK_ALIGN).map_err(|_| ThreadError::NoMemory)?;
        // SAFETY: layout has a non-zero size
        let base = NonNull::new(unsafe { alloc(layout) }).ok_or(ThreadError::NoMemory)?;
        // SAFETY: base is aligned to STACK_ALIGN and at least 16 bytes long
        unsafe { base.as_ptr().cast::<u64>().write(STACK_CANARY) };
        Ok(Self { base, layout })
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }

    /// One past the highest usable address
    #[inline]
    pub(crate) fn top(&self) -> *mut u8 {
        // SAFETY: stays within (one past the end of) the allocation
        unsafe { self.base.as_ptr().add(self.layout.size()) }
    }

    /// Whether the canary still holds its original value
    #[inline]
    pub(crate) fn is_intact(&self) -> bool {
        // SAFETY: the canary word lies inside the allocation
        unsafe { self.base.as_ptr().cast::<u64>().read_volatile() == STACK_CANARY }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("base", &self.base)
            .field("size", &self.layout.size())
            .finish()
    }
}
