//! Memory allocation
//!
//! Blocks come from the same region the kernel loads processes into, so
//! they are rounded up to the kernel's allocation granule.

use crate::syscall::Runtime;
use crate::Result;
use zeitlos_abi::{KernelBoundary, SyscallId, Value};

impl<B: KernelBoundary> Runtime<B> {
    /// Allocate at least `size` bytes, returning the block address
    pub fn mem_alloc(&mut self, size: u32) -> Result<u32> {
        self.call_u32(SyscallId::MemAlloc, size)
    }

    /// Release a block returned by [`Runtime::mem_alloc`]
    pub fn mem_free(&mut self, addr: u32) -> Result<()> {
        self.call_ok(SyscallId::MemFree, &mut Value::uint32(addr))
    }
}
