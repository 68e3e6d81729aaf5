//! System call wrappers
//!
//! [`Runtime`] owns a kernel boundary and turns the `Value`-in/`Value`-out
//! calling convention into typed results. On the target the boundary is a
//! [`CellBoundary`] over the control cell; in tests it can be the kernel
//! itself.

use crate::{Result, SdkError};
use zeitlos_abi::{CellBoundary, ControlCell, KernelBoundary, SyscallId, Value};

/// User-side handle on the kernel
pub struct Runtime<B: KernelBoundary> {
    boundary: B,
    pub(crate) echo: bool,
}

impl Runtime<CellBoundary> {
    /// Runtime over the system control cell
    ///
    /// # Safety
    /// Only valid on the target, where the control cell is mapped RAM.
    pub unsafe fn system() -> Self {
        Self::new(CellBoundary::new(ControlCell::kernel()))
    }
}

impl<B: KernelBoundary> Runtime<B> {
    /// Wrap a boundary; console echo starts enabled
    pub fn new(boundary: B) -> Self {
        Self {
            boundary,
            echo: true,
        }
    }

    pub fn boundary(&self) -> &B {
        &self.boundary
    }

    pub fn boundary_mut(&mut self) -> &mut B {
        &mut self.boundary
    }

    pub fn into_inner(self) -> B {
        self.boundary
    }

    /// Issue a syscall, returning the kernel's raw answer
    pub fn call(&mut self, id: SyscallId, arg: &mut Value) -> Value {
        let ret = self.boundary.dispatch(id.as_u32(), arg);
        log::trace!("[sdk] {} -> {}", id.name(), ret);
        ret
    }

    /// Issue a syscall that must succeed
    pub(crate) fn call_ok(&mut self, id: SyscallId, arg: &mut Value) -> Result<()> {
        if self.call(id, arg).is_ok() {
            Ok(())
        } else {
            Err(SdkError::SyscallFailed { id })
        }
    }

    /// Issue a syscall that answers with a `UInt32` in its argument
    pub(crate) fn call_u32(&mut self, id: SyscallId, input: u32) -> Result<u32> {
        let mut arg = Value::uint32(input);
        self.call_ok(id, &mut arg)?;
        arg.as_u32().ok_or(SdkError::UnexpectedReply {
            id,
            kind: arg.kind(),
        })
    }

    /// Issue a syscall that answers with an `Int32` in its argument
    pub(crate) fn call_i32(&mut self, id: SyscallId) -> Result<i32> {
        let mut arg = Value::none();
        self.call_ok(id, &mut arg)?;
        arg.as_i32().ok_or(SdkError::UnexpectedReply {
            id,
            kind: arg.kind(),
        })
    }

    /// Ask the kernel to log a greeting
    pub fn hello(&mut self) -> Result<()> {
        self.call_ok(SyscallId::Hello, &mut Value::none())
    }

    /// Interrupts the kernel has serviced since boot
    pub fn kernel_ticks(&mut self) -> Result<u32> {
        self.call_u32(SyscallId::KernelDump, 0)
    }
}
