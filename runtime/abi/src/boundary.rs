//! Kernel boundary
//!
//! One entry point serves both hardware interrupts and user service
//! requests. Both the interrupt vector and the user-side syscall stubs are
//! written against the [`KernelBoundary`] trait, so the kernel can be
//! injected directly on the host and reached through the control cell on
//! the target.
//!
//! # Branches
//! - Syscall: nonzero identifier plus an argument [`Value`] the handler may
//!   rewrite in place; the returned value carries the outcome.
//! - Interrupt: the [`SyscallId::None`](crate::SyscallId::None) sentinel,
//!   the trap frame of the interrupted process and the pending IRQ lines;
//!   the returned frame is the one to resume into.

use crate::value::Value;
use bitflags::bitflags;

/// Number of saved registers in a trap frame
pub const TRAP_FRAME_WORDS: usize = 32;

/// Saved register file of a preempted process
///
/// Slot 0 holds the program counter (x0 is hardwired to zero on RISC-V, so
/// its slot is free for this). Slots 1 and 2 are the return address and
/// stack pointer, matching the architectural register numbers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame(pub [u32; TRAP_FRAME_WORDS]);

static_assertions::const_assert_eq!(core::mem::size_of::<TrapFrame>(), 128);

impl TrapFrame {
    /// All registers zero
    pub const fn zeroed() -> Self {
        Self([0; TRAP_FRAME_WORDS])
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.0[0]
    }

    #[inline]
    pub fn ra(&self) -> u32 {
        self.0[1]
    }

    #[inline]
    pub fn sp(&self) -> u32 {
        self.0[2]
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u32) {
        self.0[0] = pc;
    }

    #[inline]
    pub fn set_ra(&mut self, ra: u32) {
        self.0[1] = ra;
    }

    #[inline]
    pub fn set_sp(&mut self, sp: u32) {
        self.0[2] = sp;
    }

    /// Raw words, for copying to and from the hardware frame buffer
    pub fn words(&self) -> &[u32; TRAP_FRAME_WORDS] {
        &self.0
    }
}

impl Default for TrapFrame {
    fn default() -> Self {
        Self::zeroed()
    }
}

bitflags! {
    /// Pending interrupt lines, by bit position in the IRQ mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqLines: u32 {
        /// Timer (drives preemption)
        const TIMER = 1 << crate::hw::irq::TIMER;
        /// UART
        const UART = 1 << crate::hw::irq::UART;
        /// Human-interface device
        const HID = 1 << crate::hw::irq::HID;
    }
}

/// The single entry point into kernel logic
pub trait KernelBoundary {
    /// Service request
    ///
    /// Unknown identifiers yield [`Value::fail`]. Handlers may write
    /// results into `arg`.
    fn dispatch(&mut self, id: u32, arg: &mut Value) -> Value;

    /// Interrupt notification
    ///
    /// Returns the register set to resume into. That is `regs` itself
    /// unless the scheduler switched processes.
    fn handle_interrupt(&mut self, regs: TrapFrame, irqs: IrqLines) -> TrapFrame;
}

/// Argument/result pair handed across the raw entry point
///
/// User stubs place the argument in `arg`; the kernel writes the
/// handler's outcome into `ret`.
#[derive(Debug, Default)]
pub struct SyscallFrame {
    pub arg: Value,
    pub ret: Value,
}

impl SyscallFrame {
    pub fn new(arg: Value) -> Self {
        Self {
            arg,
            ret: Value::none(),
        }
    }
}
