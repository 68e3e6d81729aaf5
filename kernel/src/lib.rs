//! Zeitlos Microkernel
//!
//! A single-core microkernel for the PicoRV32-based Zeitlos computer. One
//! flat physical address space, no MMU, no trap instruction: user code and
//! the BIOS interrupt vector both enter the kernel through a function
//! pointer published in the control cell at 0x0000000C.
//!
//! # Architecture
//!
//! - `memory`: First-fit block allocator over the managed region
//! - `scheduler`: Process table and timer-driven round-robin switching
//! - `uart`: Interrupt-driven UART with transmit/receive rings
//! - `syscall`: Handler table and the syscall handlers
//! - `kernel`: The [`Kernel`] object tying it together behind
//!   [`KernelBoundary`](zeitlos_abi::KernelBoundary)
//! - `entry`: [`SystemKernel`], the lock and IRQ gate the raw entry
//!   point goes through
//! - `arch`: `maskirq`, the exit stub, and host simulations
//! - `components`, `debug`, `config`: Console, logging, tunables
//!
//! # Testing Strategy
//!
//! Everything except `arch::picorv32` and the bare-metal binary builds on
//! the host. Hardware is replaced by `arch::sim::SimUart` and
//! `arch::sim::SoftIrqMask`.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate alloc;

pub mod arch;
pub mod components;
pub mod config;
pub mod debug;
pub mod entry;
pub mod kernel;
pub mod memory;
pub mod scheduler;
pub mod syscall;
pub mod uart;

pub use config::KernelConfig;
pub use entry::SystemKernel;
pub use kernel::Kernel;
