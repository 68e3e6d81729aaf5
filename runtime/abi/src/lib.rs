//! Zeitlos ABI - the shared contract between the kernel and user code
//!
//! # Purpose
//! Kernel and user processes live in one flat physical address space and
//! reach each other through ordinary calls, not traps. This crate holds
//! everything both sides must agree on.
//!
//! # Modules
//! - [`value`]: The tagged `Value` interchange type and its fixed-capacity tables
//! - [`syscall`]: The dense syscall identifier list
//! - [`boundary`]: The `KernelBoundary` trait, trap frames, IRQ lines
//! - [`cell`]: The control cell at 0x0000000C holding the kernel entry point
//! - [`hw`]: Fixed hardware register map
//!
//! # Testing Strategy
//! - Unit tests: value construction, copy/equal laws, container bounds
//! - Boundary tests: raw entry through a control cell, with and without a
//!   kernel present

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate alloc;

pub mod boundary;
pub mod cell;
pub mod hw;
pub mod syscall;
pub mod value;

pub use boundary::{IrqLines, KernelBoundary, SyscallFrame, TrapFrame};
pub use cell::{CellBoundary, ControlCell, RawEntry};
pub use syscall::{SyscallId, SYSCALL_COUNT};
pub use value::{Table, Value, ValueError, ValueKind};

/// Return code carried by `RetVal` for success
pub const Z_OK: i32 = 0;

/// Return code carried by `RetVal` for failure
pub const Z_FAIL: i32 = 1;

/// Process table capacity
pub const MAX_PROCS: usize = 16;

/// Keys of each entry in the process dump buffer, in table order
pub const PROC_DUMP_KEYS: [&str; 6] = ["pid", "base", "size", "pc", "sp", "flags"];
