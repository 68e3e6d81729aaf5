//! Zeitlos User Runtime
//!
//! Safe wrappers for user processes over the kernel boundary.
//!
//! # Modules
//! - [`syscall`]: The [`Runtime`] handle and raw syscall plumbing
//! - [`io`]: Console input and output over the kernel UART queues
//! - [`process`]: Process creation and lifecycle
//! - [`memory`]: Block allocation from the kernel's managed region
//!
//! # Example
//! ```no_run
//! use core::fmt::Write;
//! use zeitlos_sdk::Runtime;
//!
//! // SAFETY: running on the target after the kernel has booted.
//! let mut rt = unsafe { Runtime::system() };
//! writeln!(rt, "hello from user space").ok();
//! let mut line = String::new();
//! rt.read_line(&mut line, 64).ok();
//! ```

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate alloc;

pub mod io;
pub mod memory;
pub mod process;
pub mod syscall;

pub use process::ProcessEntry;
pub use syscall::Runtime;

use thiserror::Error;
use zeitlos_abi::{SyscallId, ValueError, ValueKind};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type for SDK operations
pub type Result<T> = core::result::Result<T, SdkError>;

/// SDK error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SdkError {
    /// The kernel answered `RetVal(1)`, or no kernel is present
    #[error("{} failed", .id.name())]
    SyscallFailed { id: SyscallId },

    /// The kernel wrote an argument of the wrong shape
    #[error("{} returned unexpected {kind}", .id.name())]
    UnexpectedReply { id: SyscallId, kind: ValueKind },

    /// Building a syscall argument failed
    #[error("argument: {0}")]
    Value(#[from] ValueError),
}
