//! Kernel components
//!
//! Minimal components built into the kernel and selected at compile time
//! through cargo features.
//!
//! - **console**: polled, blocking byte output for `kprintln!` and the
//!   kernel logger. It bypasses the interrupt-driven UART rings entirely,
//!   so it still works before the UART driver is initialized and from
//!   inside the interrupt path.
//!
//! ```rust,ignore
//! #[cfg(feature = "console-ns16550")]
//! static CONSOLE: Ns16550Console = Ns16550Console::new(Ns16550Config {
//!     mmio_base: 0xF000_0000,
//! });
//! ```

pub mod console;
