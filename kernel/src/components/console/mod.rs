//! Console component trait
//!
//! Provides a minimal console interface for kernel debug output: blocking,
//! polled, no buffering. Process I/O goes through the interrupt-driven
//! driver in `crate::uart` instead.

use core::fmt;

/// Console trait for kernel debug output
pub trait Console: Send + Sync {
    /// Write a single character to the console
    ///
    /// This is a blocking operation. The implementation should wait for
    /// the hardware to be ready before writing.
    fn putc(&self, c: u8);

    /// Write a string to the console
    ///
    /// Default implementation writes character by character, with a CR
    /// before every LF.
    fn puts(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.putc(b'\r'); // CRLF for terminals
            }
            self.putc(byte);
        }
    }
}

/// Wrapper for using Console with core::fmt::Write
pub struct ConsoleWriter<C: Console + 'static> {
    console: &'static C,
}

impl<C: Console + 'static> ConsoleWriter<C> {
    pub const fn new(console: &'static C) -> Self {
        Self { console }
    }
}

impl<C: Console + 'static> fmt::Write for ConsoleWriter<C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.puts(s);
        Ok(())
    }
}

// Component implementations
pub mod ns16550;
pub mod null;
