//! Null console component (no output)
//!
//! Selected with `console-null` for builds where debug output is not
//! wanted. Every call compiles to nothing.

use super::Console;

/// Null console configuration (empty - no configuration needed)
#[derive(Clone, Copy)]
pub struct NullConfig;

/// Null console component (no output)
pub struct NullConsole;

impl NullConsole {
    pub const fn new(_config: NullConfig) -> Self {
        Self
    }

    /// Initialize null console (no-op)
    pub fn init(&self) {}
}

impl Console for NullConsole {
    #[inline(always)]
    fn putc(&self, _c: u8) {}

    #[inline(always)]
    fn puts(&self, _s: &str) {}
}
