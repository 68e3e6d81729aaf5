//! Kernel configuration and component composition
//!
//! Run-time tunables live in [`KernelConfig`] (all with `const` defaults);
//! the debug console is chosen at compile time through cargo features.

use crate::components::console::Console;
#[cfg(feature = "console-null")]
use crate::components::console::null::{NullConfig, NullConsole};
#[cfg(not(feature = "console-null"))]
use crate::components::console::ns16550::{Ns16550Config, Ns16550Console};
use crate::memory::MemoryConfig;
use crate::scheduler::ProcessConfig;
use zeitlos_abi::hw::UART0_BASE;

/// Kernel tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Region managed by the block allocator
    pub memory: MemoryConfig,

    /// Process memory layout and seeded registers
    pub process: ProcessConfig,

    /// Base of the UART driven by the kernel
    pub uart_base: usize,
}

impl KernelConfig {
    pub const DEFAULT: Self = Self {
        memory: MemoryConfig::DEFAULT,
        process: ProcessConfig::DEFAULT,
        uart_base: UART0_BASE,
    };

    /// Set the address seeded into `ra` of new processes
    pub const fn with_exit_stub(mut self, addr: u32) -> Self {
        self.process.exit_stub = addr;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// The default provisional stack pointer sits at the top of the managed region
static_assertions::const_assert_eq!(
    KernelConfig::DEFAULT.process.initial_sp,
    KernelConfig::DEFAULT.memory.base + KernelConfig::DEFAULT.memory.size
);
static_assertions::const_assert!(
    KernelConfig::DEFAULT.process.stack_reserve % KernelConfig::DEFAULT.memory.alignment == 0
);

/// Console component selection (compile-time)
///
/// - `console-ns16550`: polled 16550 at the system UART (default)
/// - `console-null`: no console output
///
/// `console-null` wins if both are enabled.
#[cfg(not(feature = "console-null"))]
pub static CONSOLE: Ns16550Console = Ns16550Console::new(Ns16550Config {
    mmio_base: UART0_BASE,
});

#[cfg(feature = "console-null")]
pub static CONSOLE: NullConsole = NullConsole::new(NullConfig);

/// Initialize kernel console component
///
/// Must be called early in boot sequence before any debug output.
pub fn init_console() {
    CONSOLE.init();
}

/// Get reference to the global console
pub fn console() -> &'static impl Console {
    &CONSOLE
}
