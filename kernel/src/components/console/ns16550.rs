//! 16550 console component (minimal)
//!
//! Polled output on the system UART for kernel debug messages. It shares
//! the controller with the interrupt-driven driver in `crate::uart` but
//! never touches its rings: each byte waits for THR to empty and is written
//! directly.

use super::Console;
use core::ptr;
use zeitlos_abi::hw::uart as regs;

/// 16550 console component configuration
#[derive(Clone, Copy)]
pub struct Ns16550Config {
    /// Physical MMIO base address
    pub mmio_base: usize,
}

/// 16550 minimal console (kernel component)
///
/// Does not configure baud rate or framing; the BIOS has already set the
/// line up by the time the kernel runs.
///
/// # Safety
/// This component directly accesses MMIO registers. There is no MMU, so
/// the physical base is used as is.
pub struct Ns16550Console {
    mmio_base: usize,
}

impl Ns16550Console {
    pub const fn new(config: Ns16550Config) -> Self {
        Self {
            mmio_base: config.mmio_base,
        }
    }

    /// Read LSR once to make sure the controller responds
    pub fn init(&self) {
        let _ = self.lsr();
    }

    #[inline]
    fn lsr(&self) -> u8 {
        unsafe { ptr::read_volatile((self.mmio_base + regs::LSR) as *const u8) }
    }
}

impl Console for Ns16550Console {
    fn putc(&self, c: u8) {
        // Wait until the transmit holding register is empty
        while self.lsr() & regs::LSR_THR_EMPTY == 0 {
            core::hint::spin_loop();
        }
        unsafe {
            ptr::write_volatile((self.mmio_base + regs::DATA) as *mut u8, c);
        }
    }
}
