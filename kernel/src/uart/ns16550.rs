//! 16550 register access
//!
//! The driver talks to the controller through [`UartPort`] so the same
//! code runs against memory-mapped hardware ([`Mmio16550`]) and against
//! the host simulation in `arch::sim`.

use core::ptr;
use zeitlos_abi::hw::uart as regs;

/// 16550 registers (byte-wide, on word-spaced offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartReg {
    /// TX/RX data, or divisor low byte while DLAB is set
    Data,
    /// Interrupt enable, or divisor high byte while DLAB is set
    Ier,
    /// FIFO control on write, interrupt identification on read
    FcrIir,
    Lcr,
    Lsr,
}

impl UartReg {
    pub const fn offset(self) -> usize {
        match self {
            UartReg::Data => regs::DATA,
            UartReg::Ier => regs::IER,
            UartReg::FcrIir => regs::FCR_IIR,
            UartReg::Lcr => regs::LCR,
            UartReg::Lsr => regs::LSR,
        }
    }
}

/// Byte access to a 16550-compatible controller
///
/// Reads take `&mut self` because reading Data or IIR has side effects on
/// the device.
pub trait UartPort {
    fn read(&mut self, reg: UartReg) -> u8;
    fn write(&mut self, reg: UartReg, val: u8);
}

/// Memory-mapped 16550
pub struct Mmio16550 {
    base: usize,
}

impl Mmio16550 {
    /// # Safety
    /// `base` must be the register block of a 16550-compatible UART, and
    /// nothing else may drive it through another handle.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl UartPort for Mmio16550 {
    #[inline]
    fn read(&mut self, reg: UartReg) -> u8 {
        // SAFETY: the constructor guarantees a valid register block.
        unsafe { ptr::read_volatile((self.base + reg.offset()) as *const u8) }
    }

    #[inline]
    fn write(&mut self, reg: UartReg, val: u8) {
        // SAFETY: the constructor guarantees a valid register block.
        unsafe { ptr::write_volatile((self.base + reg.offset()) as *mut u8, val) }
    }
}
