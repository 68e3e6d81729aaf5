//! Host simulation of the PicoRV32 peripherals
//!
//! [`SimUart`] models the parts of a 16550 the driver depends on: the
//! transmit holding register accepting a limited number of bytes before
//! it reports busy, a receive FIFO fed by the test, the line-status error
//! bit, the divisor latch, and an interrupt-identification register derived
//! from IER and the current state. [`SoftIrqMask`] records every mask the
//! kernel installs.

use super::IrqMask;
use crate::uart::{UartPort, UartReg};
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use zeitlos_abi::hw::uart as regs;

/// Simulated 16550
#[derive(Debug, Default)]
pub struct SimUart {
    /// Bytes the "wire" has received from the kernel
    pub transmitted: Vec<u8>,
    /// Bytes waiting in the hardware receive FIFO
    pub incoming: VecDeque<u8>,
    /// How many more bytes THR will accept before reporting busy
    pub thr_space: usize,
    /// Bytes written while THR was busy
    pub overruns: usize,
    /// Pending line-status error (cleared by reading Data)
    pub error: bool,

    pub ier: u8,
    pub lcr: u8,
    pub fcr: u8,
    pub divisor: u16,
}

impl SimUart {
    /// Idle controller with an empty transmitter
    pub fn new() -> Self {
        Self {
            thr_space: 1,
            ..Self::default()
        }
    }

    /// Simulate the line shifting out: THR can accept `space` more bytes
    pub fn drain(&mut self, space: usize) {
        self.thr_space = space;
    }

    /// Simulate bytes arriving on the line
    pub fn receive(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    fn dlab(&self) -> bool {
        self.lcr & regs::LCR_DLAB != 0
    }

    fn lsr(&self) -> u8 {
        let mut lsr = 0;
        if !self.incoming.is_empty() {
            lsr |= regs::LSR_DATA_READY;
        }
        if self.thr_space > 0 {
            lsr |= regs::LSR_THR_EMPTY;
        }
        if self.error {
            lsr |= regs::LSR_ERROR;
        }
        lsr
    }

    fn iir(&self) -> u8 {
        if self.ier & regs::IER_RX != 0 && !self.incoming.is_empty() {
            regs::IID_RX_DATA << 1
        } else if self.ier & regs::IER_THRE != 0 && self.thr_space > 0 {
            regs::IID_THRE << 1
        } else {
            regs::IIR_NO_PENDING
        }
    }
}

impl UartPort for SimUart {
    fn read(&mut self, reg: UartReg) -> u8 {
        match reg {
            UartReg::Data if self.dlab() => self.divisor as u8,
            UartReg::Data => {
                self.error = false;
                self.incoming.pop_front().unwrap_or(0)
            }
            UartReg::Ier if self.dlab() => (self.divisor >> 8) as u8,
            UartReg::Ier => self.ier,
            UartReg::FcrIir => self.iir(),
            UartReg::Lcr => self.lcr,
            UartReg::Lsr => self.lsr(),
        }
    }

    fn write(&mut self, reg: UartReg, val: u8) {
        match reg {
            UartReg::Data if self.dlab() => {
                self.divisor = (self.divisor & 0xFF00) | u16::from(val);
            }
            UartReg::Data => {
                if self.thr_space > 0 {
                    self.thr_space -= 1;
                    self.transmitted.push(val);
                } else {
                    self.overruns += 1;
                }
            }
            UartReg::Ier if self.dlab() => {
                self.divisor = (self.divisor & 0x00FF) | (u16::from(val) << 8);
            }
            UartReg::Ier => self.ier = val,
            UartReg::FcrIir => {
                self.fcr = val;
                if val & 0b010 != 0 {
                    self.incoming.clear();
                }
            }
            UartReg::Lcr => self.lcr = val,
            UartReg::Lsr => {}
        }
    }
}

/// Software IRQ mask
#[derive(Debug, Default)]
pub struct SoftIrqMask {
    pub mask: u32,
    /// Every mask installed through `swap`, oldest first
    pub history: Vec<u32>,
}

impl SoftIrqMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_masked(&self, line: u32) -> bool {
        self.mask & (1 << line) != 0
    }
}

impl IrqMask for SoftIrqMask {
    fn swap(&mut self, mask: u32) -> u32 {
        self.history.push(mask);
        core::mem::replace(&mut self.mask, mask)
    }
}
