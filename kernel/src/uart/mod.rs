//! Interrupt-driven UART driver
//!
//! Transmit and receive each go through a 512-byte [`RingBuffer`]. The
//! interrupt handler moves bytes between the rings and the controller;
//! `put`/`get` only touch the rings (plus one cut-through write when the
//! transmitter is idle).
//!
//! # Concurrency
//! `put` runs with the UART IRQ line masked so the handler never sees a
//! half-updated transmit ring. It adds that line to whatever mask is in
//! force and reinstalls the previous mask afterwards, so it never unmasks
//! a line its caller masked.
//!
//! # Data loss
//! - Bytes put while the transmit ring is full are dropped
//! - Bytes received while the receive ring is full are dropped
//! - A line-status error discards the offending byte
//!
//! None of these are reported to the caller.

pub mod ns16550;
pub mod ring_buffer;

pub use ns16550::{Mmio16550, UartPort, UartReg};
pub use ring_buffer::RingBuffer;

use crate::arch::IrqMask;
use thiserror::Error;
use zeitlos_abi::hw::{irq, uart as regs};

/// Size of each ring (one slot is kept empty)
pub const UART_FIFO_SIZE: usize = 512;

/// UART configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UartError {
    #[error("divisor must be nonzero")]
    ZeroDivisor,
}

pub type Result<T> = core::result::Result<T, UartError>;

/// UART driver over a controller `P`, masking its IRQ through `M`
pub struct Uart<P: UartPort, M: IrqMask> {
    port: P,
    mask: M,
    rx: RingBuffer<UART_FIFO_SIZE>,
    tx: RingBuffer<UART_FIFO_SIZE>,
}

impl<P: UartPort, M: IrqMask> Uart<P, M> {
    pub fn new(port: P, mask: M) -> Self {
        Self {
            port,
            mask,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
        }
    }

    /// Flush the hardware FIFOs and enable the receive interrupt
    pub fn init(&mut self) {
        self.port.write(UartReg::FcrIir, regs::FCR_FLUSH);
        self.port.write(UartReg::Ier, regs::IER_RX);
        log::info!("[uart] initialized");
    }

    /// Program the baud-rate divisor and set 8N1 framing
    pub fn set_divisor(&mut self, divisor: u16) -> Result<()> {
        if divisor == 0 {
            return Err(UartError::ZeroDivisor);
        }
        self.port.write(UartReg::Lcr, regs::LCR_DLAB);
        self.port.write(UartReg::Data, divisor as u8);
        self.port.write(UartReg::Ier, (divisor >> 8) as u8);
        self.port.write(UartReg::Lcr, regs::LCR_8N1);
        Ok(())
    }

    /// Queue a byte for transmission
    ///
    /// Dropped if the transmit ring is full. If the ring was empty and the
    /// transmitter is idle the byte goes straight to the controller;
    /// otherwise the transmit interrupt is enabled to drain it.
    pub fn put(&mut self, byte: u8) {
        let previous = self.mask.mask_lines(1 << irq::UART);

        let was_empty = self.tx.is_empty();
        if self.tx.push(byte) {
            if was_empty && self.thr_empty() {
                if let Some(b) = self.tx.pop() {
                    self.port.write(UartReg::Data, b);
                }
            }

            if !self.tx.is_empty() {
                self.port.write(UartReg::Ier, regs::IER_RX | regs::IER_THRE);
            }
        }

        self.mask.restore(previous);
    }

    /// Take the next received byte
    pub fn get(&mut self) -> Option<u8> {
        self.rx.pop()
    }

    pub fn rx_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn tx_full(&self) -> bool {
        self.tx.is_full()
    }

    /// Bytes waiting to be transmitted
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Service a UART interrupt
    pub fn handle_irq(&mut self) {
        let iir = self.port.read(UartReg::FcrIir);
        if iir & regs::IIR_NO_PENDING != 0 {
            return;
        }

        if self.port.read(UartReg::Lsr) & regs::LSR_ERROR != 0 {
            // reading data clears the error; the byte is discarded
            let _ = self.port.read(UartReg::Data);
            return;
        }

        match (iir >> 1) & 0x07 {
            regs::IID_THRE => {
                while self.thr_empty() {
                    match self.tx.pop() {
                        Some(b) => self.port.write(UartReg::Data, b),
                        None => break,
                    }
                }
                if self.tx.is_empty() {
                    self.port.write(UartReg::Ier, regs::IER_RX);
                }
            }
            regs::IID_RX_DATA | regs::IID_CHAR_TIMEOUT => {
                while self.port.read(UartReg::Lsr) & regs::LSR_DATA_READY != 0 {
                    let b = self.port.read(UartReg::Data);
                    if !self.rx.push(b) {
                        log::trace!("[uart] rx overflow, dropped {:#04x}", b);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn irq_mask(&self) -> &M {
        &self.mask
    }

    fn thr_empty(&mut self) -> bool {
        self.port.read(UartReg::Lsr) & regs::LSR_THR_EMPTY != 0
    }
}
