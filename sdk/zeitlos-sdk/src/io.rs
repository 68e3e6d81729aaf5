//! Console I/O
//!
//! Byte-level access to the kernel's UART queues, plus the line editor and
//! the text writer user programs print through. Output translates `\n` to
//! `\r\n` and waits while the transmit queue is full; `getch` never blocks.

use crate::syscall::Runtime;
use crate::{Result, SdkError};
use alloc::string::String;
use core::fmt;
use zeitlos_abi::{KernelBoundary, SyscallId, Value};

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;
const BS: u8 = 0x08;
const DEL: u8 = 0x7f;

/// Move left, blank the cell, move left again
const ERASE: &[u8] = b"\x1b[D \x1b[D";

impl<B: KernelBoundary> Runtime<B> {
    /// Nothing received yet
    pub fn rx_empty(&mut self) -> Result<bool> {
        Ok(self.call_i32(SyscallId::UartRxEmpty)? != 0)
    }

    /// Transmit queue cannot take another byte
    pub fn tx_full(&mut self) -> Result<bool> {
        Ok(self.call_i32(SyscallId::UartTxFull)? != 0)
    }

    /// Take one received byte, if any
    pub fn getc(&mut self) -> Result<Option<u8>> {
        let c = self.call_i32(SyscallId::UartGetc)?;
        Ok(u8::try_from(c).ok())
    }

    /// Queue one byte without waiting
    ///
    /// The kernel drops the byte if its queue is full.
    pub fn putc(&mut self, byte: u8) -> Result<()> {
        self.call_ok(SyscallId::UartPutc, &mut Value::int32(i32::from(byte)))
    }

    /// Non-blocking read: `None` when nothing is waiting
    pub fn getch(&mut self) -> Result<Option<u8>> {
        if self.rx_empty()? {
            return Ok(None);
        }
        self.getc()
    }

    /// Queue one byte, waiting for room
    pub fn put_byte(&mut self, byte: u8) -> Result<()> {
        while self.tx_full()? {
            core::hint::spin_loop();
        }
        self.putc(byte)
    }

    /// Write raw bytes, translating `\n` to `\r\n`
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            if b == LF {
                self.put_byte(CR)?;
            }
            self.put_byte(b)?;
        }
        Ok(())
    }

    /// Echo typed characters back (the default)
    pub fn echo_on(&mut self) {
        self.echo = true;
    }

    /// Stop echoing, e.g. for password entry
    pub fn echo_off(&mut self) {
        self.echo = false;
    }

    pub fn is_echoing(&self) -> bool {
        self.echo
    }

    /// Read one line into `buf`, blocking until it is complete
    ///
    /// The line ends at CR or LF (not stored) or after `max` characters.
    /// Backspace and DEL remove the last character and erase it on screen.
    /// Returns the number of characters read.
    pub fn read_line(&mut self, buf: &mut String, max: usize) -> Result<usize> {
        buf.clear();
        if max == 0 {
            return Ok(0);
        }

        loop {
            let Some(c) = self.getch()? else {
                core::hint::spin_loop();
                continue;
            };

            match c {
                CR | LF => break,
                BS | DEL => {
                    if buf.pop().is_some() && self.echo {
                        for &b in ERASE {
                            self.put_byte(b)?;
                        }
                    }
                }
                0 => {}
                _ => {
                    if self.echo {
                        self.put_byte(c)?;
                    }
                    buf.push(char::from(c));
                }
            }

            if buf.chars().count() == max {
                break;
            }
        }

        Ok(buf.chars().count())
    }
}

impl<B: KernelBoundary> fmt::Write for Runtime<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes()).map_err(|e: SdkError| {
            log::warn!("[sdk] console write: {}", e);
            fmt::Error
        })
    }
}
