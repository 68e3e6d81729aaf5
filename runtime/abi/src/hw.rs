//! Hardware register map
//!
//! Fixed physical addresses consumed by the kernel. There is no MMU, so
//! these are used directly.

/// Control cell holding the kernel entry point (0 = no kernel)
pub const KERNEL_ENTRY_CELL: usize = 0x0000_000C;

/// Base of the 16550-compatible UART
pub const UART0_BASE: usize = 0xF000_0000;

/// Start of main memory; the kernel image is loaded here
pub const MAIN_MEMORY_BASE: u32 = 0x4000_0000;

/// UART register offsets from [`UART0_BASE`]
pub mod uart {
    /// TX/RX data, or divisor low byte while DLAB is set
    pub const DATA: usize = 0x00;
    /// Interrupt enable, or divisor high byte while DLAB is set
    pub const IER: usize = 0x04;
    /// FIFO control (write) / interrupt identification (read)
    pub const FCR_IIR: usize = 0x08;
    /// Line control
    pub const LCR: usize = 0x0C;
    /// Line status
    pub const LSR: usize = 0x14;

    /// LSR: receive data ready
    pub const LSR_DATA_READY: u8 = 1 << 0;
    /// LSR: transmit holding register empty
    pub const LSR_THR_EMPTY: u8 = 1 << 5;
    /// LSR: error in receive FIFO
    pub const LSR_ERROR: u8 = 1 << 7;

    /// IER: received data available interrupt
    pub const IER_RX: u8 = 1 << 0;
    /// IER: transmit holding register empty interrupt
    pub const IER_THRE: u8 = 1 << 1;

    /// IIR bit 0: set when no interrupt is pending
    pub const IIR_NO_PENDING: u8 = 1 << 0;
    /// Interrupt ids (IIR bits 3:1)
    pub const IID_THRE: u8 = 0x01;
    pub const IID_RX_DATA: u8 = 0x02;
    pub const IID_CHAR_TIMEOUT: u8 = 0x06;

    /// FCR: enable and flush both FIFOs
    pub const FCR_FLUSH: u8 = 0b0000_0111;

    /// LCR: divisor latch access bit
    pub const LCR_DLAB: u8 = 1 << 7;
    /// LCR: 8 data bits, no parity, 1 stop bit
    pub const LCR_8N1: u8 = 0b0000_0011;
}

/// IRQ line numbers (bit positions in the IRQ mask)
pub mod irq {
    pub const TIMER: u32 = 3;
    pub const UART: u32 = 4;
    pub const HID: u32 = 5;
}
