//! Architecture-specific code
//!
//! - `picorv32`: the `maskirq` instruction and the process exit stub
//!   (riscv32 only)
//! - `sim`: software stand-ins for the UART and IRQ mask, used by host
//!   tests and benchmarks

#[cfg(target_arch = "riscv32")]
pub mod picorv32;

pub mod sim;

/// Global IRQ mask
///
/// A set bit masks (disables) that IRQ line.
pub trait IrqMask {
    /// Install `mask` and return the previous mask
    fn swap(&mut self, mask: u32) -> u32;

    /// Mask `lines` on top of the current mask
    ///
    /// Returns the mask that was in force, for [`restore`](Self::restore).
    /// The current mask is read by installing "all masked", so no line is
    /// ever unmasked in between.
    fn mask_lines(&mut self, lines: u32) -> u32 {
        let previous = self.swap(u32::MAX);
        self.swap(previous | lines);
        previous
    }

    /// Reinstall a mask returned by [`mask_lines`](Self::mask_lines)
    fn restore(&mut self, previous: u32) {
        self.swap(previous);
    }
}
