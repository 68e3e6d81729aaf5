//! PicoRV32 specifics
//!
//! The core has no CSR-based interrupt controller. IRQ masking goes through
//! the custom `maskirq` instruction (custom-0 opcode, funct7 = 3), which
//! writes a new mask and returns the old one in a single step.

use super::IrqMask;
use core::arch::asm;

/// The CPU's IRQ mask register
pub struct MaskIrq;

impl IrqMask for MaskIrq {
    #[inline]
    fn swap(&mut self, mask: u32) -> u32 {
        let old: u32;
        // SAFETY: maskirq only touches the IRQ mask register.
        unsafe {
            asm!(
                ".insn r 0x0B, 6, 3, {old}, {new}, x0",
                old = lateout(reg) old,
                new = in(reg) mask,
                options(nomem, nostack),
            );
        }
        old
    }
}

/// Where a process lands if it returns from its entry point
///
/// Its address is seeded into `ra` of every new process. The process
/// stays here until the scheduler switches away; it never resumes.
pub extern "C" fn exit_stub() -> ! {
    crate::kprintln!("PEXIT.");
    loop {
        core::hint::spin_loop();
    }
}
