//! Control cell
//!
//! The kernel publishes its raw entry point in a fixed memory word
//! ([`KERNEL_ENTRY_CELL`]). The interrupt vector and every user process
//! call through it; zero means no kernel is present yet.
//!
//! # Raw calling convention
//! `entry(id, regs, irqs) -> regs`
//! - `id == 0`: `regs` points at a 32-word trap frame. The kernel
//!   overwrites it with the frame to resume into.
//! - `id != 0`: `regs` points at a [`SyscallFrame`]. The kernel runs the
//!   handler on `arg` and stores the outcome in `ret`. `ret` must not own
//!   heap storage on entry (the kernel would have to drop it); such a
//!   frame is left untouched.
//!
//! Both sides must be built against this crate so `Value` layouts agree.

use crate::boundary::{IrqLines, KernelBoundary, SyscallFrame, TrapFrame, TRAP_FRAME_WORDS};
use crate::hw::KERNEL_ENTRY_CELL;
use crate::syscall::SyscallId;
use crate::value::Value;
use core::ptr;

/// Raw kernel entry point stored in the control cell
pub type RawEntry = unsafe extern "C" fn(id: u32, regs: *mut u32, irqs: u32) -> *mut u32;

static_assertions::assert_eq_size!(RawEntry, usize);

/// Handle on a control cell
#[derive(Debug, Clone, Copy)]
pub struct ControlCell {
    addr: usize,
}

impl ControlCell {
    /// The system control cell at 0x0000000C
    ///
    /// # Safety
    /// Only valid on the target, where that word is mapped RAM.
    pub const unsafe fn kernel() -> Self {
        Self {
            addr: KERNEL_ENTRY_CELL,
        }
    }

    /// A control cell at an arbitrary word
    ///
    /// # Safety
    /// `addr` must be a valid, word-aligned, writable location for as long
    /// as the handle is used.
    pub const unsafe fn at(addr: usize) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    /// Read the published entry point
    pub fn load(&self) -> Option<RawEntry> {
        // SAFETY: the constructor contract guarantees a valid word.
        let raw = unsafe { ptr::read_volatile(self.addr as *const usize) };
        if raw == 0 {
            None
        } else {
            // SAFETY: only `store` writes nonzero values, and those come
            // from a `RawEntry`.
            Some(unsafe { core::mem::transmute::<usize, RawEntry>(raw) })
        }
    }

    /// Publish (or with `None`, withdraw) the entry point
    pub fn store(&self, entry: Option<RawEntry>) {
        let raw = entry.map_or(0, |f| f as usize);
        // SAFETY: the constructor contract guarantees a valid word.
        unsafe { ptr::write_volatile(self.addr as *mut usize, raw) };
    }
}

/// Serve one raw entry call with a kernel
///
/// Decodes the raw convention and forwards to `kernel`. Returns `regs`.
///
/// # Safety
/// `regs` must be null or point at the structure the convention names for
/// `id`, valid for reads and writes.
pub unsafe fn serve_raw(
    kernel: &mut dyn KernelBoundary,
    id: u32,
    regs: *mut u32,
    irqs: u32,
) -> *mut u32 {
    if regs.is_null() {
        return regs;
    }

    if id == SyscallId::None.as_u32() {
        let words = &mut *(regs as *mut [u32; TRAP_FRAME_WORDS]);
        let next = kernel.handle_interrupt(TrapFrame(*words), IrqLines::from_bits_truncate(irqs));
        *words = next.0;
    } else {
        let frame = &mut *(regs as *mut SyscallFrame);
        if frame.ret.owns_heap() {
            return regs;
        }
        frame.ret = kernel.dispatch(id, &mut frame.arg);
    }
    regs
}

/// Kernel boundary reached through a control cell
///
/// This is how user processes and the interrupt vector see the kernel on
/// the target.
pub struct CellBoundary {
    cell: ControlCell,
}

impl CellBoundary {
    pub fn new(cell: ControlCell) -> Self {
        Self { cell }
    }

    pub fn is_present(&self) -> bool {
        self.cell.load().is_some()
    }
}

impl KernelBoundary for CellBoundary {
    fn dispatch(&mut self, id: u32, arg: &mut Value) -> Value {
        // id 0 would be read as an interrupt by the raw entry
        if id == SyscallId::None.as_u32() {
            return Value::fail();
        }
        let Some(entry) = self.cell.load() else {
            return Value::fail();
        };

        let mut frame = SyscallFrame::new(core::mem::take(arg));
        // SAFETY: the frame outlives the call and matches the convention.
        unsafe {
            entry(id, &mut frame as *mut SyscallFrame as *mut u32, 0);
        }
        *arg = frame.arg;
        frame.ret
    }

    fn handle_interrupt(&mut self, regs: TrapFrame, irqs: IrqLines) -> TrapFrame {
        let Some(entry) = self.cell.load() else {
            return regs;
        };

        let mut frame = regs;
        let buf = frame.0.as_mut_ptr();
        // SAFETY: `buf` is a 32-word frame that outlives the call.
        let out = unsafe { entry(0, buf, irqs.bits()) };
        if !out.is_null() && out != buf {
            // SAFETY: the kernel returned a pointer to a full trap frame.
            unsafe { ptr::copy_nonoverlapping(out, buf, TRAP_FRAME_WORDS) };
        }
        frame
    }
}
