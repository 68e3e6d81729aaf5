//! Kernel entry gate
//!
//! Syscalls and interrupts arrive through the same raw entry point and
//! both need the kernel lock. A syscall therefore runs with every IRQ line
//! masked: an interrupt raised meanwhile stays pending in the controller
//! and is taken once the syscall reinstalls the caller's mask, by which
//! time the lock is free again. An interrupt that still finds the kernel
//! locked is a bug and is logged.
//!
//! ```rust,ignore
//! static KERNEL: Once<SystemKernel<Mmio16550, MaskIrq>> = Once::new();
//!
//! unsafe extern "C" fn kernel_entry(id: u32, regs: *mut u32, irqs: u32) -> *mut u32 {
//!     match KERNEL.get() {
//!         Some(system) => serve_raw(&mut system.gate(&mut MaskIrq), id, regs, irqs),
//!         None => regs,
//!     }
//! }
//! ```

use crate::arch::IrqMask;
use crate::kernel::Kernel;
use crate::uart::UartPort;
use spin::{Mutex, MutexGuard};
use zeitlos_abi::{IrqLines, KernelBoundary, TrapFrame, Value};

/// The kernel behind its lock
pub struct SystemKernel<P: UartPort, M: IrqMask> {
    kernel: Mutex<Kernel<P, M>>,
}

impl<P: UartPort, M: IrqMask> SystemKernel<P, M> {
    pub fn new(kernel: Kernel<P, M>) -> Self {
        Self {
            kernel: Mutex::new(kernel),
        }
    }

    /// Lock the kernel directly, outside the entry paths
    pub fn lock(&self) -> MutexGuard<'_, Kernel<P, M>> {
        self.kernel.lock()
    }

    /// Run one syscall with every IRQ line masked through `irq`
    ///
    /// Fails without touching `arg` if the kernel is already locked.
    pub fn syscall<G: IrqMask>(&self, irq: &mut G, id: u32, arg: &mut Value) -> Value {
        let previous = irq.mask_lines(u32::MAX);

        let ret = match self.kernel.try_lock() {
            Some(mut kernel) => kernel.dispatch(id, arg),
            None => {
                log::warn!("[entry] syscall {} while kernel busy", id);
                Value::fail()
            }
        };

        irq.restore(previous);
        ret
    }

    /// Service one interrupt, resuming `regs` if the kernel is locked
    pub fn interrupt(&self, regs: TrapFrame, irqs: IrqLines) -> TrapFrame {
        match self.kernel.try_lock() {
            Some(mut kernel) => kernel.handle_interrupt(regs, irqs),
            None => {
                log::error!("[entry] interrupt {:#x} while kernel busy", irqs.bits());
                regs
            }
        }
    }

    /// Boundary view for one raw entry call, masking through `irq`
    pub fn gate<'a, G: IrqMask>(&'a self, irq: &'a mut G) -> Gate<'a, P, M, G> {
        Gate { system: self, irq }
    }
}

/// [`KernelBoundary`] over a [`SystemKernel`] and the IRQ mask its
/// syscalls run under
pub struct Gate<'a, P: UartPort, M: IrqMask, G: IrqMask> {
    system: &'a SystemKernel<P, M>,
    irq: &'a mut G,
}

impl<P: UartPort, M: IrqMask, G: IrqMask> KernelBoundary for Gate<'_, P, M, G> {
    fn dispatch(&mut self, id: u32, arg: &mut Value) -> Value {
        self.system.syscall(self.irq, id, arg)
    }

    fn handle_interrupt(&mut self, regs: TrapFrame, irqs: IrqLines) -> TrapFrame {
        self.system.interrupt(regs, irqs)
    }
}
