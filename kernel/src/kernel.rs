//! The kernel object
//!
//! [`Kernel`] owns every piece of kernel state: the block allocator, the
//! process table, the UART driver and the tick counter. It is constructed
//! once at boot and reached only through its [`KernelBoundary`]
//! implementation (directly on the host, through the control cell on the
//! target).

use crate::arch::IrqMask;
use crate::config::KernelConfig;
use crate::memory::BlockAllocator;
use crate::scheduler::{self, Pid, ProcessTable};
use crate::syscall::{self, HandlerTable};
use crate::uart::{Uart, UartPort};
use zeitlos_abi::{IrqLines, KernelBoundary, SyscallId, TrapFrame, Value};

/// Kernel state
pub struct Kernel<P: UartPort, M: IrqMask> {
    config: KernelConfig,
    pub(crate) memory: BlockAllocator,
    pub(crate) procs: ProcessTable,
    pub(crate) uart: Uart<P, M>,

    /// Interrupt notifications seen since boot (wraps)
    ticks: u32,

    handlers: HandlerTable<P, M>,
}

impl<P: UartPort, M: IrqMask> Kernel<P, M> {
    /// Assemble a kernel; nothing is initialized until [`boot`](Self::boot)
    pub fn new(config: KernelConfig, port: P, mask: M) -> Self {
        Self {
            config,
            memory: BlockAllocator::new(config.memory),
            procs: ProcessTable::new(config.process),
            uart: Uart::new(port, mask),
            ticks: 0,
            handlers: syscall::handler_table(),
        }
    }

    /// Bring the kernel up
    ///
    /// Clears the process table, initializes the allocator, creates and
    /// starts process zero for the kernel image (`image_size` bytes plus
    /// stack, placed at the start of the managed region) and initializes
    /// the UART.
    ///
    /// # Errors
    /// Fails if the image does not fit in the managed region.
    pub fn boot(&mut self, image_size: u32) -> scheduler::Result<Pid> {
        self.procs.clear();
        self.memory.init();

        let pid = self.procs.create(&mut self.memory, image_size)?;
        self.procs.start(pid)?;
        log::info!(
            "[sched] process {} (kernel) at {:#010x}",
            pid,
            self.procs.base_of(pid)?
        );

        self.uart.init();
        Ok(pid)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn memory(&self) -> &BlockAllocator {
        &self.memory
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.procs
    }

    pub fn uart(&self) -> &Uart<P, M> {
        &self.uart
    }

    pub fn uart_mut(&mut self) -> &mut Uart<P, M> {
        &mut self.uart
    }

    /// Log the kernel counters and return the tick count
    pub fn dump(&self) -> u32 {
        log::info!("[kernel] kticks: {:08X}", self.ticks);
        self.ticks
    }
}

impl<P: UartPort, M: IrqMask> KernelBoundary for Kernel<P, M> {
    fn dispatch(&mut self, id: u32, arg: &mut Value) -> Value {
        let handler = SyscallId::from_u32(id).and_then(|id| self.handlers[id as usize]);

        match handler {
            Some(handler) => handler(self, arg),
            None => {
                log::warn!("[syscall] unknown syscall id {}", id);
                Value::fail()
            }
        }
    }

    fn handle_interrupt(&mut self, regs: TrapFrame, irqs: IrqLines) -> TrapFrame {
        self.ticks = self.ticks.wrapping_add(1);

        if irqs.contains(IrqLines::UART) {
            self.uart.handle_irq();
        }

        if irqs.contains(IrqLines::TIMER) {
            return self.procs.schedule(&mut self.memory, regs);
        }

        regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::{SimUart, SoftIrqMask};

    fn kernel() -> Kernel<SimUart, SoftIrqMask> {
        let mut k = Kernel::new(KernelConfig::DEFAULT, SimUart::new(), SoftIrqMask::new());
        k.boot(20_000).unwrap();
        k
    }

    #[test]
    fn test_boot_creates_process_zero() {
        let k = kernel();
        let p = k.processes().get(0).unwrap();
        assert_eq!(p.base, 0x4000_0000);
        assert!(p.is_active());
        assert_eq!(k.processes().active_count(), 1);
        assert_eq!(k.uart().port().ier, 0x01);
        assert_eq!(k.ticks(), 0);
    }

    #[test]
    fn test_interrupt_ticks() {
        let mut k = kernel();
        let regs = TrapFrame::zeroed();
        for _ in 0..3 {
            assert_eq!(k.handle_interrupt(regs, IrqLines::empty()), regs);
        }
        assert_eq!(k.ticks(), 3);
        assert_eq!(k.dump(), 3);
    }

    #[test]
    fn test_ticks_wrap() {
        let mut k = kernel();
        k.ticks = u32::MAX;
        k.handle_interrupt(TrapFrame::zeroed(), IrqLines::HID);
        assert_eq!(k.ticks(), 0);
    }

    #[test]
    fn test_timer_with_one_process_keeps_frame() {
        let mut k = kernel();
        let mut regs = TrapFrame::zeroed();
        regs.set_pc(0x4000_0100);
        assert_eq!(k.handle_interrupt(regs, IrqLines::TIMER), regs);
    }

    #[test]
    fn test_uart_line_feeds_receive_ring() {
        let mut k = kernel();
        k.uart_mut().port_mut().receive(b"k");
        k.handle_interrupt(TrapFrame::zeroed(), IrqLines::UART);
        assert_eq!(k.uart_mut().get(), Some(b'k'));
    }

    #[test]
    fn test_unknown_syscall() {
        let mut k = kernel();
        let mut arg = Value::uint32(1);
        assert!(k.dispatch(9999, &mut arg).is_fail());
        assert!(k.dispatch(SyscallId::None.as_u32(), &mut arg).is_fail());
        assert_eq!(arg, Value::uint32(1));
        assert_eq!(k.ticks(), 0);
    }

    #[test]
    fn test_boot_image_too_large() {
        let mut k = Kernel::new(KernelConfig::DEFAULT, SimUart::new(), SoftIrqMask::new());
        assert!(k.boot(4 * 1024 * 1024).is_err());
    }
}
