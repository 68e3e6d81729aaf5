//! Integration tests for the complete kernel
//!
//! These tests drive the kernel the way the hardware and user processes
//! do: through `KernelBoundary::dispatch` and `handle_interrupt`, with the
//! UART and IRQ mask simulated.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Mutex;
use zeitlos_abi::cell::serve_raw;
use zeitlos_abi::{CellBoundary, ControlCell, IrqLines, KernelBoundary, SyscallId, TrapFrame, Value};
use zeitlos_kernel::arch::sim::{SimUart, SoftIrqMask};
use zeitlos_kernel::arch::IrqMask;
use zeitlos_kernel::memory::{Block, BlockAllocator, MemoryConfig, MemoryError};
use zeitlos_kernel::scheduler::{ProcessConfig, ProcessError, ProcessTable, MAX_PROCS};
use zeitlos_kernel::uart::UART_FIFO_SIZE;
use zeitlos_kernel::{Kernel, KernelConfig, SystemKernel};

type SimKernel = Kernel<SimUart, SoftIrqMask>;

const REGION_BASE: u32 = 0x4000_0000;
const REGION_SIZE: u32 = 1024 * 1024;

fn booted_kernel() -> SimKernel {
    let mut kernel = Kernel::new(KernelConfig::DEFAULT, SimUart::new(), SoftIrqMask::new());
    kernel.boot(16 * 1024).expect("boot");
    kernel
}

fn allocator() -> BlockAllocator {
    let mut a = BlockAllocator::new(MemoryConfig::DEFAULT);
    a.init();
    a
}

/// Blocks tile the region with no gaps or overlaps, in address order
fn assert_partition(a: &BlockAllocator) {
    let blocks: Vec<Block> = a.blocks().collect();
    let mut expected = REGION_BASE;
    for b in &blocks {
        assert_eq!(b.start, expected);
        expected = b.end();
    }
    assert_eq!(expected, REGION_BASE + REGION_SIZE);
}

fn syscall(kernel: &mut SimKernel, id: SyscallId, arg: &mut Value) -> Value {
    kernel.dispatch(id.as_u32(), arg)
}

fn timer(kernel: &mut SimKernel, regs: TrapFrame) -> TrapFrame {
    kernel.handle_interrupt(regs, IrqLines::TIMER)
}

/// Frame tagged with the pid it belongs to (in a0)
fn frame_for(pid: usize) -> TrapFrame {
    let mut f = TrapFrame::zeroed();
    f.0[10] = 0x1000 + pid as u32;
    f
}

/// Allocator scenario: 1 MiB region, 4 KiB alignment, 32 KiB minimum
#[test]
fn test_allocator_scenario() {
    let mut a = allocator();

    let first = a.alloc(10_000).unwrap();
    assert_eq!(first, REGION_BASE);
    assert_eq!(a.block_at(first).unwrap().size, 32768);

    let second = a.alloc(70_000).unwrap();
    assert_eq!(second, REGION_BASE + 32768);
    assert_eq!(a.block_at(second).unwrap().size, 73728);

    a.free(first).unwrap();
    a.free(second).unwrap();

    let blocks: Vec<Block> = a.blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].start, REGION_BASE);
    assert_eq!(blocks[0].size, REGION_SIZE);
    assert!(!blocks[0].used);
}

/// Mixed alloc/free sequence keeps the list a partition, and live
/// allocations never overlap
#[test]
fn test_allocator_partition_under_churn() {
    let mut a = allocator();
    let sizes = [4096u32, 40_000, 32768, 65536, 12_288, 100_000, 32768, 8192];
    let mut live: Vec<(u32, u32)> = Vec::new();

    for (round, size) in sizes.iter().cycle().take(40).enumerate() {
        match a.alloc(*size) {
            Ok(addr) => {
                let len = a.block_at(addr).unwrap().size;
                for (other, other_len) in &live {
                    assert!(addr + len <= *other || *other + *other_len <= addr);
                }
                live.push((addr, len));
            }
            Err(MemoryError::OutOfMemory { .. }) => {}
            Err(e) => panic!("unexpected {e}"),
        }
        assert_partition(&a);

        if round % 3 == 2 && !live.is_empty() {
            let (addr, _) = live.remove(live.len() / 2);
            a.free(addr).unwrap();
            assert_partition(&a);
        }
    }

    for (addr, _) in live.drain(..) {
        a.free(addr).unwrap();
        assert_partition(&a);
    }
    assert_eq!(a.blocks().count(), 1);
}

/// A free block between two free neighbours merges into one
#[test]
fn test_allocator_coalesce_three() {
    let mut a = allocator();
    let x = a.alloc(32768).unwrap();
    let y = a.alloc(65536).unwrap();
    let z = a.alloc(32768).unwrap();
    let w = a.alloc(32768).unwrap();

    a.free(x).unwrap();
    a.free(z).unwrap();
    a.free(y).unwrap();

    let merged = a.block_at(x).unwrap();
    assert!(!merged.used);
    assert_eq!(merged.size, 32768 + 65536 + 32768);
    assert_eq!(merged.end(), w);
}

/// 16 processes fit; the 17th fails without touching any slot
#[test]
fn test_process_table_capacity() {
    let mut memory = allocator();
    let mut procs = ProcessTable::new(ProcessConfig::DEFAULT);

    for expected in 0..MAX_PROCS {
        assert_eq!(procs.create(&mut memory, 1024).unwrap(), expected);
    }
    let snapshot = procs.dump();
    let used = memory.used_bytes();

    assert_eq!(procs.create(&mut memory, 1024), Err(ProcessError::TableFull));
    assert_eq!(procs.dump(), snapshot);
    assert_eq!(memory.used_bytes(), used);
}

/// Through the syscall boundary: the kernel is process zero, so 15 more fit
#[test]
fn test_proc_create_syscall_capacity() {
    let mut kernel = booted_kernel();
    for expected in 1..MAX_PROCS as u32 {
        let mut arg = Value::uint32(0);
        assert!(syscall(&mut kernel, SyscallId::ProcCreate, &mut arg).is_ok());
        assert_eq!(arg, Value::uint32(expected));
    }
    let mut arg = Value::uint32(0);
    assert!(syscall(&mut kernel, SyscallId::ProcCreate, &mut arg).is_fail());
    assert_eq!(arg, Value::uint32(0));
}

/// Unknown syscall: failure value, no state change
#[test]
fn test_unknown_syscall_leaves_state() {
    let mut kernel = booted_kernel();
    kernel.handle_interrupt(TrapFrame::zeroed(), IrqLines::empty());
    let ticks = kernel.ticks();
    let procs = kernel.processes().dump();

    let mut arg = Value::str("payload");
    let ret = kernel.dispatch(9999, &mut arg);
    assert!(ret.is_fail());
    assert_eq!(ret.retval(), Some(zeitlos_abi::Z_FAIL));
    assert_eq!(arg, Value::str("payload"));
    assert_eq!(kernel.ticks(), ticks);
    assert_eq!(kernel.processes().dump(), procs);
}

/// With k active processes, k timer interrupts visit each exactly once
#[test]
fn test_round_robin_fairness() {
    let mut kernel = booted_kernel();
    for _ in 0..4 {
        let mut arg = Value::uint32(2048);
        syscall(&mut kernel, SyscallId::ProcCreate, &mut arg);
        let mut pid = arg.copy();
        assert!(syscall(&mut kernel, SyscallId::ProcStart, &mut pid).is_ok());
    }
    let k = kernel.processes().active_count();
    assert_eq!(k, 5);

    let mut visited = vec![0u32; MAX_PROCS];
    let mut running = frame_for(0);
    for _ in 0..k {
        running = timer(&mut kernel, running);
        let pid = kernel.processes().current();
        visited[pid] += 1;
        // a fresh process resumes at its base; afterwards tag its frame
        if running.0[10] == 0 {
            assert_eq!(running.pc(), kernel.processes().base_of(pid).unwrap());
            running = frame_for(pid);
        } else {
            assert_eq!(running, frame_for(pid));
        }
    }
    assert_eq!(&visited[..k], &[1, 1, 1, 1, 1]);
    assert_eq!(kernel.processes().current(), 0);
    assert_eq!(running, frame_for(0));
}

/// Killed slot is still occupied until the cursor reaches it
#[test]
fn test_deferred_kill_via_syscalls() {
    let mut kernel = booted_kernel();
    for _ in 0..3 {
        let mut arg = Value::uint32(0);
        syscall(&mut kernel, SyscallId::ProcCreate, &mut arg);
        syscall(&mut kernel, SyscallId::ProcStart, &mut arg);
    }
    let base3 = kernel.processes().base_of(3).unwrap();
    assert!(syscall(&mut kernel, SyscallId::ProcKill, &mut Value::uint32(3)).is_ok());

    // 0 -> 1 -> 2: slot 3 untouched
    let mut regs = frame_for(0);
    regs = timer(&mut kernel, regs);
    regs = timer(&mut kernel, regs);
    assert_eq!(kernel.processes().current(), 2);
    assert!(kernel.processes().base_of(3).is_ok());
    assert!(kernel.memory().block_at(base3).unwrap().used);

    // next pass lands on 3: reclaimed, wraps to 0
    let regs = timer(&mut kernel, regs);
    assert_eq!(kernel.processes().current(), 0);
    assert_eq!(regs, frame_for(0));
    assert!(kernel.processes().base_of(3).is_err());
    assert!(!kernel.memory().block_at(base3).map_or(false, |b| b.used));

    let mut arg = Value::uint32(3);
    assert!(syscall(&mut kernel, SyscallId::ProcBase, &mut arg).is_fail());
}

/// Ticks count every interrupt notification, whatever the lines
#[test]
fn test_ticks_count_interrupts() {
    let mut kernel = booted_kernel();
    let regs = TrapFrame::zeroed();
    kernel.handle_interrupt(regs, IrqLines::TIMER);
    kernel.handle_interrupt(regs, IrqLines::UART);
    kernel.handle_interrupt(regs, IrqLines::HID);
    kernel.handle_interrupt(regs, IrqLines::TIMER | IrqLines::UART);

    let mut arg = Value::none();
    syscall(&mut kernel, SyscallId::KernelDump, &mut arg);
    assert_eq!(arg, Value::uint32(4));
}

/// Output through putc: cut-through, queue, and THRE-driven drain
#[test]
fn test_uart_output_path() {
    let mut kernel = booted_kernel();
    kernel.uart_mut().port_mut().drain(1);

    for b in b"zeitlos" {
        syscall(&mut kernel, SyscallId::UartPutc, &mut Value::uint32(u32::from(*b)));
    }
    assert_eq!(kernel.uart().port().transmitted, b"z");
    assert_eq!(kernel.uart().tx_pending(), 6);

    kernel.uart_mut().port_mut().drain(64);
    kernel.handle_interrupt(TrapFrame::zeroed(), IrqLines::UART);
    assert_eq!(kernel.uart().port().transmitted, b"zeitlos");
    assert_eq!(kernel.uart().port().ier, 0x01);
}

/// tx_full exactly when capacity - 1 bytes are queued
#[test]
fn test_uart_tx_full_boundary() {
    let mut kernel = booted_kernel();
    kernel.uart_mut().port_mut().drain(0);

    let mut flag = Value::none();
    for _ in 0..UART_FIFO_SIZE - 1 {
        syscall(&mut kernel, SyscallId::UartTxFull, &mut flag);
        assert_eq!(flag, Value::int32(0));
        syscall(&mut kernel, SyscallId::UartPutc, &mut Value::int32(0x55));
    }
    syscall(&mut kernel, SyscallId::UartTxFull, &mut flag);
    assert_eq!(flag, Value::int32(1));
}

/// Input: hardware bytes reach getc in order, overflow is dropped
#[test]
fn test_uart_input_path() {
    let mut kernel = booted_kernel();
    let input: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
    kernel.uart_mut().port_mut().receive(&input);
    kernel.handle_interrupt(TrapFrame::zeroed(), IrqLines::UART);

    let mut got = Vec::new();
    loop {
        let mut arg = Value::none();
        syscall(&mut kernel, SyscallId::UartGetc, &mut arg);
        match arg.as_i32() {
            Some(-1) => break,
            Some(c) => got.push(c as u8),
            None => panic!("getc wrote {arg}"),
        }
    }
    assert_eq!(got.len(), UART_FIFO_SIZE - 1);
    assert_eq!(&got[..], &input[..UART_FIFO_SIZE - 1]);
}

/// Memory syscalls share the allocator with the process table
#[test]
fn test_mem_syscalls_share_region() {
    let mut kernel = booted_kernel();
    let mut arg = Value::uint32(50_000);
    assert!(syscall(&mut kernel, SyscallId::MemAlloc, &mut arg).is_ok());
    let addr = arg.as_u32().unwrap();
    let kernel_base = kernel.processes().base_of(0).unwrap();
    assert_eq!(kernel_base, REGION_BASE);
    assert!(addr > kernel_base);

    let mut create = Value::uint32(0);
    syscall(&mut kernel, SyscallId::ProcCreate, &mut create);
    let proc_base = kernel.processes().base_of(1).unwrap();
    assert!(proc_base >= addr + 53_248);

    assert!(syscall(&mut kernel, SyscallId::MemFree, &mut Value::uint32(addr)).is_ok());
}

static SYSTEM: Mutex<Option<SimKernel>> = Mutex::new(None);

unsafe extern "C" fn system_entry(id: u32, regs: *mut u32, irqs: u32) -> *mut u32 {
    let mut guard = SYSTEM.lock().unwrap();
    match guard.as_mut() {
        Some(kernel) => serve_raw(kernel, id, regs, irqs),
        None => regs,
    }
}

/// User code and the interrupt vector reach the kernel through the cell
#[test]
fn test_raw_entry_through_control_cell() {
    *SYSTEM.lock().unwrap() = Some(booted_kernel());

    let mut word: usize = 0;
    // SAFETY: `word` outlives every use of the cell below.
    let cell = unsafe { ControlCell::at(&mut word as *mut usize as usize) };
    let mut sys = CellBoundary::new(cell);
    assert!(sys.dispatch(SyscallId::Hello.as_u32(), &mut Value::none()).is_fail());

    cell.store(Some(system_entry));
    assert!(sys.is_present());

    let mut arg = Value::uint32(4096);
    assert!(sys.dispatch(SyscallId::ProcCreate.as_u32(), &mut arg).is_ok());
    assert_eq!(arg, Value::uint32(1));
    assert!(sys.dispatch(SyscallId::ProcStart.as_u32(), &mut arg).is_ok());

    // timer through the vector: switches from pid 0 to the new process
    let next = sys.handle_interrupt(frame_for(0), IrqLines::TIMER);
    let base = SYSTEM.lock().unwrap().as_ref().unwrap().processes().base_of(1).unwrap();
    assert_eq!(next.pc(), base);

    assert!(sys.dispatch(9999, &mut Value::none()).is_fail());

    let mut ticks = Value::none();
    sys.dispatch(SyscallId::KernelDump.as_u32(), &mut ticks);
    assert_eq!(ticks, Value::uint32(1));

    cell.store(None);
    assert!(!sys.is_present());
    *SYSTEM.lock().unwrap() = None;
}

/// Interrupt controller shared by the entry gate and the kernel's UART
#[derive(Default)]
struct Controller {
    mask: u32,
    pending: u32,
    /// Lines a device raises at the next kernel-side mask change
    raise: u32,
    /// Interrupts the CPU would have taken while the kernel held its lock
    taken_while_locked: u32,
}

#[derive(Clone)]
struct SharedMask {
    ctl: Rc<RefCell<Controller>>,
    kernel_side: bool,
}

impl IrqMask for SharedMask {
    fn swap(&mut self, mask: u32) -> u32 {
        let mut ctl = self.ctl.borrow_mut();
        let previous = core::mem::replace(&mut ctl.mask, mask);
        if self.kernel_side {
            let raised = core::mem::take(&mut ctl.raise);
            ctl.pending |= raised;
            if ctl.pending & !ctl.mask != 0 {
                ctl.taken_while_locked += 1;
            }
        }
        previous
    }
}

/// A timer raised in the middle of a syscall stays pending until the
/// syscall returns and is then delivered, not dropped
#[test]
fn test_timer_during_syscall_is_delivered() {
    let ctl = Rc::new(RefCell::new(Controller::default()));
    let kernel_irq = SharedMask {
        ctl: Rc::clone(&ctl),
        kernel_side: true,
    };
    let mut kernel = Kernel::new(KernelConfig::DEFAULT, SimUart::new(), kernel_irq);
    kernel.boot(16 * 1024).expect("boot");
    let system = SystemKernel::new(kernel);
    let mut gate = SharedMask {
        ctl: Rc::clone(&ctl),
        kernel_side: false,
    };

    let mut arg = Value::uint32(4096);
    assert!(system.syscall(&mut gate, SyscallId::ProcCreate.as_u32(), &mut arg).is_ok());
    assert!(system.syscall(&mut gate, SyscallId::ProcStart.as_u32(), &mut arg).is_ok());

    ctl.borrow_mut().raise = IrqLines::TIMER.bits();
    let mut byte = Value::int32(i32::from(b'z'));
    assert!(system.syscall(&mut gate, SyscallId::UartPutc.as_u32(), &mut byte).is_ok());

    assert_eq!(ctl.borrow().taken_while_locked, 0);
    assert_eq!(ctl.borrow().mask, 0);
    let pending = IrqLines::from_bits_truncate(ctl.borrow().pending);
    assert_eq!(pending, IrqLines::TIMER);

    // unmasked again: the CPU takes the line and the switch happens
    ctl.borrow_mut().pending = 0;
    let next = system.interrupt(frame_for(0), pending);
    let mut k = system.lock();
    assert_eq!(k.ticks(), 1);
    assert_eq!(k.processes().current(), 1);
    assert_eq!(next.pc(), k.processes().base_of(1).unwrap());
    assert_eq!(k.uart().port().transmitted, b"z");

    // bypassing the gate, the same timer fires inside the locked kernel
    ctl.borrow_mut().raise = IrqLines::TIMER.bits();
    k.dispatch(SyscallId::UartPutc.as_u32(), &mut Value::int32(i32::from(b'!')));
    assert!(ctl.borrow().taken_while_locked > 0);
}
