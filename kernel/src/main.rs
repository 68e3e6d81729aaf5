#![no_std]
#![no_main]

use core::arch::global_asm;
use core::ptr::addr_of;
use spin::Once;
use zeitlos_abi::cell::serve_raw;
use zeitlos_abi::{CellBoundary, ControlCell, KernelBoundary, RawEntry, SyscallId, Value};
use zeitlos_kernel::arch::picorv32::{self, MaskIrq};
use zeitlos_kernel::uart::Mmio16550;
use zeitlos_kernel::{kprintln, Kernel, KernelConfig, SystemKernel};

/// The kernel instance, published once boot has finished
static KERNEL: Once<SystemKernel<Mmio16550, MaskIrq>> = Once::new();

extern "C" {
    static _image_start: u8;
    static _image_end: u8;
}

// Image entry: the BIOS jumps here after loading the kernel at the start
// of main memory.
global_asm!(
    ".section .text.boot",
    ".global _start",
    "_start:",
    ".option push",
    ".option norelax",
    "    la gp, __global_pointer$",
    ".option pop",
    "    la sp, _stack_top",
    "    la t0, _bss_start",
    "    la t1, _bss_end",
    "1:  bgeu t0, t1, 2f",
    "    sw zero, 0(t0)",
    "    addi t0, t0, 4",
    "    j 1b",
    "2:  call {kmain}",
    "3:  j 3b",
    kmain = sym kmain,
);

extern "C" fn kmain() -> ! {
    zeitlos_kernel::config::init_console();
    // SAFETY: single call during boot, before the control cell is
    // published, so no interrupt can reach the kernel yet.
    unsafe {
        zeitlos_kernel::debug::init_logger();
        zeitlos_kernel::memory::heap::init();
    }

    let entry: RawEntry = kernel_entry;
    kprintln!("\nZEITLOS");
    kprintln!("KENTRY: {:08X}", entry as usize);

    let config = KernelConfig::DEFAULT.with_exit_stub(picorv32::exit_stub as usize as u32);
    // SAFETY: UART0 is the system 16550; the console only polls LSR/Data.
    let port = unsafe { Mmio16550::new(config.uart_base) };
    let mut kernel = Kernel::new(config, port, MaskIrq);

    if let Err(e) = kernel.boot(image_size()) {
        log::error!("[kernel] boot failed: {}", e);
        halt();
    }

    KERNEL.call_once(|| SystemKernel::new(kernel));

    // SAFETY: on the target the control cell is RAM reserved for this word.
    let cell = unsafe { ControlCell::kernel() };
    cell.store(Some(kernel_entry));
    log::info!("[kernel] entry published at {:#010x}", cell.addr());

    // Process zero: echo the console through the same boundary user
    // processes use.
    let mut sys = CellBoundary::new(cell);
    loop {
        let mut arg = Value::none();
        sys.dispatch(SyscallId::UartGetc.as_u32(), &mut arg);
        if let Some(c) = arg.as_i32().filter(|c| *c >= 0) {
            if c == i32::from(b'\r') {
                sys.dispatch(SyscallId::UartPutc.as_u32(), &mut Value::int32(i32::from(b'\n')));
            }
            sys.dispatch(SyscallId::UartPutc.as_u32(), &mut Value::int32(c));
        }
    }
}

/// Raw kernel entry, published in the control cell
///
/// Reached from the BIOS interrupt vector (`id == 0`) and from user
/// syscall stubs. Syscalls run with every IRQ line masked through
/// `maskirq`; interrupts raised meanwhile are taken when they return.
unsafe extern "C" fn kernel_entry(id: u32, regs: *mut u32, irqs: u32) -> *mut u32 {
    match KERNEL.get() {
        Some(system) => serve_raw(&mut system.gate(&mut MaskIrq), id, regs, irqs),
        None => regs,
    }
}

/// Bytes from the start of the image to the end of `.bss`
fn image_size() -> u32 {
    // SAFETY: linker-provided symbols; only their addresses are used.
    unsafe { (addr_of!(_image_end) as usize - addr_of!(_image_start) as usize) as u32 }
}

fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    kprintln!("PANIC: {}", info);
    halt()
}
