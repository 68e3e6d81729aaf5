//! Syscall handlers
//!
//! Argument shapes:
//! - UART: `rx_empty`/`tx_full` write `Int32(0|1)`; `getc` writes the byte
//!   as `Int32`, or `Int32(-1)` when nothing is queued; `putc` takes an
//!   `Int32` or `UInt32` byte
//! - Process: `create` takes `UInt32(size)` and writes `UInt32(pid)`;
//!   `start`/`stop`/`kill`/`base` take `UInt32(pid)`, `base` writes
//!   `UInt32(address)`; `dump` fills a caller-built buffer (below)
//! - Memory: `alloc` takes `UInt32(size)` and writes `UInt32(address)`;
//!   `free` takes `UInt32(address)`
//! - `kernel_dump` writes `UInt32(ticks)`
//!
//! Handlers return `RetVal(0)` on success and `RetVal(1)` on failure,
//! except `proc_dump` which returns `UInt32(count)` on success.
//!
//! # Heap ownership
//! Kernel and user code allocate from different heaps. A handler only
//! ever stores scalars into the caller's argument, and refuses an argument
//! that owns heap storage rather than dropping it here. `proc_dump`
//! therefore writes into a `List` of `Map`s the caller allocated: one map
//! per process, each already holding every key of
//! [`PROC_DUMP_KEYS`](zeitlos_abi::PROC_DUMP_KEYS) with a scalar value.

use crate::arch::IrqMask;
use crate::kernel::Kernel;
use crate::scheduler::{Pid, ProcessInfo};
use crate::uart::UartPort;
use zeitlos_abi::{Value, PROC_DUMP_KEYS};

type K<P, M> = Kernel<P, M>;

pub fn hello<P: UartPort, M: IrqMask>(_k: &mut K<P, M>, _arg: &mut Value) -> Value {
    log::info!("[syscall] hello");
    Value::ok()
}

pub fn uart_rx_empty<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    reply(arg, Value::int32(i32::from(k.uart.rx_empty())))
}

pub fn uart_tx_full<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    reply(arg, Value::int32(i32::from(k.uart.tx_full())))
}

pub fn uart_getc<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    // checked before the byte leaves the ring
    if arg.owns_heap() {
        return Value::fail();
    }
    reply(arg, Value::int32(k.uart.get().map_or(-1, i32::from)))
}

pub fn uart_putc<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    let byte = match *arg {
        Value::Int32(c) => c as u8,
        Value::UInt32(c) => c as u8,
        _ => return Value::fail(),
    };
    k.uart.put(byte);
    Value::ok()
}

pub fn proc_create<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    let Some(size) = arg.as_u32() else {
        return Value::fail();
    };
    match k.procs.create(&mut k.memory, size) {
        Ok(pid) => reply(arg, Value::uint32(pid as u32)),
        Err(e) => {
            log::warn!("[syscall] proc_create({:#x}): {}", size, e);
            Value::fail()
        }
    }
}

pub fn proc_start<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    with_pid(arg, |pid| k.procs.start(pid).is_ok())
}

pub fn proc_stop<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    with_pid(arg, |pid| k.procs.stop(pid).is_ok())
}

pub fn proc_kill<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    with_pid(arg, |pid| k.procs.kill(pid).is_ok())
}

pub fn proc_base<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    let Some(pid) = arg.as_u32() else {
        return Value::fail();
    };
    match k.procs.base_of(pid as Pid) {
        Ok(base) => reply(arg, Value::uint32(base)),
        Err(_) => Value::fail(),
    }
}

/// Log the process table and copy it into the caller's dump buffer
///
/// Fails without writing anything if the buffer has fewer prepared
/// entries than there are processes.
pub fn proc_dump<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    let infos = k.procs.dump();
    for info in &infos {
        log::info!(
            " pid: {:2} addr: {:08x} size: {:08x} pc {:08x} sp: {:08x} flags: {:08x}",
            info.pid,
            info.base,
            info.size,
            info.pc,
            info.sp,
            info.flags.bits()
        );
    }

    if !dump_buffer_holds(arg, infos.len()) {
        log::warn!("[syscall] proc_dump: buffer cannot hold {} entries", infos.len());
        return Value::fail();
    }

    for (i, info) in infos.iter().enumerate() {
        let Some(entry) = arg.list_get_mut(i as u32) else {
            return Value::fail();
        };
        if fill_entry(entry, info).is_none() {
            return Value::fail();
        }
    }
    Value::uint32(infos.len() as u32)
}

pub fn kernel_dump<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    reply(arg, Value::uint32(k.dump()))
}

pub fn mem_alloc<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    let Some(size) = arg.as_u32() else {
        return Value::fail();
    };
    match k.memory.alloc(size) {
        Ok(addr) => reply(arg, Value::uint32(addr)),
        Err(_) => Value::fail(),
    }
}

pub fn mem_free<P: UartPort, M: IrqMask>(k: &mut K<P, M>, arg: &mut Value) -> Value {
    match arg.as_u32() {
        Some(addr) if k.memory.free(addr).is_ok() => Value::ok(),
        _ => Value::fail(),
    }
}

/// Store a scalar answer in the caller's argument
fn reply(arg: &mut Value, answer: Value) -> Value {
    if arg.owns_heap() {
        return Value::fail();
    }
    *arg = answer;
    Value::ok()
}

/// Run `op` on a `UInt32` pid argument
fn with_pid(arg: &Value, op: impl FnOnce(Pid) -> bool) -> Value {
    match arg.as_u32() {
        Some(pid) if op(pid as Pid) => Value::ok(),
        _ => Value::fail(),
    }
}

/// The first `count` list slots are maps with a scalar under every key
fn dump_buffer_holds(buf: &Value, count: usize) -> bool {
    (0..count).all(|i| match buf.list_get(i as u32) {
        Some(entry @ Value::Map(_)) => PROC_DUMP_KEYS
            .iter()
            .all(|key| entry.map_find(key).is_some_and(|v| !v.owns_heap())),
        _ => false,
    })
}

fn fill_entry(entry: &mut Value, info: &ProcessInfo) -> Option<()> {
    let fields = [
        info.pid as u32,
        info.base,
        info.size,
        info.pc,
        info.sp,
        info.flags.bits(),
    ];
    for (key, val) in PROC_DUMP_KEYS.iter().zip(fields) {
        *entry.map_find_mut(key)? = Value::uint32(val);
    }
    Some(())
}
