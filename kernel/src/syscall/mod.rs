//! System call interface
//!
//! Handlers are plain functions over the kernel and the caller's argument
//! [`Value`]. Each handler reads and writes its own argument shape; the
//! dispatcher only indexes the table by the raw identifier.
//!
//! The table is built from one list pairing each [`SyscallId`] with its
//! handler. Identifiers without an entry (including the `NONE` sentinel)
//! dispatch to failure.

pub mod handlers;

use crate::arch::IrqMask;
use crate::kernel::Kernel;
use crate::uart::UartPort;
use zeitlos_abi::{SyscallId, Value, SYSCALL_COUNT};

/// Syscall handler
pub type Handler<P, M> = fn(&mut Kernel<P, M>, &mut Value) -> Value;

/// Handlers indexed by raw syscall identifier
pub type HandlerTable<P, M> = [Option<Handler<P, M>>; SYSCALL_COUNT];

macro_rules! syscall_table {
    ($($id:ident => $handler:ident),* $(,)?) => {
        /// Build the dispatch table
        pub fn handler_table<P: UartPort, M: IrqMask>() -> HandlerTable<P, M> {
            let mut table: HandlerTable<P, M> = [None; SYSCALL_COUNT];
            $(
                table[SyscallId::$id as usize] = Some(handlers::$handler::<P, M> as Handler<P, M>);
            )*
            table
        }
    };
}

syscall_table! {
    Hello => hello,
    UartRxEmpty => uart_rx_empty,
    UartTxFull => uart_tx_full,
    UartGetc => uart_getc,
    UartPutc => uart_putc,
    ProcCreate => proc_create,
    ProcStart => proc_start,
    ProcStop => proc_stop,
    ProcKill => proc_kill,
    ProcBase => proc_base,
    ProcDump => proc_dump,
    KernelDump => kernel_dump,
    MemAlloc => mem_alloc,
    MemFree => mem_free,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::{SimUart, SoftIrqMask};

    #[test]
    fn test_every_syscall_has_a_handler() {
        let table = handler_table::<SimUart, SoftIrqMask>();
        for id in SyscallId::ALL {
            match id {
                SyscallId::None => assert!(table[id as usize].is_none()),
                _ => assert!(table[id as usize].is_some(), "{} unmapped", id.name()),
            }
        }
    }
}
