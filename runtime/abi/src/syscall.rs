//! Syscall identifiers
//!
//! Identifiers are a dense enumeration starting at the reserved
//! [`SyscallId::None`] sentinel (0), which marks an interrupt notification
//! rather than a service request. The kernel indexes its handler table
//! directly by this integer.

/// Declare the syscall list
///
/// Generates the `SyscallId` enum (dense, starting at 0), `SYSCALL_COUNT`,
/// and name/number conversions from one declarative list.
macro_rules! define_syscalls {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Syscall identifier
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SyscallId {
            $($variant,)+
        }

        /// Number of identifiers, including the `None` sentinel
        pub const SYSCALL_COUNT: usize = [$(SyscallId::$variant),+].len();

        impl SyscallId {
            /// Every identifier in numeric order
            pub const ALL: [SyscallId; SYSCALL_COUNT] = [$(SyscallId::$variant),+];

            /// Symbolic name, as used in kernel logs
            pub const fn name(self) -> &'static str {
                match self {
                    $(SyscallId::$variant => $name,)+
                }
            }
        }
    };
}

define_syscalls! {
    None => "NONE",
    Hello => "HELLO",
    UartRxEmpty => "UART_RX_EMPTY",
    UartTxFull => "UART_TX_FULL",
    UartGetc => "UART_GETC",
    UartPutc => "UART_PUTC",
    ProcCreate => "PROC_CREATE",
    ProcStart => "PROC_START",
    ProcStop => "PROC_STOP",
    ProcKill => "PROC_KILL",
    ProcBase => "PROC_BASE",
    ProcDump => "PROC_DUMP",
    KernelDump => "KERNEL_DUMP",
    MemAlloc => "MEM_ALLOC",
    MemFree => "MEM_FREE",
}

static_assertions::const_assert!(SYSCALL_COUNT <= 64);

impl SyscallId {
    /// Raw identifier passed through the kernel entry point
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a raw identifier
    ///
    /// Returns `None` for identifiers outside the table.
    pub fn from_u32(raw: u32) -> Option<SyscallId> {
        Self::ALL.get(raw as usize).copied()
    }
}

impl From<SyscallId> for u32 {
    fn from(id: SyscallId) -> u32 {
        id as u32
    }
}
