//! Scheduler Types
//!
//! Process control blocks and the errors process operations report.

use crate::memory::MemoryError;
use bitflags::bitflags;
use thiserror::Error;
use zeitlos_abi::TrapFrame;

/// Capacity of the process table
pub const MAX_PROCS: usize = zeitlos_abi::MAX_PROCS;

/// Process identifier (index into the process table)
pub type Pid = usize;

bitflags! {
    /// Process state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcessFlags: u32 {
        /// Eligible for scheduling
        const ACTIVE = 1 << 0;
        /// Reclaim at the next scheduling pass that reaches this slot
        const DIE = 1 << 1;
    }
}

/// Process control block
///
/// A slot is free when `base == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Process {
    /// Start of the process's memory (also its entry point)
    pub base: u32,

    /// Bytes reserved for code, data and stack
    pub size: u32,

    pub flags: ProcessFlags,

    /// Saved register file; valid while the process is not running
    pub regs: TrapFrame,
}

impl Process {
    /// A free slot
    pub const EMPTY: Self = Self {
        base: 0,
        size: 0,
        flags: ProcessFlags::empty(),
        regs: TrapFrame::zeroed(),
    };

    #[inline]
    pub fn is_free(&self) -> bool {
        self.base == 0
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.flags.contains(ProcessFlags::ACTIVE)
    }

    #[inline]
    pub fn is_dying(&self) -> bool {
        self.flags.contains(ProcessFlags::DIE)
    }

    /// Can the scheduler resume this process
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.is_active() && !self.is_dying()
    }
}

impl Default for Process {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Diagnostic snapshot of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub base: u32,
    pub size: u32,
    pub pc: u32,
    pub sp: u32,
    pub flags: ProcessFlags,
}

/// Process operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("process table full")]
    TableFull,

    #[error("no process with pid {pid}")]
    NoSuchProcess { pid: Pid },

    #[error("process size {size:#x} too large")]
    TooLarge { size: u32 },

    #[error("process memory: {0}")]
    Memory(#[from] MemoryError),
}

pub type Result<T> = core::result::Result<T, ProcessError>;
