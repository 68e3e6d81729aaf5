//! Process management
//!
//! A created process is parked until [`Runtime::proc_start`]; killing one
//! only marks it, and the kernel reclaims its memory on a later timer
//! interrupt.
//!
//! The process dump is copied into a buffer built here, on the user heap:
//! the kernel only overwrites the scalar values already in it.

use crate::syscall::Runtime;
use crate::{Result, SdkError};
use alloc::vec::Vec;
use zeitlos_abi::{KernelBoundary, SyscallId, Value, MAX_PROCS, PROC_DUMP_KEYS};

/// Process identifier (slot index in the kernel's table)
pub type Pid = u32;

/// One occupied slot of the kernel's process table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: Pid,
    pub base: u32,
    pub size: u32,
    pub pc: u32,
    pub sp: u32,
    pub flags: u32,
}

impl ProcessEntry {
    /// Flag bit set while the process is scheduled
    pub const ACTIVE: u32 = 1 << 0;
    /// Flag bit set once the process has been killed
    pub const DIE: u32 = 1 << 1;

    pub fn is_active(&self) -> bool {
        self.flags & Self::ACTIVE != 0
    }

    pub fn is_dying(&self) -> bool {
        self.flags & Self::DIE != 0
    }

    fn from_map(map: &Value) -> Option<Self> {
        let field = |key: &str| map.map_find(key).and_then(Value::as_u32);
        Some(Self {
            pid: field("pid")?,
            base: field("base")?,
            size: field("size")?,
            pc: field("pc")?,
            sp: field("sp")?,
            flags: field("flags")?,
        })
    }
}

impl<B: KernelBoundary> Runtime<B> {
    /// Reserve memory and a slot for a `size`-byte image
    pub fn proc_create(&mut self, size: u32) -> Result<Pid> {
        self.call_u32(SyscallId::ProcCreate, size)
    }

    pub fn proc_start(&mut self, pid: Pid) -> Result<()> {
        self.call_ok(SyscallId::ProcStart, &mut Value::uint32(pid))
    }

    pub fn proc_stop(&mut self, pid: Pid) -> Result<()> {
        self.call_ok(SyscallId::ProcStop, &mut Value::uint32(pid))
    }

    pub fn proc_kill(&mut self, pid: Pid) -> Result<()> {
        self.call_ok(SyscallId::ProcKill, &mut Value::uint32(pid))
    }

    /// Load address of a process image
    pub fn proc_base(&mut self, pid: Pid) -> Result<u32> {
        self.call_u32(SyscallId::ProcBase, pid)
    }

    /// Snapshot of every occupied process slot
    pub fn proc_dump(&mut self) -> Result<Vec<ProcessEntry>> {
        let id = SyscallId::ProcDump;
        let mut buf = dump_buffer()?;

        let ret = self.call(id, &mut buf);
        if ret.is_fail() {
            return Err(SdkError::SyscallFailed { id });
        }
        let unexpected = |v: &Value| SdkError::UnexpectedReply { id, kind: v.kind() };
        let count = ret.as_u32().ok_or_else(|| unexpected(&ret))?;

        (0..count)
            .map(|i| {
                let entry = buf.list_get(i).ok_or_else(|| unexpected(&buf))?;
                ProcessEntry::from_map(entry).ok_or_else(|| unexpected(entry))
            })
            .collect()
    }
}

/// One zeroed entry per process slot
fn dump_buffer() -> Result<Value> {
    let mut buf = Value::list(MAX_PROCS as u32);
    for _ in 0..MAX_PROCS {
        let mut entry = Value::map(PROC_DUMP_KEYS.len() as u32);
        for key in PROC_DUMP_KEYS {
            entry.map_set(key, Value::uint32(0))?;
        }
        buf.list_append(entry)?;
    }
    Ok(buf)
}
