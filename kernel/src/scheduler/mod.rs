//! Scheduler - Process Table & Context Switching
//!
//! This module owns the fixed-capacity process table and the round-robin
//! scheduler that runs on every timer interrupt.
//!
//! ## Process Lifecycle
//!
//! - **Free**: `base == 0`
//! - **Created**: memory reserved, registers seeded, not yet `ACTIVE`
//! - **Active**: eligible for scheduling (`start`)
//! - **Parked**: `ACTIVE` cleared by `stop`, memory kept, resumable
//! - **Dying**: `DIE` set by `kill`; the slot is reclaimed when the
//!   scheduler's cursor next lands on it
//!
//! ## Context Switching
//!
//! There is no hardware trap frame layout to follow: the interrupt vector
//! hands the kernel the interrupted register file, and whatever register
//! file the scheduler returns is what the vector restores. Switching is
//! therefore just "save into the current slot, return another slot's".
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pid = procs.create(&mut memory, image_size)?;
//! procs.start(pid)?;
//!
//! // timer interrupt
//! let next = procs.schedule(&mut memory, interrupted);
//! ```

mod types;

pub use types::{
    Pid, Process, ProcessError, ProcessFlags, ProcessInfo, Result, MAX_PROCS,
};

use crate::memory::{align_up, BlockAllocator};
use alloc::vec::Vec;
use zeitlos_abi::TrapFrame;

/// Per-process memory layout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Bytes added to every process for its stack
    pub stack_reserve: u32,

    /// Stack pointer seeded at creation; process startup code replaces it
    pub initial_sp: u32,

    /// Return address seeded at creation, so returning from the entry
    /// point lands in the exit stub
    pub exit_stub: u32,
}

impl ProcessConfig {
    pub const DEFAULT: Self = Self {
        stack_reserve: 8 * 1024,
        initial_sp: 0x4010_0000,
        exit_stub: 0,
    };
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static_assertions::const_assert!(MAX_PROCS >= 2);

/// Fixed-capacity process table with a round-robin cursor
pub struct ProcessTable {
    config: ProcessConfig,
    procs: [Process; MAX_PROCS],

    /// Slot whose registers are live in the CPU
    current: Pid,
}

impl ProcessTable {
    pub const fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            procs: [Process::EMPTY; MAX_PROCS],
            current: 0,
        }
    }

    /// Mark every slot free and reset the cursor
    pub fn clear(&mut self) {
        self.procs = [Process::EMPTY; MAX_PROCS];
        self.current = 0;
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Create a process with room for `size` bytes plus the stack reserve
    ///
    /// Registers are zeroed except pc (the base), ra (the exit stub) and a
    /// provisional sp. The new process is not `ACTIVE` until
    /// [`start`](Self::start).
    ///
    /// # Errors
    /// - [`ProcessError::TableFull`] when every slot is taken; nothing is
    ///   allocated in that case
    /// - [`ProcessError::Memory`] when the allocator cannot place the process
    pub fn create(&mut self, memory: &mut BlockAllocator, size: u32) -> Result<Pid> {
        let pid = self
            .procs
            .iter()
            .position(Process::is_free)
            .ok_or(ProcessError::TableFull)?;

        let total = size
            .checked_add(self.config.stack_reserve)
            .filter(|t| *t <= u32::MAX - memory.alignment())
            .ok_or(ProcessError::TooLarge { size })?;
        let total = align_up(total, memory.alignment());

        let base = memory.alloc(total)?;

        let mut regs = TrapFrame::zeroed();
        regs.set_pc(base);
        regs.set_ra(self.config.exit_stub);
        regs.set_sp(self.config.initial_sp);

        self.procs[pid] = Process {
            base,
            size: total,
            flags: ProcessFlags::empty(),
            regs,
        };

        log::debug!("[sched] created pid {} at {:#010x} ({:#x} bytes)", pid, base, total);
        Ok(pid)
    }

    /// Make a process eligible for scheduling
    pub fn start(&mut self, pid: Pid) -> Result<()> {
        self.slot_mut(pid)?.flags.insert(ProcessFlags::ACTIVE);
        log::debug!("[sched] start pid {}", pid);
        Ok(())
    }

    /// Park a process; its memory and registers are kept
    pub fn stop(&mut self, pid: Pid) -> Result<()> {
        self.slot_mut(pid)?.flags.remove(ProcessFlags::ACTIVE);
        log::debug!("[sched] stop pid {}", pid);
        Ok(())
    }

    /// Mark a process for reclamation
    ///
    /// The slot keeps its memory until the scheduler's cursor reaches it.
    pub fn kill(&mut self, pid: Pid) -> Result<()> {
        self.slot_mut(pid)?.flags.insert(ProcessFlags::DIE);
        log::debug!("[sched] kill pid {} (deferred)", pid);
        Ok(())
    }

    /// Base address of a live process
    pub fn base_of(&self, pid: Pid) -> Result<u32> {
        match self.procs.get(pid) {
            Some(p) if !p.is_free() => Ok(p.base),
            _ => Err(ProcessError::NoSuchProcess { pid }),
        }
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(pid)
    }

    /// Slot whose registers are currently live
    pub fn current(&self) -> Pid {
        self.current
    }

    /// Number of `ACTIVE` slots
    pub fn active_count(&self) -> usize {
        self.procs.iter().filter(|p| p.is_active()).count()
    }

    /// Snapshot of every occupied slot
    pub fn dump(&self) -> Vec<ProcessInfo> {
        self.procs
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_free())
            .map(|(pid, p)| ProcessInfo {
                pid,
                base: p.base,
                size: p.size,
                pc: p.regs.pc(),
                sp: p.regs.sp(),
                flags: p.flags,
            })
            .collect()
    }

    /// Pick the register file to resume after a timer interrupt
    ///
    /// With fewer than two `ACTIVE` processes nothing is switched and
    /// `regs` comes straight back. Otherwise `regs` is saved into the
    /// current slot and the cursor walks forward (wrapping) to the next
    /// runnable slot, reclaiming any `DIE` slot it lands on. The walk is
    /// bounded by the table size; if it comes up empty the interrupted
    /// frame is resumed.
    pub fn schedule(&mut self, memory: &mut BlockAllocator, regs: TrapFrame) -> TrapFrame {
        if self.active_count() < 2 {
            return regs;
        }

        self.procs[self.current].regs = regs;
        let from = self.current;

        for _ in 0..MAX_PROCS {
            self.current = (self.current + 1) % MAX_PROCS;

            if self.procs[self.current].is_dying() {
                self.reclaim(memory, self.current);
                continue;
            }

            if self.procs[self.current].is_runnable() {
                if self.current != from {
                    log::trace!("[sched] switch {} -> {}", from, self.current);
                }
                return self.procs[self.current].regs;
            }
        }

        log::warn!("[sched] no runnable process, resuming pid {}", from);
        regs
    }

    /// Free a dying slot's memory and zero the slot
    fn reclaim(&mut self, memory: &mut BlockAllocator, pid: Pid) {
        let base = self.procs[pid].base;
        if let Err(e) = memory.free(base) {
            log::warn!("[sched] reclaim pid {}: {}", pid, e);
        }
        self.procs[pid] = Process::EMPTY;
        log::debug!("[sched] reclaimed pid {} ({:#010x})", pid, base);
    }

    fn slot_mut(&mut self, pid: Pid) -> Result<&mut Process> {
        match self.procs.get_mut(pid) {
            Some(p) if !p.is_free() => Ok(p),
            _ => Err(ProcessError::NoSuchProcess { pid }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConfig;

    const EXIT_STUB: u32 = 0x4000_0040;

    fn setup() -> (ProcessTable, BlockAllocator) {
        let mut memory = BlockAllocator::new(MemoryConfig::DEFAULT);
        memory.init();
        let procs = ProcessTable::new(ProcessConfig {
            exit_stub: EXIT_STUB,
            ..ProcessConfig::DEFAULT
        });
        (procs, memory)
    }

    /// Frame that identifies which process it came from
    fn frame_of(pid: Pid) -> TrapFrame {
        let mut f = TrapFrame::zeroed();
        f.0[10] = pid as u32;
        f
    }

    #[test]
    fn test_create_seeds_registers() {
        let (mut procs, mut memory) = setup();
        let pid = procs.create(&mut memory, 1000).unwrap();
        assert_eq!(pid, 0);

        let p = procs.get(pid).unwrap();
        assert_eq!(p.base, 0x4000_0000);
        // 1000 + 8 KiB stack, aligned
        assert_eq!(p.size, 12288);
        assert_eq!(p.regs.pc(), p.base);
        assert_eq!(p.regs.ra(), EXIT_STUB);
        assert_eq!(p.regs.sp(), 0x4010_0000);
        assert!(p.regs.0[3..].iter().all(|r| *r == 0));
        assert!(!p.is_active());
        assert_eq!(procs.active_count(), 0);
    }

    #[test]
    fn test_start_stop() {
        let (mut procs, mut memory) = setup();
        let pid = procs.create(&mut memory, 0).unwrap();
        procs.start(pid).unwrap();
        assert_eq!(procs.active_count(), 1);
        procs.stop(pid).unwrap();
        assert_eq!(procs.active_count(), 0);
        // memory still held
        assert_eq!(procs.base_of(pid).unwrap(), 0x4000_0000);
        assert!(memory.block_at(0x4000_0000).unwrap().used);
    }

    #[test]
    fn test_operations_on_free_slot() {
        let (mut procs, _memory) = setup();
        assert_eq!(procs.start(3), Err(ProcessError::NoSuchProcess { pid: 3 }));
        assert_eq!(procs.stop(3), Err(ProcessError::NoSuchProcess { pid: 3 }));
        assert_eq!(procs.kill(3), Err(ProcessError::NoSuchProcess { pid: 3 }));
        assert_eq!(procs.base_of(99), Err(ProcessError::NoSuchProcess { pid: 99 }));
    }

    #[test]
    fn test_table_full_does_not_allocate() {
        let (mut procs, mut memory) = setup();
        for i in 0..MAX_PROCS {
            assert_eq!(procs.create(&mut memory, 0).unwrap(), i);
        }
        let used = memory.used_bytes();
        let before = procs.dump();

        assert_eq!(procs.create(&mut memory, 0), Err(ProcessError::TableFull));
        assert_eq!(memory.used_bytes(), used);
        assert_eq!(procs.dump(), before);
    }

    #[test]
    fn test_create_out_of_memory() {
        let (mut procs, mut memory) = setup();
        let err = procs.create(&mut memory, 2 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, ProcessError::Memory(_)));
        assert_eq!(
            procs.create(&mut memory, u32::MAX),
            Err(ProcessError::TooLarge { size: u32::MAX })
        );
        assert!(procs.dump().is_empty());
    }

    #[test]
    fn test_single_process_is_not_switched() {
        let (mut procs, mut memory) = setup();
        let pid = procs.create(&mut memory, 0).unwrap();
        procs.start(pid).unwrap();

        let regs = frame_of(42);
        assert_eq!(procs.schedule(&mut memory, regs), regs);
        // nothing saved
        assert_eq!(procs.get(pid).unwrap().regs.0[10], 0);
    }

    #[test]
    fn test_round_robin() {
        let (mut procs, mut memory) = setup();
        for _ in 0..3 {
            let pid = procs.create(&mut memory, 0).unwrap();
            procs.start(pid).unwrap();
        }

        // pid 0 running
        let next = procs.schedule(&mut memory, frame_of(0));
        assert_eq!(procs.current(), 1);
        assert_eq!(next.pc(), procs.base_of(1).unwrap());

        procs.schedule(&mut memory, frame_of(1));
        assert_eq!(procs.current(), 2);

        // wraps, and pid 0 resumes with its saved frame
        let next = procs.schedule(&mut memory, frame_of(2));
        assert_eq!(procs.current(), 0);
        assert_eq!(next, frame_of(0));
    }

    #[test]
    fn test_skips_parked_slots() {
        let (mut procs, mut memory) = setup();
        for _ in 0..4 {
            let pid = procs.create(&mut memory, 0).unwrap();
            procs.start(pid).unwrap();
        }
        procs.stop(1).unwrap();
        procs.stop(2).unwrap();

        procs.schedule(&mut memory, frame_of(0));
        assert_eq!(procs.current(), 3);
    }

    #[test]
    fn test_deferred_kill() {
        let (mut procs, mut memory) = setup();
        for _ in 0..4 {
            let pid = procs.create(&mut memory, 0).unwrap();
            procs.start(pid).unwrap();
        }
        let doomed = procs.base_of(2).unwrap();
        procs.kill(2).unwrap();

        // cursor has not reached 2 yet: still occupied
        procs.schedule(&mut memory, frame_of(0));
        assert_eq!(procs.current(), 1);
        assert!(!procs.get(2).unwrap().is_free());
        assert!(memory.block_at(doomed).unwrap().used);

        // lands on 2: reclaimed, skipped
        procs.schedule(&mut memory, frame_of(1));
        assert_eq!(procs.current(), 3);
        assert!(procs.get(2).unwrap().is_free());
        assert_eq!(procs.get(2).unwrap().flags, ProcessFlags::empty());
        assert!(!memory.block_at(doomed).map_or(false, |b| b.used));
        assert_eq!(procs.active_count(), 3);
    }

    #[test]
    fn test_kill_not_reclaimed_without_switch() {
        let (mut procs, mut memory) = setup();
        let pid = procs.create(&mut memory, 0).unwrap();
        procs.start(pid).unwrap();
        procs.kill(pid).unwrap();

        let regs = frame_of(0);
        assert_eq!(procs.schedule(&mut memory, regs), regs);
        assert!(!procs.get(pid).unwrap().is_free());
    }

    #[test]
    fn test_no_runnable_resumes_interrupted() {
        let (mut procs, mut memory) = setup();
        for _ in 0..2 {
            let pid = procs.create(&mut memory, 0).unwrap();
            procs.start(pid).unwrap();
        }
        procs.kill(0).unwrap();
        procs.kill(1).unwrap();

        // both ACTIVE but dying: cursor reclaims 1, then 0
        let regs = frame_of(0);
        assert_eq!(procs.schedule(&mut memory, regs), regs);
        assert!(procs.dump().is_empty());
        assert_eq!(memory.blocks().count(), 1);
    }

    #[test]
    fn test_slot_reuse_after_reclaim() {
        let (mut procs, mut memory) = setup();
        for _ in 0..3 {
            let pid = procs.create(&mut memory, 0).unwrap();
            procs.start(pid).unwrap();
        }
        procs.kill(1).unwrap();
        procs.schedule(&mut memory, frame_of(0));
        assert!(procs.get(1).unwrap().is_free());

        assert_eq!(procs.create(&mut memory, 0).unwrap(), 1);
    }

    #[test]
    fn test_dump() {
        let (mut procs, mut memory) = setup();
        procs.create(&mut memory, 0).unwrap();
        let pid = procs.create(&mut memory, 0).unwrap();
        procs.start(pid).unwrap();

        let dump = procs.dump();
        assert_eq!(dump.len(), 2);
        assert_eq!(dump[1].pid, 1);
        assert_eq!(dump[1].pc, dump[1].base);
        assert_eq!(dump[1].sp, 0x4010_0000);
        assert_eq!(dump[1].flags, ProcessFlags::ACTIVE);
    }
}
