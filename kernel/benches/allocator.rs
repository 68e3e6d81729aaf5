//! Block allocator and scheduler micro-benchmarks

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;
use zeitlos_abi::TrapFrame;
use zeitlos_kernel::memory::{BlockAllocator, MemoryConfig};
use zeitlos_kernel::scheduler::{ProcessConfig, ProcessTable, MAX_PROCS};

fn fresh_allocator() -> BlockAllocator {
    let mut a = BlockAllocator::new(MemoryConfig::DEFAULT);
    a.init();
    a
}

fn bench_alloc_free(c: &mut Criterion) {
    c.bench_function("alloc_free_fill_region", |b| {
        b.iter_batched(
            fresh_allocator,
            |mut a| {
                let mut addrs = [0u32; 32];
                for addr in addrs.iter_mut() {
                    *addr = a.alloc(black_box(32768)).unwrap_or(0);
                }
                // free every other block first so the second pass merges both ways
                for addr in addrs.iter().step_by(2) {
                    let _ = a.free(*addr);
                }
                for addr in addrs.iter().skip(1).step_by(2) {
                    let _ = a.free(*addr);
                }
                a
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_schedule(c: &mut Criterion) {
    c.bench_function("schedule_full_table", |b| {
        let mut memory = fresh_allocator();
        let mut procs = ProcessTable::new(ProcessConfig::DEFAULT);
        for _ in 0..MAX_PROCS {
            if let Ok(pid) = procs.create(&mut memory, 0) {
                let _ = procs.start(pid);
            }
        }
        let mut regs = TrapFrame::zeroed();
        b.iter(|| {
            regs = procs.schedule(&mut memory, black_box(regs));
        })
    });
}

criterion_group!(benches, bench_alloc_free, bench_schedule);
criterion_main!(benches);
