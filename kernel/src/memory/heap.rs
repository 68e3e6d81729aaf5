//! Kernel heap allocator
//!
//! Backs `Box`, `Vec` and `String` inside the kernel (Value tables and
//! strings, process dumps). Uses `linked_list_allocator::Heap` over a
//! static region in the kernel image, behind a `spin::Mutex`.
//!
//! The heap sits in `.bss`, so it is part of process zero's image and
//! never overlaps blocks handed out by the block allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};
use linked_list_allocator::Heap;
use spin::Mutex;

/// Heap size
pub const HEAP_SIZE: usize = 64 * 1024;

/// Heap memory region
static mut HEAP_MEMORY: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];

/// Global allocator
pub struct KernelHeap {
    inner: Mutex<Heap>,
}

impl KernelHeap {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Heap::empty()),
        }
    }
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner
            .lock()
            .allocate_first_fit(layout)
            .map_or(ptr::null_mut(), |p| p.as_ptr())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(p) = NonNull::new(ptr) {
            self.inner.lock().deallocate(p, layout);
        }
    }
}

#[global_allocator]
static HEAP: KernelHeap = KernelHeap::new();

/// Hand the static region to the allocator
///
/// # Safety
/// Must be called exactly once, before the first allocation.
pub unsafe fn init() {
    let region = &mut *ptr::addr_of_mut!(HEAP_MEMORY);
    HEAP.inner.lock().init_from_slice(region);
    log::debug!("[mem] kernel heap: {} KiB", HEAP_SIZE / 1024);
}
