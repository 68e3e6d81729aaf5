//! Memory management subsystem
//!
//! The kernel owns one contiguous region of main memory and hands it out to
//! processes (and to user code through the `MEM_ALLOC` syscall) in aligned
//! blocks.
//!
//! # Components
//! - `block_allocator`: First-fit block-list allocator over the managed region
//! - `heap`: The kernel's own `GlobalAlloc` heap (bare-metal image only)
//!
//! # Design
//! - No MMU: addresses handed out are physical and used directly
//! - Alignment and minimum block size are fixed per allocator
//! - Block metadata lives in a fixed pool; nothing is allocated to track blocks

pub mod block_allocator;

#[cfg(all(feature = "bare-metal", target_arch = "riscv32"))]
pub mod heap;

pub use block_allocator::{Block, BlockAllocator, MAX_BLOCKS};

use thiserror::Error;

/// Allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("no free block can hold {size:#x} bytes")]
    OutOfMemory { size: u32 },

    #[error("block metadata pool exhausted")]
    MetadataExhausted,

    #[error("no allocated block starts at {addr:#010x}")]
    UnknownAddress { addr: u32 },
}

pub type Result<T> = core::result::Result<T, MemoryError>;

/// Managed region and allocation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// First byte of the managed region
    pub base: u32,
    /// Region size in bytes
    pub size: u32,
    /// Block alignment and size granularity (power of two)
    pub alignment: u32,
    /// Smallest block handed out
    pub min_block: u32,
}

impl MemoryConfig {
    /// 1 MiB at the start of main memory, 4 KiB alignment, 32 KiB minimum
    pub const DEFAULT: Self = Self {
        base: zeitlos_abi::hw::MAIN_MEMORY_BASE,
        size: 1024 * 1024,
        alignment: 4096,
        min_block: 32768,
    };
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static_assertions::const_assert!(MemoryConfig::DEFAULT.alignment.is_power_of_two());
static_assertions::const_assert!(MemoryConfig::DEFAULT.min_block % MemoryConfig::DEFAULT.alignment == 0);

/// Round `val` up to the next multiple of `align`
///
/// `align` must be a power of two. Wraps on overflow, so callers that take
/// untrusted sizes must bound them first.
#[inline]
pub const fn align_up(val: u32, align: u32) -> u32 {
    val.wrapping_add(align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(10000, 4096), 12288);
        assert_eq!(align_up(0x4000_0001, 4096), 0x4000_1000);
    }

    #[test]
    fn test_default_config() {
        let config = MemoryConfig::default();
        assert_eq!(config.base, 0x4000_0000);
        assert_eq!(config.size, 0x10_0000);
        assert_eq!(config.alignment, 4096);
        assert_eq!(config.min_block, 32768);
    }
}
