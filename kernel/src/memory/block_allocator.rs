//! Block-list allocator
//!
//! Manages the kernel's memory region as an address-ordered list of
//! blocks, each either free or used. Every byte of the region belongs to
//! exactly one block.
//!
//! # Design
//! - First fit: the first free block that can hold the aligned request wins
//! - Splits insert new blocks next to the one being split, so list order is
//!   always address order
//! - Block metadata comes from a fixed pool of [`MAX_BLOCKS`] entries that
//!   is never recycled; merged-away entries stay consumed until `init`
//! - `free` coalesces with the following block, then with the preceding one
//!
//! # Implementation Notes
//! - Blocks are linked by pool index rather than pointer
//! - `alloc` counts the metadata entries it will need before touching the
//!   list, so a failed allocation leaves no trace

use super::{align_up, MemoryConfig, MemoryError, Result};

/// Capacity of the block metadata pool
pub const MAX_BLOCKS: usize = 256;

/// One extent of the managed region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start: u32,
    pub size: u32,
    pub used: bool,
    next: Option<u16>,
}

static_assertions::const_assert!(MAX_BLOCKS <= u16::MAX as usize);

impl Block {
    const EMPTY: Self = Self {
        start: 0,
        size: 0,
        used: false,
        next: None,
    };

    /// One past the last byte
    pub fn end(&self) -> u32 {
        self.start + self.size
    }
}

/// First-fit allocator over a fixed region
pub struct BlockAllocator {
    config: MemoryConfig,

    /// Metadata pool; entries `[0, pool_used)` have been handed out
    pool: [Block; MAX_BLOCKS],
    pool_used: usize,

    /// First block in address order (None until `init`)
    head: Option<u16>,
}

impl BlockAllocator {
    /// Create an allocator for `config`
    ///
    /// The allocator manages nothing until [`init`](Self::init) is called.
    pub const fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            pool: [Block::EMPTY; MAX_BLOCKS],
            pool_used: 0,
            head: None,
        }
    }

    /// Reset to a single free block spanning the whole region
    ///
    /// Any outstanding allocations are forgotten.
    pub fn init(&mut self) {
        self.pool_used = 0;
        let first = self.push_block(Block {
            start: self.config.base,
            size: self.config.size,
            used: false,
            next: None,
        });
        self.head = Some(first);

        log::debug!(
            "[mem] managing {:#010x}..{:#010x} ({} KiB)",
            self.config.base,
            self.config.base.wrapping_add(self.config.size),
            self.config.size / 1024
        );
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn alignment(&self) -> u32 {
        self.config.alignment
    }

    /// Allocate a block of at least `size` bytes
    ///
    /// The request is rounded up to the alignment and raised to the minimum
    /// block size. Returns the start address of the block.
    ///
    /// # Errors
    /// - [`MemoryError::OutOfMemory`] if no free block is large enough
    /// - [`MemoryError::MetadataExhausted`] if the split needs pool entries
    ///   that are no longer available
    pub fn alloc(&mut self, size: u32) -> Result<u32> {
        let request = self.round_request(size)?;

        let mut prev: Option<u16> = None;
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            let blk = self.pool[idx as usize];

            if !blk.used {
                let aligned = align_up(blk.start, self.config.alignment);
                let padding = aligned.wrapping_sub(blk.start);

                if let Some(total) = request.checked_add(padding) {
                    if blk.size >= total {
                        let needed = usize::from(padding > 0) + usize::from(blk.size > total);
                        if MAX_BLOCKS - self.pool_used < needed {
                            log::warn!("[mem] alloc {:#x}: block metadata exhausted", request);
                            return Err(MemoryError::MetadataExhausted);
                        }

                        let addr = self.carve(prev, idx, padding, request);
                        log::debug!("[mem] alloc {:#x} bytes at {:#010x}", request, addr);
                        return Ok(addr);
                    }
                }
            }

            prev = cursor;
            cursor = blk.next;
        }

        log::warn!("[mem] alloc {:#x}: out of memory", request);
        Err(MemoryError::OutOfMemory { size: request })
    }

    /// Release the block starting at `addr`
    ///
    /// Merges with a free successor, then with a free predecessor.
    ///
    /// # Errors
    /// [`MemoryError::UnknownAddress`] if no used block starts at `addr`.
    /// The allocator is left untouched in that case.
    pub fn free(&mut self, addr: u32) -> Result<()> {
        let mut prev: Option<u16> = None;
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            let blk = self.pool[idx as usize];

            if blk.used && blk.start == addr {
                let i = idx as usize;
                self.pool[i].used = false;

                if let Some(next) = blk.next {
                    let following = self.pool[next as usize];
                    if !following.used {
                        self.pool[i].size += following.size;
                        self.pool[i].next = following.next;
                    }
                }

                if let Some(p) = prev {
                    let p = p as usize;
                    if !self.pool[p].used {
                        self.pool[p].size += self.pool[i].size;
                        self.pool[p].next = self.pool[i].next;
                    }
                }

                log::debug!("[mem] free {:#010x} ({:#x} bytes)", addr, blk.size);
                return Ok(());
            }

            prev = cursor;
            cursor = blk.next;
        }

        log::debug!("[mem] free {:#010x}: not an allocated block", addr);
        Err(MemoryError::UnknownAddress { addr })
    }

    /// Iterate over blocks in address order
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            allocator: self,
            cursor: self.head,
        }
    }

    /// Block starting exactly at `addr`, if any
    pub fn block_at(&self, addr: u32) -> Option<Block> {
        self.blocks().find(|b| b.start == addr)
    }

    /// Total bytes in free blocks
    pub fn free_bytes(&self) -> u32 {
        self.blocks().filter(|b| !b.used).map(|b| b.size).sum()
    }

    /// Total bytes in used blocks
    pub fn used_bytes(&self) -> u32 {
        self.blocks().filter(|b| b.used).map(|b| b.size).sum()
    }

    /// Metadata entries consumed since `init`
    pub fn metadata_used(&self) -> usize {
        self.pool_used
    }

    /// Apply alignment and minimum size to a request
    fn round_request(&self, size: u32) -> Result<u32> {
        // anything larger than the region can never fit; also keeps
        // align_up from wrapping
        if size > self.config.size {
            return Err(MemoryError::OutOfMemory { size });
        }
        Ok(align_up(size, self.config.alignment).max(self.config.min_block))
    }

    /// Split free block `idx` around an allocation of `size` bytes
    ///
    /// The caller has verified the block is large enough and that the pool
    /// holds every entry the split needs.
    fn carve(&mut self, prev: Option<u16>, idx: u16, padding: u32, size: u32) -> u32 {
        let i = idx as usize;

        if padding > 0 {
            let pre = self.push_block(Block {
                start: self.pool[i].start,
                size: padding,
                used: false,
                next: Some(idx),
            });
            match prev {
                Some(p) => self.pool[p as usize].next = Some(pre),
                None => self.head = Some(pre),
            }
            self.pool[i].start += padding;
            self.pool[i].size -= padding;
        }

        if self.pool[i].size > size {
            let rem = self.push_block(Block {
                start: self.pool[i].start + size,
                size: self.pool[i].size - size,
                used: false,
                next: self.pool[i].next,
            });
            self.pool[i].next = Some(rem);
            self.pool[i].size = size;
        }

        self.pool[i].used = true;
        self.pool[i].start
    }

    /// Take the next pool entry
    ///
    /// Callers check `pool_used < MAX_BLOCKS` first.
    fn push_block(&mut self, block: Block) -> u16 {
        let id = self.pool_used;
        self.pool[id] = block;
        self.pool_used += 1;
        id as u16
    }
}

/// Address-ordered block iterator
pub struct Blocks<'a> {
    allocator: &'a BlockAllocator,
    cursor: Option<u16>,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let idx = self.cursor?;
        let block = self.allocator.pool[idx as usize];
        self.cursor = block.next;
        Some(block)
    }
}
