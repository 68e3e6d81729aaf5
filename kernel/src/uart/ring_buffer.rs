//! Byte ring buffer for the UART queues
//!
//! Head and tail indices only, no element count: the buffer is empty when
//! `head == tail` and full when advancing `head` would reach `tail`. One
//! slot is never filled, so capacity `N` holds at most `N - 1` bytes.

/// Ring buffer for bytes
pub struct RingBuffer<const N: usize> {
    buffer: [u8; N],
    head: usize, // Write position
    tail: usize, // Read position
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new empty ring buffer
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            head: 0,
            tail: 0,
        }
    }

    /// Bytes the buffer can hold at once
    pub const fn usable_capacity(&self) -> usize {
        N - 1
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.head + 1) % N == self.tail
    }

    /// Number of queued bytes
    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }

    /// Push a byte into the buffer
    ///
    /// Returns `false` (and drops the byte) if the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        let next = (self.head + 1) % N;
        if next == self.tail {
            return false;
        }

        self.buffer[self.head] = byte;
        self.head = next;
        true
    }

    /// Pop a byte from the buffer
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let byte = self.buffer[self.tail];
        self.tail = (self.tail + 1) % N;
        Some(byte)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
