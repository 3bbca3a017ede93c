use bytes::{Buf, BytesMut};

use crate::error::{FrameError, Result};

/// Fixed-capacity FIFO receive buffer.
///
/// The oldest unconsumed byte is always at index 0 of [`as_slice`]. Consuming
/// advances the head of the underlying `BytesMut` instead of shifting the
/// remainder; the freed prefix is reclaimed when later appends reserve space.
///
/// [`as_slice`]: ByteRing::as_slice
#[derive(Debug)]
pub struct ByteRing {
    buf: BytesMut,
    capacity: usize,
}

impl ByteRing {
    /// Create an empty buffer that never holds more than `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append bytes at the tail.
    ///
    /// Fails without appending anything if the result would exceed capacity.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buf.len() + bytes.len() > self.capacity {
            return Err(FrameError::CapacityExceeded {
                len: self.buf.len(),
                incoming: bytes.len(),
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Remove the first `n` bytes (or everything, if fewer are buffered).
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.advance(n);
    }

    /// Remove and return the first `n` bytes.
    pub(crate) fn split_to(&mut self, n: usize) -> BytesMut {
        let n = n.min(self.buf.len());
        self.buf.split_to(n)
    }

    /// Ordered view of the buffered bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free space left before `append` starts failing.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Drop every buffered byte.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
