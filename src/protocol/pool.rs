//! Scratch buffer pool
//!
//! Marshal routines assemble each message in a pooled buffer and write it
//! with a single call. A [`ScratchBuf`] hands its buffer back when dropped,
//! so every exit path (including `?` returns) releases it.

use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

/// Number of idle buffers kept by the shared pool
pub const POOL_CAPACITY: usize = 64;

/// Initial capacity of a fresh buffer
pub const INITIAL_BUFFER_SIZE: usize = 512;

/// Buffers that grew beyond this are dropped instead of pooled (64 KB)
pub const MAX_RETAINED_SIZE: usize = 64 * 1024;

static SHARED: OnceLock<ScratchPool> = OnceLock::new();

/// Borrow a buffer from the process-wide pool
pub fn scratch() -> ScratchBuf<'static> {
    SHARED.get_or_init(|| ScratchPool::new(POOL_CAPACITY)).acquire()
}

/// Bounded free-list of byte buffers
pub struct ScratchPool {
    free: ArrayQueue<BytesMut>,
}

impl ScratchPool {
    /// Create a pool retaining at most `capacity` idle buffers
    pub fn new(capacity: usize) -> Self {
        Self {
            free: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Take an empty buffer, allocating if none is idle
    pub fn acquire(&self) -> ScratchBuf<'_> {
        let buf = self
            .free
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(INITIAL_BUFFER_SIZE));
        ScratchBuf { buf, pool: self }
    }

    /// Number of idle buffers
    pub fn available(&self) -> usize {
        self.free.len()
    }

    fn release(&self, mut buf: BytesMut) {
        if buf.capacity() > MAX_RETAINED_SIZE {
            return;
        }
        buf.clear();
        // A full pool simply drops the buffer.
        let _ = self.free.push(buf);
    }
}

/// A buffer on loan from a [`ScratchPool`]
pub struct ScratchBuf<'a> {
    buf: BytesMut,
    pool: &'a ScratchPool,
}

impl Deref for ScratchBuf<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for ScratchBuf<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl io::Write for ScratchBuf<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ScratchBuf<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
