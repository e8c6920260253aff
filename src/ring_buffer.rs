//! A fixed-capacity, sequence-ordered byte ring buffer (§4.5) used to hand
//! decompressed container payloads from the pipeline's producer threads to
//! its single consumer in the order they appear in the file, regardless of
//! which producer finished decompressing first.
//!
//! Grounded in the `QueueBuf` class's blocking producer/consumer protocol,
//! generalized to the `Mutex` + `Condvar` pattern this crate otherwise uses
//! for shared, ordered, blocking state.

use std::sync::{Condvar, Mutex};

use crate::error::{BlfError, BlfResult};

struct Inner {
    buf: Vec<u8>,
    /// Read cursor, in `[0, capacity)`.
    p: usize,
    /// Write cursor, in `[0, capacity)`.
    q: usize,
    /// Bytes currently occupied between `p` and `q` (mod capacity).
    len: usize,
    /// Monotonic count of bytes the next writer must wait for.
    idx_p: u64,
    /// Monotonic count of bytes the next reader has consumed.
    idx_c: u64,
    closed: bool,
}

/// A bounded byte queue where writers submit in a caller-assigned
/// sequence order and block until it is their turn, and the single
/// reader blocks until enough bytes are available or the buffer is
/// closed.
pub struct RingBuffer {
    inner: Mutex<Inner>,
    item_available: Condvar,
    space_available: Condvar,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: vec![0u8; capacity],
                p: 0,
                q: 0,
                len: 0,
                idx_p: 0,
                idx_c: 0,
                closed: false,
            }),
            item_available: Condvar::new(),
            space_available: Condvar::new(),
            capacity,
        }
    }

    /// Blocks until every writer with a lower `seq` has completed, then
    /// copies `data` into the buffer (blocking for space as needed) and
    /// signals the reader. `seq` is the zero-based, monotonically
    /// increasing order this chunk must appear in.
    pub fn write(&self, seq: u64, data: &[u8]) -> BlfResult<()> {
        if data.len() > self.capacity {
            return Err(BlfError::PayloadExceedsCapacity {
                offset: 0,
                len: data.len(),
                capacity: self.capacity,
            });
        }
        let mut inner = self.inner.lock().unwrap();
        while inner.idx_p != seq {
            if inner.closed {
                return Ok(());
            }
            inner = self.space_available.wait(inner).unwrap();
        }
        while self.capacity - inner.len < data.len() {
            if inner.closed {
                return Ok(());
            }
            inner = self.space_available.wait(inner).unwrap();
        }

        let cap = self.capacity;
        let q = inner.q;
        let first = (cap - q).min(data.len());
        inner.buf[q..q + first].copy_from_slice(&data[..first]);
        if first < data.len() {
            let rest = data.len() - first;
            inner.buf[0..rest].copy_from_slice(&data[first..]);
            inner.q = rest;
        } else {
            inner.q = (q + first) % cap;
        }
        inner.len += data.len();
        inner.idx_p += 1;

        self.item_available.notify_all();
        self.space_available.notify_all();
        Ok(())
    }

    /// Blocks until `size` contiguous bytes are buffered, then returns
    /// exactly that many. Only returns fewer than `size` when the buffer
    /// is closed with less than `size` bytes left to drain, and only
    /// returns `None` once it is closed with nothing left at all. A
    /// caller must not request more than the buffer's capacity, since
    /// that many bytes can never accumulate before close.
    pub fn read(&self, size: usize) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.len >= size {
                break;
            }
            if inner.closed {
                if inner.len == 0 {
                    return None;
                }
                break;
            }
            inner = self.item_available.wait(inner).unwrap();
        }

        let cap = self.capacity;
        let take = size.min(inner.len);
        let p = inner.p;
        let mut out = Vec::with_capacity(take);
        let first = (cap - p).min(take);
        out.extend_from_slice(&inner.buf[p..p + first]);
        if first < take {
            let rest = take - first;
            out.extend_from_slice(&inner.buf[0..rest]);
            inner.p = rest;
        } else {
            inner.p = (p + first) % cap;
        }
        inner.len -= take;
        inner.idx_c += take as u64;

        self.space_available.notify_all();
        Some(out)
    }

    /// Marks the buffer closed: pending and future reads drain remaining
    /// bytes then return `None`; blocked writers waiting for space give
    /// up and return `Ok(())` without writing.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.item_available.notify_all();
        self.space_available.notify_all();
    }
}
