//! Global write-buffer memory accounting (§4.5). Tracks how much memory is reserved across every
//! mutable and immutable memtable sharing this buffer, independent of how many column families or
//! databases draw from it, and decides when the mutable memtable has grown large enough to
//! rotate into an immutable one awaiting flush.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::config_constants::{WRITE_BUFFER_FLUSH_FRACTION_DEN, WRITE_BUFFER_FLUSH_FRACTION_NUM};

/// A shared cap on total memtable memory. Clone cheaply (it's reference-counted internally by
/// callers holding it behind an `Arc`) and pass the same instance to every column family that
/// should draw from one pool.
pub(crate) struct WriteBuffer {
    buffer_size:      u64,
    total_reserved:   AtomicU64,
    total_freed:      AtomicU64,
    /// Bytes reserved by memtables that have already been made immutable (handed off to the
    /// flush path) but whose reservation has not yet been released by `free`.
    immutable_bytes:  AtomicU64,
    stall:            Mutex<bool>,
    cvar:             Condvar,
}

impl WriteBuffer {
    #[must_use]
    pub fn new(buffer_size: u64) -> Self {
        Self {
            buffer_size,
            total_reserved:  AtomicU64::new(0),
            total_freed:     AtomicU64::new(0),
            immutable_bytes: AtomicU64::new(0),
            stall:           Mutex::new(false),
            cvar:            Condvar::new(),
        }
    }

    #[must_use]
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    /// Bytes currently charged against the buffer: everything reserved, minus everything freed.
    #[must_use]
    pub fn memory_used(&self) -> u64 {
        self.total_reserved.load(Ordering::Acquire).saturating_sub(self.total_freed.load(Ordering::Acquire))
    }

    /// Bytes of `memory_used` attributable to memtables still accepting writes (as opposed to
    /// immutable memtables awaiting or undergoing flush).
    #[must_use]
    pub fn mutable(&self) -> u64 {
        self.memory_used().saturating_sub(self.immutable_bytes.load(Ordering::Acquire))
    }

    /// `true` once `memory_used` has crossed the 7/8 threshold of `buffer_size`: the point at
    /// which the mutable memtable should be rotated to immutable and a flush scheduled, even if
    /// no single memtable has hit its own per-memtable size limit.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        self.buffer_size > 0
            && self.memory_used() * WRITE_BUFFER_FLUSH_FRACTION_DEN
                >= self.buffer_size * WRITE_BUFFER_FLUSH_FRACTION_NUM
    }

    /// Reserve `bytes` against the buffer. Does not itself block; callers that also want to
    /// respect a memory-pressure stall should call [`Self::wait_if_stalled`] first.
    pub fn reserve(&self, bytes: u64) {
        self.total_reserved.fetch_add(bytes, Ordering::AcqRel);
    }

    /// Mark `bytes` already charged against the buffer as belonging to an immutable memtable
    /// (one that will no longer accept writes and is pending or undergoing flush).
    pub fn mark_immutable(&self, bytes: u64) {
        self.immutable_bytes.fetch_add(bytes, Ordering::AcqRel);
    }

    /// Release `bytes` reserved by a memtable that has been flushed and dropped.
    pub fn free(&self, bytes: u64) {
        self.total_freed.fetch_add(bytes, Ordering::AcqRel);
        self.immutable_bytes.fetch_sub(bytes, Ordering::AcqRel);
        self.cvar.notify_all();
    }

    /// Set or clear an externally-driven memory-pressure stall (distinct from the per-column-
    /// family write-stall in [`crate::write_controller::WriteController`]; this one reflects
    /// pressure on the buffer shared across every column family drawing from it).
    pub fn set_stalled(&self, stalled: bool) {
        *self.stall.lock() = stalled;
        if !stalled {
            self.cvar.notify_all();
        }
    }

    /// Block while a memory-pressure stall set via [`Self::set_stalled`] is active.
    pub fn wait_if_stalled(&self) {
        let mut stalled = self.stall.lock();
        while *stalled {
            self.cvar.wait(&mut stalled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_flush_triggers_at_seven_eighths() {
        let buf = WriteBuffer::new(8 * 1024);
        buf.reserve(7 * 1024);
        assert!(buf.should_flush());
    }

    #[test]
    fn should_flush_does_not_trigger_below_threshold() {
        let buf = WriteBuffer::new(8 * 1024);
        buf.reserve(6 * 1024);
        assert!(!buf.should_flush());
    }

    #[test]
    fn free_reduces_memory_used_and_immutable_bytes() {
        let buf = WriteBuffer::new(1024);
        buf.reserve(512);
        buf.mark_immutable(512);
        assert_eq!(buf.mutable(), 0);
        buf.free(512);
        assert_eq!(buf.memory_used(), 0);
        assert_eq!(buf.mutable(), 0);
    }

    #[test]
    fn wait_if_stalled_returns_once_unstalled() {
        use std::sync::Arc;

        let buf = Arc::new(WriteBuffer::new(1024));
        buf.set_stalled(true);

        let waiter = Arc::clone(&buf);
        let handle = std::thread::spawn(move || waiter.wait_if_stalled());

        std::thread::sleep(std::time::Duration::from_millis(20));
        buf.set_stalled(false);
        handle.join().expect("waiter thread should not panic");
    }
}
