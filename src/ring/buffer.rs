use std::mem::size_of;
use std::sync::atomic::Ordering::Relaxed;

use super::layout::{ControlHeader, MAGIC};
use crate::error::Error;
use crate::sync::MutexGuard;

/// A fixed-capacity circular byte store addressed by modular offsets.
///
/// This struct is NOT stored in shared memory. It is a transient view
/// holding pointers into the shared region; every process builds its own
/// view over the same [`ControlHeader`].
///
/// ### Concurrency design
///
/// - The send mutex serializes producers: all mutation of `end` happens
///   inside its critical section, and it is held for the entire duration of
///   one complete transfer, so no two producers interleave their bytes.
/// - The read mutex does the same for consumers and `begin`.
/// - The general mutex guards the `begin`/`end` snapshot. The copy step of
///   a transfer also executes inside one general critical section, so a
///   concurrent reader never snapshots a half-written record. It is taken
///   and released per attempt, never nested and never held while spinning.
/// - Blocking operations spin-retry with no timeout: a `send` against a
///   ring nobody drains blocks forever. That is the documented contract,
///   not a defect.
pub struct RingBuffer {
    /// Pointer to the control header in the shared region.
    header: *const ControlHeader,

    /// Start of the data bytes, directly after the header.
    data: *mut u8,

    /// Capacity in bytes; usable payload is `capacity - 1`.
    capacity: usize,
}

unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Build a view over an initialized control header.
    ///
    /// # Safety
    ///
    /// `header` must point to a live, initialized `ControlHeader` followed
    /// by at least `capacity` data bytes, all within one shared mapping
    /// that outlives the view.
    pub(crate) unsafe fn new(header: *const ControlHeader) -> Self {
        debug_assert_eq!((*header).magic, MAGIC);
        let capacity = (*header).ring.capacity as usize;
        let data = (header as *mut u8).add(size_of::<ControlHeader>());
        Self {
            header,
            data,
            capacity,
        }
    }

    #[inline]
    fn hdr(&self) -> &ControlHeader {
        unsafe { &*self.header }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently stored, snapshotted under the general lock.
    pub fn len(&self) -> usize {
        let _general = self.hdr().general.lock();
        self.len_unsynced()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can be appended right now: `capacity - 1 - len()`.
    pub fn available(&self) -> usize {
        self.capacity - 1 - self.len()
    }

    /// Read cursor, for diagnostics and tests. Not synchronized.
    pub fn begin(&self) -> usize {
        self.hdr().ring.begin.load(Relaxed) as usize
    }

    /// Write cursor, for diagnostics and tests. Not synchronized.
    pub fn end(&self) -> usize {
        self.hdr().ring.end.load(Relaxed) as usize
    }

    /// `len()` without taking the general lock; caller must hold it.
    fn len_unsynced(&self) -> usize {
        let begin = self.hdr().ring.begin.load(Relaxed) as usize;
        let end = self.hdr().ring.end.load(Relaxed) as usize;
        if begin <= end {
            end - begin
        } else {
            self.capacity - begin + end
        }
    }

    /// Append `bytes`, blocking (spin-retry, no timeout) until space frees.
    ///
    /// Rejects immediately with [`Error::MessageTooLarge`] when the bytes
    /// could never fit, leaving `begin`/`end` untouched. The send mutex is
    /// held for the whole transfer, so appends are totally ordered and
    /// never interleaved.
    pub fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        self.check_fits(bytes.len())?;
        let _send = self.hdr().send.lock();
        while !self.transfer_in(bytes) {
            std::hint::spin_loop();
        }
        Ok(())
    }

    /// One append attempt. `Ok(false)` means no space right now.
    pub fn try_send(&self, bytes: &[u8]) -> Result<bool, Error> {
        self.check_fits(bytes.len())?;
        let _send = self.hdr().send.lock();
        Ok(self.transfer_in(bytes))
    }

    fn check_fits(&self, len: usize) -> Result<(), Error> {
        if len >= self.capacity {
            return Err(Error::MessageTooLarge {
                len,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Allocate-and-copy step of one append. Caller holds the send mutex.
    fn transfer_in(&self, bytes: &[u8]) -> bool {
        let hdr = self.hdr();
        let _general = hdr.general.lock();

        let len = bytes.len();
        if self.capacity - 1 - self.len_unsynced() < len {
            return false;
        }

        // The write base; no other producer can move `end` while we hold
        // the send mutex.
        let base = hdr.ring.end.load(Relaxed) as usize;
        for (i, &byte) in bytes.iter().enumerate() {
            unsafe {
                *self.data.add((base + i) % self.capacity) = byte;
            }
        }
        hdr.ring.end.store(((base + len) % self.capacity) as u64, Relaxed);
        true
    }

    /// Acquire the read mutex for one or more consume steps.
    ///
    /// Multi-part reads (a frame header followed by its payload) must go
    /// through a single guard so no other consumer interleaves.
    pub fn reader(&self) -> ReadGuard<'_> {
        ReadGuard {
            ring: self,
            _read: self.hdr().read.lock(),
        }
    }

    /// Consume exactly `len` bytes, blocking until they are present.
    pub fn read(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.reader().pull(&mut buf);
        buf
    }

    /// One consume attempt of exactly `len` bytes.
    pub fn try_read(&self, len: usize) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; len];
        if self.reader().try_pull(&mut buf) {
            Some(buf)
        } else {
            None
        }
    }
}

/// Holds the read mutex across a multi-step consume.
pub struct ReadGuard<'a> {
    ring: &'a RingBuffer,
    _read: MutexGuard<'a>,
}

impl ReadGuard<'_> {
    /// One consume attempt; `false` when fewer than `buf.len()` bytes are
    /// stored. On success the bytes are copied out and `begin` advances by
    /// `buf.len()` modulo the capacity, all in one general critical section.
    pub fn try_pull(&mut self, buf: &mut [u8]) -> bool {
        let hdr = self.ring.hdr();
        let _general = hdr.general.lock();

        if self.ring.len_unsynced() < buf.len() {
            return false;
        }

        let base = hdr.ring.begin.load(Relaxed) as usize;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { *self.ring.data.add((base + i) % self.ring.capacity) };
        }
        hdr.ring
            .begin
            .store(((base + buf.len()) % self.ring.capacity) as u64, Relaxed);
        true
    }

    /// Consume exactly `buf.len()` bytes, spin-retrying with no timeout.
    pub fn pull(&mut self, buf: &mut [u8]) {
        while !self.try_pull(buf) {
            std::hint::spin_loop();
        }
    }
}
