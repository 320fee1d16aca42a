//! The control block: one ring plus its progress counters, placed at the
//! start of the shared region.
//!
//! Created exactly once by the orchestrator before any worker is forked —
//! children inherit the mapping and build their own [`RingBuffer`] views
//! over the same header. The owning handle releases the region on drop,
//! which must only happen after every worker has been joined.

use crossbeam_utils::CachePadded;
use std::io;
use std::mem::size_of;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ring::layout::{ControlHeader, RingHeader, MAGIC, VERSION};
use crate::ring::RingBuffer;
use crate::sync::RawMutex;
use crate::sys::shared_memory::{alloc_shared, free_shared};

/// Owning handle to the shared control block.
pub struct ControlBlock {
    base: NonNull<u8>,
    ring: RingBuffer,
}

unsafe impl Send for ControlBlock {}
unsafe impl Sync for ControlBlock {}

impl ControlBlock {
    /// Map the shared region sized header-plus-capacity and initialize the
    /// control block in place.
    ///
    /// `capacity` must be greater than 1 (one slot stays reserved, so a
    /// capacity of 1 could never hold a byte).
    pub fn create(capacity: usize) -> io::Result<Self> {
        if capacity <= 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("ring capacity must be > 1, got {capacity}"),
            ));
        }

        let size = size_of::<ControlHeader>() + capacity;
        let base = alloc_shared(size)?;
        let header = base.as_ptr() as *mut ControlHeader;

        unsafe {
            std::ptr::write(
                header,
                ControlHeader {
                    magic: MAGIC,
                    version: VERSION,
                    reserved: 0,
                    send_count: CachePadded::new(AtomicU64::new(0)),
                    read_count: CachePadded::new(AtomicU64::new(0)),
                    general: RawMutex::new(),
                    send: RawMutex::new(),
                    read: RawMutex::new(),
                    ring: RingHeader {
                        capacity: capacity as u64,
                        begin: CachePadded::new(AtomicU64::new(0)),
                        end: CachePadded::new(AtomicU64::new(0)),
                    },
                },
            );
        }

        let ring = unsafe { RingBuffer::new(header) };
        Ok(Self { base, ring })
    }

    #[inline]
    fn header(&self) -> &ControlHeader {
        unsafe { &*(self.base.as_ptr() as *const ControlHeader) }
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    /// Messages appended so far, across all producers. Monotonic.
    pub fn send_count(&self) -> u64 {
        self.header().send_count.load(Ordering::Relaxed)
    }

    /// Messages consumed so far, across all consumers. Monotonic.
    pub fn read_count(&self) -> u64 {
        self.header().read_count.load(Ordering::Relaxed)
    }

    /// Record one successful send; returns the new total.
    pub fn bump_send(&self) -> u64 {
        self.header().send_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record one successful read; returns the new total.
    pub fn bump_read(&self) -> u64 {
        self.header().read_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Drop for ControlBlock {
    fn drop(&mut self) {
        // Only the orchestrator runs this, after joining every worker;
        // forked children exit via _exit and never unmap.
        if let Err(err) = unsafe { free_shared(self.base) } {
            log::warn!("failed to release shared region: {err}");
        }
    }
}

/// Builder-style construction of the control block.
pub struct ControlBuilder {
    capacity: usize,
}

impl Default for ControlBuilder {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl ControlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring capacity in bytes; usable payload is one byte less.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> io::Result<ControlBlock> {
        ControlBlock::create(self.capacity)
    }
}
