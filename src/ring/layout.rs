use crossbeam_utils::CachePadded;
use std::sync::atomic::AtomicU64;

use crate::sync::RawMutex;

/// A "magic number" identifying the region as a shmring control block.
pub const MAGIC: u64 = 0x53484D5F_52494E47; // "SHM_RING"

/// The version of the memory layout.
pub const VERSION: u32 = 1;

/// Cursor state of the circular byte buffer.
///
/// This struct represents the actual data layout in shared memory and is
/// `#[repr(C)]` for a defined, stable layout. The `capacity` data bytes
/// follow the enclosing [`ControlHeader`] directly.
///
/// Invariants: `0 <= begin, end < capacity`; the buffer holds at most
/// `capacity - 1` bytes, one slot staying permanently reserved so that
/// `begin == end` unambiguously means empty, never full.
#[repr(C, align(128))]
pub struct RingHeader {
    /// Fixed at construction, always > 1. Written once before any worker
    /// is forked, read-only afterwards.
    pub capacity: u64,

    /// Offset of the oldest unread byte. Mutated only inside the read-mutex
    /// critical section. Padded against false sharing with `end`.
    pub begin: CachePadded<AtomicU64>,

    /// Offset one past the newest written byte. Mutated only inside the
    /// send-mutex critical section.
    pub end: CachePadded<AtomicU64>,
}

/// The control block at the very start of the shared region.
///
/// One embedded ring, the three cross-process mutexes, and the monotonic
/// progress counters. Created exactly once by the orchestrator before any
/// worker exists; destroyed with the region after every worker has exited.
#[repr(C, align(128))]
pub struct ControlHeader {
    /// Identifies the region as ours; checked when a view is built.
    pub magic: u64,

    /// Layout version.
    pub version: u32,

    /// Reserved/padding.
    pub reserved: u32,

    /// Messages successfully appended, across all producers.
    pub send_count: CachePadded<AtomicU64>,

    /// Messages successfully consumed, across all consumers.
    pub read_count: CachePadded<AtomicU64>,

    /// Guards the `begin`/`end` snapshot and the copy step of one transfer.
    /// Acquired and released per attempt, never held while spinning.
    pub general: RawMutex,

    /// Serializes all producers against each other; totally orders appends.
    pub send: RawMutex,

    /// Serializes all consumers against each other; totally orders reads.
    pub read: RawMutex,

    /// The embedded ring cursors. Data bytes follow this header.
    pub ring: RingHeader,
}
