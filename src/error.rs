use thiserror::Error;

/// Domain errors of the ring and codec.
///
/// Busy-retry ("no space yet", "no data yet") is expected control flow, not
/// an error, and is represented by the `try_*` operations returning `false`
/// or `None`. OS-level failures (mapping the region, forking a worker)
/// surface as `std::io::Error` at the boundary where they occur and are
/// treated as fatal by callers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The encoded message can never fit the ring, regardless of how much
    /// is drained. Rejected up front; `begin`/`end` are untouched.
    #[error("message of {len} bytes cannot fit a ring of capacity {capacity}")]
    MessageTooLarge { len: usize, capacity: usize },

    /// The recomputed checksum disagrees with the stored field. Detection
    /// only: the decoded message is still handed to the caller.
    #[error("checksum mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { stored: u16, computed: u16 },
}
