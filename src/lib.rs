//! Producer/consumer messaging over a single shared memory region.
//!
//! Independent worker processes share exactly one `MAP_SHARED` mapping,
//! created before any of them is forked. Inside it live a fixed-capacity
//! circular byte buffer, three futex-backed cross-process mutexes, and two
//! monotonic progress counters. Messages travel through the ring as
//! self-describing frames (`[type:1][checksum:2][size:1][payload]`) with an
//! XOR integrity checksum.
//!
//! Blocking is deliberate spin-retry with no timeout: a `send` into a ring
//! nobody drains never returns, and a `read` from a ring nobody fills never
//! returns. Workers are stopped cooperatively via a signal-set flag that is
//! only observed between transfer attempts.
//!
//! ## Modules
//!
//! - [`sys`] — shared region allocation and raw futex wait/wake.
//! - [`sync`] — a `repr(C)` mutex that lives inside the shared region.
//! - [`ring`] — the circular byte buffer and its shared-memory layout.
//! - [`message`] — the self-describing frame codec.
//! - [`control`] — the control block coupling one ring with its counters.
//! - [`worker`] — forked producer/consumer processes (unix only).
//! - [`console`] — raw-mode keystroke dispatch for the orchestrator.

pub mod control;
pub mod error;
pub mod message;
pub mod ring;
pub mod sync;
pub mod sys;

#[cfg(unix)]
pub mod console;
#[cfg(unix)]
pub mod worker;

pub use control::{ControlBlock, ControlBuilder};
pub use error::Error;
pub use message::Message;
pub use ring::RingBuffer;

#[cfg(unix)]
pub use worker::{Role, WorkerHandle};
