//! A mutual-exclusion primitive that lives inside the shared region.
//!
//! [`RawMutex`] is a single `AtomicU32` in the classic three-state futex
//! arrangement (unlocked / locked / contended), so it works between
//! unrelated processes as long as they map the same memory. It is
//! non-recursive: nothing in this crate ever nests an acquisition of the
//! same lock — inner loops release and reacquire instead.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::sys::futex::{futex_wait, futex_wake};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

/// Spins this many times before parking on the futex.
const SPIN_LIMIT: u32 = 100;

/// A futex-backed, cross-process mutex with a stable `repr(C)` layout.
///
/// Placed in shared memory by the control block; all processes operate on
/// it through references derived from the shared mapping.
#[repr(C)]
pub struct RawMutex {
    state: AtomicU32,
}

impl RawMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    /// Acquire the lock, blocking (without timeout) until it is available.
    pub fn lock(&self) -> MutexGuard<'_> {
        if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_contended();
        }
        MutexGuard { mutex: self }
    }

    fn lock_contended(&self) {
        // Short-lived critical sections usually hand the lock over before
        // the spin budget runs out; only then involve the kernel.
        for _ in 0..SPIN_LIMIT {
            if self
                .state
                .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            std::hint::spin_loop();
        }

        // Mark contended so the holder knows to wake us on unlock.
        while self.state.swap(CONTENDED, Ordering::Acquire) != UNLOCKED {
            futex_wait(&self.state, CONTENDED);
        }
    }

    fn unlock(&self) {
        if self.state.swap(UNLOCKED, Ordering::Release) == CONTENDED {
            futex_wake(&self.state, 1);
        }
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`RawMutex::lock`]; releases on drop.
pub struct MutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}
