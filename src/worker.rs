//! Forked worker processes: producers and consumers.
//!
//! A worker is a real OS process, forked after the shared region exists so
//! it inherits the mapping. Its loop runs Started → Working → Stopped: one
//! encode-and-send or read-and-verify per iteration, then a fixed sleep.
//! Stopping is cooperative — the signal handler only sets a process-local
//! flag, which the loop polls between transfer attempts and never observes
//! mid-operation. The orchestrator's stop path signals, then blocks in
//! `waitpid` (no timeout) before reclaiming the worker's slot.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::control::ControlBlock;
use crate::message::{to_hex, Message};

/// Signal used to request a cooperative stop.
pub const STOP_SIGNAL: libc::c_int = libc::SIGUSR1;

/// Sleep between iterations of a worker loop.
const ITERATION_INTERVAL: Duration = Duration::from_secs(1);

/// Payload hex in progress reports is truncated to this many characters.
const REPORT_HEX_LIMIT: usize = 80;

/// Process-local stop flag, flipped by the signal handler.
static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn on_stop(_signal: libc::c_int) {
    // Async-signal-safe: a single atomic store, no locks held.
    STOP.store(true, Ordering::SeqCst);
}

fn stopped() -> bool {
    STOP.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

/// Process id plus role; held only by the orchestrator's active lists.
#[derive(Debug)]
pub struct WorkerHandle {
    pid: libc::pid_t,
    role: Role,
}

impl WorkerHandle {
    pub fn pid(&self) -> libc::pid_t {
        self.pid
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Request a cooperative stop, then block until the process exits.
    ///
    /// The join has no timeout; a worker stuck inside a blocking transfer
    /// will finish that transfer before it can observe the flag.
    pub fn stop(self) -> io::Result<()> {
        unsafe {
            if libc::kill(self.pid, STOP_SIGNAL) != 0 {
                return Err(io::Error::last_os_error());
            }
            if libc::waitpid(self.pid, std::ptr::null_mut(), 0) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

/// Fork a worker process running the given role's loop.
///
/// The control block, and therefore the shared mapping, must already exist;
/// the child inherits it. In the child this function never returns — the
/// loop runs until the stop flag is observed, then the process exits.
pub fn spawn(control: &ControlBlock, role: Role) -> io::Result<WorkerHandle> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid > 0 {
        return Ok(WorkerHandle { pid, role });
    }

    // Child process.
    STOP.store(false, Ordering::SeqCst);
    let handler: extern "C" fn(libc::c_int) = on_stop;
    unsafe {
        libc::signal(STOP_SIGNAL, handler as libc::sighandler_t);
    }

    match role {
        Role::Producer => producer_loop(control),
        Role::Consumer => consumer_loop(control),
    }

    // Workers are never reused; the process terminates entirely. _exit
    // skips atexit handlers and drops, leaving the region mapped for the
    // siblings (the orchestrator owns its lifetime).
    unsafe { libc::_exit(0) }
}

fn report_hex(payload: &[u8]) -> String {
    let mut hex = to_hex(payload);
    hex.truncate(REPORT_HEX_LIMIT);
    hex
}

fn producer_loop(control: &ControlBlock) {
    let pid = std::process::id();
    log::info!("producer {pid} started");

    while !stopped() {
        let message = Message::random();
        let frame = message.encode();
        loop {
            if stopped() {
                break;
            }
            match control.ring().try_send(&frame) {
                Ok(true) => {
                    let sent = control.bump_send();
                    log::info!(
                        "producer {pid} sent {:02X}:{:04X} size {:3} total {sent} {}",
                        message.tag,
                        message.checksum,
                        message.size(),
                        report_hex(message.payload()),
                    );
                    break;
                }
                Ok(false) => std::hint::spin_loop(),
                Err(err) => {
                    // Only MessageTooLarge, which retrying cannot fix.
                    log::error!("producer {pid}: {err}");
                    break;
                }
            }
        }
        std::thread::sleep(ITERATION_INTERVAL);
    }

    log::info!("producer {pid} stopped");
}

fn consumer_loop(control: &ControlBlock) {
    let pid = std::process::id();
    log::info!("consumer {pid} started");

    while !stopped() {
        loop {
            if stopped() {
                break;
            }
            match Message::try_read_from(control.ring()) {
                Some(message) => {
                    let got = control.bump_read();
                    // Corruption is detected and reported, the message is
                    // still counted and delivered.
                    if let Err(err) = message.verify() {
                        log::warn!("consumer {pid}: {err}");
                    }
                    log::info!(
                        "consumer {pid} got  {:02X}:{:04X} size {:3} total {got} {}",
                        message.tag,
                        message.checksum,
                        message.size(),
                        report_hex(message.payload()),
                    );
                    break;
                }
                None => std::hint::spin_loop(),
            }
        }
        std::thread::sleep(ITERATION_INTERVAL);
    }

    log::info!("consumer {pid} stopped");
}
