//! Interactive control surface: raw-mode keystrokes mapped to commands.
//!
//! Thin glue around the core. Single keystrokes are read unechoed and
//! uncooked, dispatched to a [`Supervisor`] that owns the control block and
//! the active-worker lists. On quit, every remaining worker is force-
//! stopped (signal, then blocking join) before the shared region goes away.

use std::io;

use crate::control::ControlBlock;
use crate::worker::{self, Role, WorkerHandle};

/// Read one keystroke in raw, unechoed mode; terminal state is restored
/// before returning.
pub fn getch() -> io::Result<u8> {
    unsafe {
        let fd = libc::STDIN_FILENO;

        let mut old: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut old) != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = old;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON);
        if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut byte = 0u8;
        let read = libc::read(fd, &mut byte as *mut u8 as *mut libc::c_void, 1);
        let restore_err = if libc::tcsetattr(fd, libc::TCSANOW, &old) != 0 {
            Some(io::Error::last_os_error())
        } else {
            None
        };

        if read < 0 {
            return Err(io::Error::last_os_error());
        }
        if let Some(err) = restore_err {
            return Err(err);
        }
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed",
            ));
        }
        Ok(byte)
    }
}

/// Commands the control surface understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ShowInfo,
    AddProducer,
    KillProducer,
    AddConsumer,
    KillConsumer,
    Quit,
    /// Any unmapped key.
    Nop,
}

impl Command {
    pub fn from_key(key: u8) -> Self {
        match key {
            b'i' => Command::ShowInfo,
            b'p' => Command::AddProducer,
            b'P' => Command::KillProducer,
            b'c' => Command::AddConsumer,
            b'C' => Command::KillConsumer,
            b'q' => Command::Quit,
            _ => Command::Nop,
        }
    }
}

/// Owns the control block and the lists of live workers.
///
/// Workers communicate exclusively through the shared ring; the supervisor
/// polls counters and manages their lifetime but never touches buffer
/// internals directly.
pub struct Supervisor {
    control: ControlBlock,
    producers: Vec<WorkerHandle>,
    consumers: Vec<WorkerHandle>,
}

impl Supervisor {
    pub fn new(control: ControlBlock) -> Self {
        Self {
            control,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    pub fn control(&self) -> &ControlBlock {
        &self.control
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Execute one command. Returns `true` when the command asks to quit.
    pub fn handle(&mut self, command: Command) -> io::Result<bool> {
        match command {
            Command::ShowInfo => {
                println!(
                    "Sent {}({}) Got {}({})",
                    self.control.send_count(),
                    self.producers.len(),
                    self.control.read_count(),
                    self.consumers.len(),
                );
            }
            Command::AddProducer => {
                let handle = worker::spawn(&self.control, Role::Producer)?;
                self.producers.push(handle);
            }
            Command::KillProducer => self.kill_last(Role::Producer)?,
            Command::AddConsumer => {
                let handle = worker::spawn(&self.control, Role::Consumer)?;
                self.consumers.push(handle);
            }
            Command::KillConsumer => self.kill_last(Role::Consumer)?,
            Command::Quit => return Ok(true),
            Command::Nop => {}
        }
        Ok(false)
    }

    fn kill_last(&mut self, role: Role) -> io::Result<()> {
        let list = match role {
            Role::Producer => &mut self.producers,
            Role::Consumer => &mut self.consumers,
        };
        if let Some(handle) = list.pop() {
            println!("Kill {role} {}", handle.pid());
            handle.stop()?;
        }
        Ok(())
    }

    /// Force-stop every remaining worker: signal, then blocking join, one
    /// by one, producers first.
    pub fn shutdown(&mut self) -> io::Result<()> {
        while !self.producers.is_empty() {
            self.kill_last(Role::Producer)?;
        }
        while !self.consumers.is_empty() {
            self.kill_last(Role::Consumer)?;
        }
        Ok(())
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Safety net; the orchestrator calls shutdown() explicitly. The
        // region must not be unmapped while workers still use it.
        if let Err(err) = self.shutdown() {
            log::warn!("shutdown during drop failed: {err}");
        }
    }
}
