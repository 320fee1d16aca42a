//! Interactive orchestrator.
//!
//! Creates the control block (and with it the shared region) before any
//! worker exists, then dispatches single keystrokes:
//!
//! - `i` — report send/read counts and live worker counts
//! - `p` / `P` — add / remove a producer process
//! - `c` / `C` — add / remove a consumer process
//! - `q` (or Ctrl-C) — stop every worker, release the region, exit

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shmring::console::{self, Command, Supervisor};
use shmring::ControlBuilder;

fn main() -> io::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // The region must exist before the first fork so children inherit it.
    let control = ControlBuilder::new().with_capacity(1024).build()?;
    let mut supervisor = Supervisor::new(control);

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = Arc::clone(&quit);
        ctrlc::set_handler(move || quit.store(true, Ordering::SeqCst))
            .expect("installing Ctrl-C handler");
    }

    println!("i=info p/P=add/kill producer c/C=add/kill consumer q=quit");

    while !quit.load(Ordering::SeqCst) {
        let key = match console::getch() {
            Ok(key) => key,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                supervisor.shutdown()?;
                return Err(err);
            }
        };
        if supervisor.handle(Command::from_key(key))? {
            break;
        }
    }

    supervisor.shutdown()
}
