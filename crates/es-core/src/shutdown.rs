//! Operator stop signal.
//!
//! SIGINT and SIGTERM set a process-wide flag. The collector polls it
//! between ticks, so a write in progress is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// The process-wide stop flag.
pub fn stop_flag() -> &'static AtomicBool {
    &STOP_REQUESTED
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    // Only an atomic store: async-signal-safe.
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the stop flag.
#[cfg(unix)]
pub fn install_handlers() -> std::io::Result<()> {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only performs an atomic store.
        let previous = unsafe { libc::signal(signum, handler) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_handlers() -> std::io::Result<()> {
    Ok(())
}
