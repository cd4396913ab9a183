// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Termination signals.
//
// Raw mode turns Ctrl-C into a plain byte, but `kill`, a closing terminal
// window (SIGHUP) or a supervisor can still end the process. The default
// action for those signals kills us without running `atexit`, leaving the
// shell in raw mode. Instead the handler records the signal number, and the
// input reader, which wakes at least every read timeout, notices and lets
// the event loop shut down through the normal restore path.
//
// Installed without SA_RESTART so a blocked read returns EINTR at once.

use std::sync::Once;
use std::sync::atomic::{AtomicI32, Ordering};

/// Signals that end the event loop.
pub const TERMINATION_SIGNALS: [libc::c_int; 3] = [libc::SIGTERM, libc::SIGHUP, libc::SIGINT];

/// Last termination signal received, or 0.
static TERMINATION: AtomicI32 = AtomicI32::new(0);

static HANDLERS_INSTALLED: Once = Once::new();

/// Install the handler for [`TERMINATION_SIGNALS`]. Once per process.
pub fn install_termination_handlers() {
    HANDLERS_INSTALLED.call_once(|| unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = on_termination as *const () as usize;
        sa.sa_flags = 0;
        libc::sigemptyset(&raw mut sa.sa_mask);
        for sig in TERMINATION_SIGNALS {
            libc::sigaction(sig, &raw const sa, std::ptr::null_mut());
        }
    });
}

/// Async-signal-safe: a single atomic store.
extern "C" fn on_termination(sig: libc::c_int) {
    TERMINATION.store(sig, Ordering::Relaxed);
}

/// The termination signal received so far, if any.
#[must_use]
pub fn pending_termination() -> Option<i32> {
    match TERMINATION.load(Ordering::Relaxed) {
        0 => None,
        sig => Some(sig),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_records_signal() {
        // The only test that touches the global flag.
        assert_eq!(pending_termination(), None);
        on_termination(libc::SIGHUP);
        assert_eq!(pending_termination(), Some(libc::SIGHUP));
        TERMINATION.store(0, Ordering::Relaxed);
        assert_eq!(pending_termination(), None);
    }

    #[test]
    fn terminal_interrupt_is_covered() {
        assert!(TERMINATION_SIGNALS.contains(&libc::SIGINT));
        assert!(TERMINATION_SIGNALS.contains(&libc::SIGTERM));
        assert!(TERMINATION_SIGNALS.contains(&libc::SIGHUP));
    }
}
