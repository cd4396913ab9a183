// SPDX-License-Identifier: MIT
//
// Terminal session — raw mode with guaranteed restoration.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), atexit, and raw fd writes. These are the standard POSIX
// interfaces for terminal control — there is no safe alternative. Each
// unsafe block is minimal.
#![allow(unsafe_code)]
//
// The session captures the terminal discipline once, switches to raw mode,
// and hands the original back exactly once, whichever way the process ends:
//
//   - normal scope exit          → `Drop`
//   - explicit teardown          → `TerminalSession::restore`
//   - `process::exit` anywhere   → the `atexit` hook
//   - panic                      → the panic hook
//   - fatal error                → `error::fatal`
//
// The last three cannot reach the session value, so `enter` also files a
// copy of the original discipline in a process-wide backup. Whoever
// restores first removes the entry; everyone after finds nothing to do.

use std::io::Write;
use std::os::unix::io::RawFd;
use std::sync::{Mutex, Once, PoisonError};

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::ansi;
use crate::error::{Error, Result};
use crate::fd::FdWriter;

// ─── Raw Mode Flags ─────────────────────────────────────────────────────────

bitflags! {
    /// The discipline changes raw mode applies, one flag per termios bit.
    ///
    /// [`RawFlags::all`] is what [`TerminalSession::enter`] uses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RawFlags: u16 {
        /// Clear `BRKINT`: a break condition does not raise SIGINT.
        const NO_BREAK_SIGNAL      = 1 << 0;
        /// Clear `IXON`: Ctrl-S / Ctrl-Q reach the program.
        const NO_FLOW_CONTROL      = 1 << 1;
        /// Clear `ICRNL`: Enter arrives as `\r`, Ctrl-M as 13.
        const NO_CR_TRANSLATION    = 1 << 2;
        /// Clear `INPCK`: no input parity checking.
        const NO_PARITY_CHECK      = 1 << 3;
        /// Clear `ISTRIP`: keep the 8th bit of every input byte.
        const NO_STRIP_HIGH_BIT    = 1 << 4;
        /// Clear `OPOST`: `\n` is not turned into `\r\n` on output.
        const NO_OUTPUT_PROCESSING = 1 << 5;
        /// Clear `ECHO`.
        const NO_ECHO              = 1 << 6;
        /// Clear `ICANON`: bytes arrive as typed, not per line.
        const NO_CANONICAL         = 1 << 7;
        /// Clear `ISIG`: Ctrl-C / Ctrl-Z arrive as bytes.
        const NO_SIGNALS           = 1 << 8;
        /// Clear `IEXTEN`: Ctrl-V arrives as a byte.
        const NO_EXTENDED_INPUT    = 1 << 9;
        /// Force 8-bit characters (`CS8`).
        const EIGHT_BIT_CHARS      = 1 << 10;
    }
}

#[inline]
const fn pick(on: bool, bit: libc::tcflag_t) -> libc::tcflag_t {
    if on { bit } else { 0 }
}

impl RawFlags {
    /// Apply these changes to a termios snapshot.
    pub fn apply(self, t: &mut libc::termios) {
        t.c_iflag &= !(pick(self.contains(Self::NO_BREAK_SIGNAL), libc::BRKINT)
            | pick(self.contains(Self::NO_FLOW_CONTROL), libc::IXON)
            | pick(self.contains(Self::NO_CR_TRANSLATION), libc::ICRNL)
            | pick(self.contains(Self::NO_PARITY_CHECK), libc::INPCK)
            | pick(self.contains(Self::NO_STRIP_HIGH_BIT), libc::ISTRIP));

        t.c_oflag &= !pick(self.contains(Self::NO_OUTPUT_PROCESSING), libc::OPOST);

        t.c_lflag &= !(pick(self.contains(Self::NO_ECHO), libc::ECHO)
            | pick(self.contains(Self::NO_CANONICAL), libc::ICANON)
            | pick(self.contains(Self::NO_SIGNALS), libc::ISIG)
            | pick(self.contains(Self::NO_EXTENDED_INPUT), libc::IEXTEN));

        if self.contains(Self::EIGHT_BIT_CHARS) {
            t.c_cflag &= !libc::CSIZE;
            t.c_cflag |= libc::CS8;
        }
    }
}

// ─── Session Config ─────────────────────────────────────────────────────────

/// How raw mode is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Discipline changes to apply.
    pub flags: RawFlags,
    /// `VTIME`: how long a read waits for its first byte, in tenths of a
    /// second. `VMIN` is always 0, so a read that times out returns zero
    /// bytes instead of blocking forever.
    pub read_timeout_ds: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flags: RawFlags::all(),
            read_timeout_ds: 1, // 100 ms
        }
    }
}

// ─── Terminal State ─────────────────────────────────────────────────────────

/// Snapshot of a terminal's discipline, taken before raw mode.
#[derive(Clone, Copy)]
pub struct TerminalState(libc::termios);

impl TerminalState {
    /// Read the current discipline of `fd`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminal`] if `fd` is not a terminal or `tcgetattr`
    /// fails.
    pub fn capture(fd: RawFd) -> Result<Self> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(Error::terminal("tcgetattr"));
        }
        Ok(Self(termios))
    }

    /// Apply this discipline to `fd`, discarding unread input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminal`] if `tcsetattr` fails.
    pub fn apply(&self, fd: RawFd) -> Result<()> {
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const self.0) } != 0 {
            return Err(Error::terminal("tcsetattr"));
        }
        Ok(())
    }

    /// The raw termios value.
    #[must_use]
    pub const fn termios(&self) -> &libc::termios {
        &self.0
    }

    /// This snapshot with raw mode applied on top.
    #[must_use]
    pub fn to_raw(&self, config: SessionConfig) -> Self {
        let mut raw = self.0;
        config.flags.apply(&mut raw);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = config.read_timeout_ds;
        Self(raw)
    }
}

impl std::fmt::Debug for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalState")
            .field("iflag", &format_args!("{:#x}", self.0.c_iflag))
            .field("oflag", &format_args!("{:#x}", self.0.c_oflag))
            .field("cflag", &format_args!("{:#x}", self.0.c_cflag))
            .field("lflag", &format_args!("{:#x}", self.0.c_lflag))
            .finish_non_exhaustive()
    }
}

// ─── Process-Wide Backup ────────────────────────────────────────────────────

/// Original discipline of every terminal currently in raw mode, keyed by fd.
///
/// The [`TerminalSession`] owns its own copy; this backup is for the hooks
/// that can't reach it. Behind a [`Mutex`], not `static mut`.
static BACKUP: Mutex<Vec<(RawFd, TerminalState)>> = Mutex::new(Vec::new());

fn file_backup(fd: RawFd, state: TerminalState) {
    let mut guard = BACKUP.lock().unwrap_or_else(PoisonError::into_inner);
    guard.retain(|(f, _)| *f != fd);
    guard.push((fd, state));
}

/// Remove the backup entry for `fd`. `false` if someone already restored it.
fn claim_backup(fd: RawFd) -> bool {
    let mut guard = BACKUP.lock().unwrap_or_else(PoisonError::into_inner);
    let before = guard.len();
    guard.retain(|(f, _)| *f != fd);
    guard.len() != before
}

/// Empty the backup, handing its entries to the caller.
fn take_backup() -> Vec<(RawFd, TerminalState)> {
    std::mem::take(&mut *BACKUP.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Restore every terminal still in raw mode. Best-effort, ignores errors.
///
/// Used by the exit hook and the fatal path. Safe to call any number of
/// times: entries are removed as they are restored.
pub fn restore_from_backup() {
    for (fd, state) in take_backup() {
        let _ = state.apply(fd);
    }
}

/// Clear the screen on `out` and restore `entries`.
///
/// Does nothing when `entries` is empty, so a panic after the session has
/// been handed back leaves the screen alone. Returns whether it cleared.
fn restore_after_panic(entries: Vec<(RawFd, TerminalState)>, out: &mut impl Write) -> bool {
    if entries.is_empty() {
        return false;
    }
    let _ = out.write_all(ansi::FATAL_CLEAR);
    for (fd, state) in entries {
        let _ = state.apply(fd);
    }
    true
}

/// Write `bytes` directly to fd 1.
///
/// Bypasses Rust's `io::stdout()` lock so it cannot deadlock if the lock
/// was held when things went wrong.
pub fn write_to_stdout_fd(bytes: &[u8]) {
    unsafe {
        let _ = libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

// ─── Exit and Panic Hooks ───────────────────────────────────────────────────

/// Hook guard — ensures the hooks are installed at most once per process.
static HOOKS_INSTALLED: Once = Once::new();

extern "C" fn restore_at_exit() {
    restore_from_backup();
}

/// Register the `atexit` and panic hooks.
///
/// `process::exit` skips destructors, so without the `atexit` hook any exit
/// that doesn't unwind through the session would leave the shell in raw
/// mode. While a terminal is raw, the panic hook clears the screen and
/// restores termios before the original handler prints, so the message
/// lands on a working terminal.
fn install_hooks() {
    HOOKS_INSTALLED.call_once(|| {
        if unsafe { libc::atexit(restore_at_exit) } != 0 {
            warn!("atexit registration failed; relying on Drop for restore");
        }

        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_after_panic(take_backup(), &mut FdWriter::stdout());
            original(info);
        }));
    });
}

// ─── TerminalSession ────────────────────────────────────────────────────────

/// Exclusive raw-mode session on one terminal, restored exactly once.
///
/// # Example
///
/// ```no_run
/// use my_term::terminal::TerminalSession;
///
/// let mut session = TerminalSession::enter()?;
/// // ... draw frames, read keys ...
/// session.restore()?; // or let it drop
/// # Ok::<(), my_term::Error>(())
/// ```
pub struct TerminalSession {
    fd: RawFd,
    /// Discipline captured before raw mode. `None` once restored.
    original: Option<TerminalState>,
}

impl TerminalSession {
    /// Put standard input's terminal into raw mode with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminal`] if stdin is not a terminal or the
    /// discipline cannot be read or set.
    pub fn enter() -> Result<Self> {
        Self::enter_fd(libc::STDIN_FILENO, SessionConfig::default())
    }

    /// Put the terminal behind `fd` into raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminal`] if `fd` is not a terminal or the
    /// discipline cannot be read or set.
    pub fn enter_fd(fd: RawFd, config: SessionConfig) -> Result<Self> {
        let original = TerminalState::capture(fd)?;

        install_hooks();
        file_backup(fd, original);

        if let Err(e) = original.to_raw(config).apply(fd) {
            claim_backup(fd);
            return Err(e);
        }

        debug!(fd, ?config, "entered raw mode");
        Ok(Self {
            fd,
            original: Some(original),
        })
    }

    /// Hand the original discipline back to the terminal.
    ///
    /// Idempotent: later calls, and calls after a hook already restored the
    /// terminal, do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminal`] if `tcsetattr` fails. The session is
    /// considered finished either way; there is nothing left to retry with.
    pub fn restore(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        if !claim_backup(self.fd) {
            debug!(fd = self.fd, "terminal already restored by exit path");
            return Ok(());
        }
        original.apply(self.fd)?;
        debug!(fd = self.fd, "restored terminal discipline");
        Ok(())
    }

    /// Whether this session still holds the terminal in raw mode.
    #[inline]
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.original.is_some()
    }

    /// The terminal's file descriptor.
    #[inline]
    #[must_use]
    pub const fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "failed to restore terminal on drop");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
