// SPDX-License-Identifier: MIT
//
// Event loop — render, read one key, dispatch, repeat.
//
// The loop is strictly sequential: there is exactly one blocking point per
// iteration, the single-byte read, and it wakes at least every read
// timeout. No threads, no channels, no tick timer. The screen only changes
// in response to a key, so drawing once per key is all it takes.
//
// # States
//
//   Running ──(quit key)──▶ Terminated
//
// The quit key clears the screen, homes the cursor and flips the state.
// The loop then hands the terminal back and returns. Every other byte is
// accepted and ignored; a full editor hooks its key dispatch in there.
//
// # Shutdown paths
//
//   quit key            → clear + home, restore, `Exit::Quit`
//   termination signal  → clear + home, restore, `Exit::Signal(n)`
//   any error           → `Err`, which the binary sends to `error::fatal`

use std::io::Write;
use std::os::unix::io::RawFd;

use tracing::{debug, info};

use crate::ansi;
use crate::error::{Error, Result};
use crate::fd::{FdReader, FdWriter};
use crate::geometry::{self, Size};
use crate::input::InputReader;
use crate::render::{RenderConfig, ScreenRenderer};
use crate::signal;
use crate::terminal::{SessionConfig, TerminalSession};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The byte a terminal sends for Ctrl + `key`: the key's low five bits.
#[inline]
#[must_use]
pub const fn ctrl_key(key: u8) -> u8 {
    key & 0x1f
}

/// Ctrl-Q.
pub const QUIT_KEY: u8 = ctrl_key(b'q');

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// What the dispatcher tells the loop to do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Observable loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Drawing frames and reading keys.
    Running,
    /// The quit key was seen; the loop is about to return.
    Terminated,
}

/// Interprets keypresses.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    quit_key: u8,
    state: LoopState,
}

impl Dispatcher {
    /// A running dispatcher that quits on `quit_key`.
    #[must_use]
    pub const fn new(quit_key: u8) -> Self {
        Self {
            quit_key,
            state: LoopState::Running,
        }
    }

    /// Current loop state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Interpret one key.
    ///
    /// The quit key writes clear-screen + cursor-home to `out`, moves to
    /// [`LoopState::Terminated`] and returns [`Action::Quit`]. Anything else
    /// writes nothing and returns [`Action::Continue`]. Keys arriving after
    /// termination are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if writing the clear sequence fails.
    pub fn dispatch(&mut self, key: u8, out: &mut impl Write) -> Result<Action> {
        if self.state == LoopState::Terminated {
            return Ok(Action::Quit);
        }
        if key != self.quit_key {
            return Ok(Action::Continue);
        }

        clear_and_home(out)?;
        self.state = LoopState::Terminated;
        Ok(Action::Quit)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(QUIT_KEY)
    }
}

/// Blank the screen and park the cursor top-left.
fn clear_and_home(out: &mut impl Write) -> Result<()> {
    ansi::clear_screen(out)
        .and_then(|()| ansi::cursor_home(out))
        .and_then(|()| out.flush())
        .map_err(|source| Error::io("write", source))
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

/// Everything the loop can be tuned with. Defaults match a plain terminal
/// editor: full raw mode, 100 ms read timeout, Ctrl-Q quits.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Raw-mode flags and read timeout.
    pub session: SessionConfig,
    /// Banner text and row marker.
    pub render: RenderConfig,
    /// The byte that ends the loop.
    pub quit_key: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            render: RenderConfig::default(),
            quit_key: QUIT_KEY,
        }
    }
}

// ─── Exit ────────────────────────────────────────────────────────────────────

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user pressed the quit key.
    Quit,
    /// A termination signal arrived.
    Signal(i32),
}

impl Exit {
    /// Process exit status: 0 for quit, `128 + signo` for a signal.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Quit => 0,
            Self::Signal(sig) => 128 + sig,
        }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the raw-mode session, the measured screen size, the renderer, and
/// the input and output handles. Call [`run`](Self::run) to enter the loop.
///
/// # Example
///
/// ```no_run
/// use my_term::event_loop::EventLoop;
///
/// let mut event_loop = EventLoop::new()?;
/// let exit = event_loop.run()?;
/// std::process::exit(exit.code());
/// # Ok::<(), my_term::Error>(())
/// ```
pub struct EventLoop {
    session: TerminalSession,
    size: Size,
    renderer: ScreenRenderer,
    dispatcher: Dispatcher,
    input: InputReader<FdReader>,
    output: FdWriter,
}

impl EventLoop {
    /// Enter raw mode and measure the screen with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be entered or the screen cannot
    /// be measured.
    pub fn new() -> Result<Self> {
        Self::with_config(LoopConfig::default())
    }

    /// Take over standard input and output: enter raw mode, install the
    /// termination-signal handlers and measure the screen.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be entered or the screen cannot
    /// be measured. The terminal is restored before returning.
    pub fn with_config(config: LoopConfig) -> Result<Self> {
        signal::install_termination_handlers();
        Self::open(libc::STDIN_FILENO, libc::STDOUT_FILENO, config)
    }

    /// Enter raw mode on `input_fd` and measure the screen, drawing frames
    /// to `output_fd`. No signal handlers are installed.
    ///
    /// The terminal is in raw mode before the geometry probe runs, so a
    /// cursor-report fallback reply is read byte by byte and never echoed.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be entered or the screen cannot
    /// be measured. The terminal is restored before returning.
    pub fn open(input_fd: RawFd, output_fd: RawFd, config: LoopConfig) -> Result<Self> {
        let session = TerminalSession::enter_fd(input_fd, config.session)?;

        let mut input = InputReader::new(FdReader::new(input_fd));
        let mut output = FdWriter::new(output_fd);
        let size = geometry::probe(output.fd(), input.source_mut(), &mut output)?;

        Ok(Self {
            session,
            size,
            renderer: ScreenRenderer::new(config.render),
            dispatcher: Dispatcher::new(config.quit_key),
            input,
            output,
        })
    }

    /// Replace the termination check consulted between timed-out reads.
    #[must_use]
    pub fn with_termination_check(mut self, check: fn() -> Option<i32>) -> Self {
        self.input = self.input.with_termination_check(check);
        self
    }

    /// Run until the quit key or a termination signal.
    ///
    /// The terminal is restored before this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering, reading, or restoring fails.
    pub fn run(&mut self) -> Result<Exit> {
        info!(cols = self.size.cols, rows = self.size.rows, "event loop started");

        while self.dispatcher.state() == LoopState::Running {
            self.renderer.refresh(self.size, &mut self.output)?;

            let key = match self.input.read_key() {
                Ok(key) => key,
                Err(Error::Terminated(sig)) => {
                    info!(signal = sig, "termination signal, shutting down");
                    clear_and_home(&mut self.output)?;
                    self.session.restore()?;
                    return Ok(Exit::Signal(sig));
                }
                Err(e) => return Err(e),
            };

            if self.dispatcher.dispatch(key, &mut self.output)? == Action::Continue {
                debug!(key, "ignored key");
            }
        }

        self.session.restore()?;
        info!("quit");
        Ok(Exit::Quit)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Keys ────────────────────────────────────────────────────

    #[test]
    fn ctrl_masks_to_low_five_bits() {
        assert_eq!(ctrl_key(b'q'), 0x11);
        assert_eq!(ctrl_key(b'Q'), 0x11);
        assert_eq!(ctrl_key(b'a'), 0x01);
        assert_eq!(ctrl_key(b'c'), 0x03);
    }

    #[test]
    fn quit_key_is_ctrl_q() {
        assert_eq!(QUIT_KEY, 0x11);
    }

    // ── Dispatcher ──────────────────────────────────────────────

    #[test]
    fn starts_running() {
        assert_eq!(Dispatcher::default().state(), LoopState::Running);
    }

    #[test]
    fn quit_key_terminates_with_one_clear() {
        let mut d = Dispatcher::default();
        let mut out = Vec::new();

        assert_eq!(d.dispatch(0x11, &mut out).unwrap(), Action::Quit);
        assert_eq!(d.state(), LoopState::Terminated);
        assert_eq!(out, b"\x1b[2J\x1b[H");
    }

    #[test]
    fn other_keys_are_silent_noops() {
        let mut d = Dispatcher::default();
        let mut out = Vec::new();

        for key in [b'a', b'q', b'Q', 0x03, 0x1a, b'\r', 0x1b, 0x7f, 0xff] {
            assert_eq!(d.dispatch(key, &mut out).unwrap(), Action::Continue);
        }
        assert_eq!(d.state(), LoopState::Running);
        assert!(out.is_empty());
    }

    #[test]
    fn keys_after_quit_write_nothing() {
        let mut d = Dispatcher::default();
        let mut out = Vec::new();
        d.dispatch(QUIT_KEY, &mut out).unwrap();
        out.clear();

        assert_eq!(d.dispatch(QUIT_KEY, &mut out).unwrap(), Action::Quit);
        assert_eq!(d.dispatch(b'a', &mut out).unwrap(), Action::Quit);
        assert!(out.is_empty());
        assert_eq!(d.state(), LoopState::Terminated);
    }

    #[test]
    fn custom_quit_key() {
        let mut d = Dispatcher::new(ctrl_key(b'x'));
        let mut out = Vec::new();
        assert_eq!(d.dispatch(QUIT_KEY, &mut out).unwrap(), Action::Continue);
        assert_eq!(d.dispatch(0x18, &mut out).unwrap(), Action::Quit);
    }

    #[test]
    fn quit_write_failure_is_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from_raw_os_error(libc::EIO))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut d = Dispatcher::default();
        let err = d.dispatch(QUIT_KEY, &mut Broken).unwrap_err();
        assert!(matches!(err, Error::Io { op: "write", .. }));
    }

    // ── LoopConfig / Exit ───────────────────────────────────────

    #[test]
    fn default_config() {
        let config = LoopConfig::default();
        assert_eq!(config.quit_key, QUIT_KEY);
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.render, RenderConfig::default());
    }

    #[test]
    fn configured_quit_key_wins() {
        let config = LoopConfig {
            quit_key: ctrl_key(b'x'),
            ..LoopConfig::default()
        };
        assert_eq!(config.quit_key, 0x18);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Exit::Quit.code(), 0);
        assert_eq!(Exit::Signal(libc::SIGTERM).code(), 128 + libc::SIGTERM);
        assert_eq!(Exit::Signal(libc::SIGHUP).code(), 129);
    }

    #[test]
    fn action_equality() {
        assert_eq!(Action::Continue, Action::Continue);
        assert_ne!(Action::Continue, Action::Quit);
    }

    #[test]
    fn open_rejects_non_terminal() {
        let err = EventLoop::open(-1, -1, LoopConfig::default())
            .err()
            .expect("fd -1 is not a terminal");
        assert!(matches!(err, Error::Terminal { .. }));
    }

    // ── Running on a pseudo-terminal ────────────────────────────

    #[cfg(target_os = "linux")]
    mod pty_loop {
        use super::*;
        use crate::pty::{Pty, same_discipline};
        use crate::terminal::TerminalState;
        use pretty_assertions::assert_eq;

        const FRAME_START: &str = "\x1b[?25l\x1b[H";
        const CLEAR: &str = "\x1b[2J\x1b[H";

        const fn no_signal() -> Option<i32> {
            None
        }

        const fn sigterm() -> Option<i32> {
            Some(libc::SIGTERM)
        }

        /// A 20x10 pty, its discipline before raw mode, and a loop on it.
        fn open_loop(check: fn() -> Option<i32>) -> Option<(Pty, TerminalState, EventLoop)> {
            let pty = Pty::open()?;
            if !pty.set_size(20, 10) {
                return None;
            }
            let before = TerminalState::capture(pty.slave()).ok()?;
            let event_loop = EventLoop::open(pty.slave(), pty.slave(), LoopConfig::default())
                .ok()?
                .with_termination_check(check);
            Some((pty, before, event_loop))
        }

        #[test]
        fn draws_a_frame_per_key_then_quits() {
            let Some((pty, before, mut event_loop)) = open_loop(no_signal) else { return };
            assert!(pty.send(b"a\x11"));

            assert_eq!(event_loop.run().unwrap(), Exit::Quit);

            let out = String::from_utf8(pty.drain()).unwrap();
            assert_eq!(out.matches(FRAME_START).count(), 2, "{out:?}");
            assert!(out.starts_with(FRAME_START));
            assert_eq!(out.matches(CLEAR).count(), 1);
            assert!(out.ends_with(CLEAR));
            assert!(out.contains("my-editor -- version"));

            let after = TerminalState::capture(pty.slave()).unwrap();
            assert!(same_discipline(before.termios(), after.termios()));
        }

        #[test]
        fn termination_clears_restores_and_reports_signal() {
            let Some((pty, before, mut event_loop)) = open_loop(sigterm) else { return };

            assert_eq!(event_loop.run().unwrap(), Exit::Signal(libc::SIGTERM));
            assert_eq!(Exit::Signal(libc::SIGTERM).code(), 143);

            let out = String::from_utf8(pty.drain()).unwrap();
            assert_eq!(out.matches(FRAME_START).count(), 1, "{out:?}");
            assert!(out.ends_with(CLEAR));

            let after = TerminalState::capture(pty.slave()).unwrap();
            assert!(same_discipline(before.termios(), after.termios()));
        }
    }
}
