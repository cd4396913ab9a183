// SPDX-License-Identifier: MIT
//
// Error taxonomy and the single fatal exit path.
//
// Nothing in this crate is recoverable: a terminal that cannot be put into
// raw mode, measured, read from or written to leaves the editor with no
// safe way to keep drawing. Every error therefore ends up in [`fatal`],
// which wipes the screen, hands the terminal back to the shell, reports
// the failing operation with its OS error, and exits with status 1.

use std::io;
use std::process;

use thiserror::Error;
use tracing::error;

use crate::ansi;
use crate::terminal;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong in the terminal core.
#[derive(Debug, Error)]
pub enum Error {
    /// Querying or setting the terminal discipline failed.
    #[error("{op}: {source}")]
    Terminal {
        /// The libc call that failed (`tcgetattr`, `tcsetattr`).
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Neither geometry path produced a usable screen size.
    #[error("window size: {0}")]
    Geometry(#[from] GeometryError),

    /// A read or write on the terminal failed for a reason other than a
    /// read timeout.
    #[error("{op}: {source}")]
    Io {
        /// The operation that failed (`read`, `write`).
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A termination signal arrived while waiting for input.
    #[error("terminated by signal {0}")]
    Terminated(i32),
}

/// Why the screen size could not be determined.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Writing the cursor-report request or reading its reply failed.
    #[error("cursor position request failed: {0}")]
    Request(#[source] io::Error),

    /// The reply was not `ESC [ rows ; cols`.
    #[error("malformed cursor position report")]
    Malformed,

    /// The terminal reported a zero dimension.
    #[error("terminal reported an empty {cols}x{rows} screen")]
    Empty { cols: u16, rows: u16 },
}

impl Error {
    /// A discipline error carrying `errno` from the call that just failed.
    #[must_use]
    pub fn terminal(op: &'static str) -> Self {
        Self::Terminal {
            op,
            source: io::Error::last_os_error(),
        }
    }

    /// An I/O error tagged with the failing operation.
    #[must_use]
    pub const fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }
}

/// The line the fatal path prints: `<program>: <operation>: <os error>`.
#[must_use]
pub fn diagnostic(program: &str, err: &Error) -> String {
    format!("{program}: {err}")
}

/// Clear the screen, restore the terminal, report `err` as `program`, exit
/// with status 1.
///
/// The clear goes straight to fd 1 so a half-written frame or a poisoned
/// stdout lock cannot swallow it. Restoration runs before the message is
/// printed so the diagnostic lands on a terminal with output processing
/// back on.
pub fn fatal(program: &str, err: &Error) -> ! {
    error!(error = %err, "fatal terminal error");

    terminal::write_to_stdout_fd(ansi::FATAL_CLEAR);
    terminal::restore_from_backup();

    eprintln!("{}", diagnostic(program, err));
    process::exit(1);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn terminal_error_reads_like_perror() {
        let err = Error::Terminal {
            op: "tcsetattr",
            source: io::Error::from_raw_os_error(libc::ENOTTY),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("tcsetattr: "), "{msg}");
    }

    #[test]
    fn io_error_names_operation() {
        let err = Error::io("read", io::Error::other("boom"));
        assert_eq!(err.to_string(), "read: boom");
    }

    #[test]
    fn geometry_error_converts() {
        let err: Error = GeometryError::Malformed.into();
        assert!(matches!(err, Error::Geometry(GeometryError::Malformed)));
        assert_eq!(err.to_string(), "window size: malformed cursor position report");
    }

    #[test]
    fn empty_geometry_message() {
        let err = GeometryError::Empty { cols: 0, rows: 24 };
        assert_eq!(err.to_string(), "terminal reported an empty 0x24 screen");
    }

    #[test]
    fn terminal_constructor_captures_errno() {
        match Error::terminal("tcgetattr") {
            Error::Terminal { op, source } => {
                assert_eq!(op, "tcgetattr");
                assert!(source.raw_os_error().is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn diagnostic_prefixes_program_name() {
        let err = Error::Terminal {
            op: "tcgetattr",
            source: io::Error::from_raw_os_error(libc::ENOTTY),
        };
        let line = diagnostic("my-editor", &err);
        assert!(line.starts_with("my-editor: tcgetattr: "), "{line}");
        assert!(line.ends_with(&format!("(os error {})", libc::ENOTTY)), "{line}");
    }

    #[test]
    fn diagnostic_for_read_failure() {
        let err = Error::io("read", io::Error::other("boom"));
        assert_eq!(diagnostic("ed", &err), "ed: read: boom");
    }

    #[test]
    fn terminated_message() {
        assert_eq!(Error::Terminated(15).to_string(), "terminated by signal 15");
    }
}
