// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Screen geometry discovery.
//
// The primary path asks the kernel with `ioctl(TIOCGWINSZ)`. Some terminals
// (serial lines, a few emulators, odd multiplexer setups) answer with an
// error or with zero columns. In that case the probe falls back to asking
// the terminal itself: push the cursor far past the bottom-right corner
// (the terminal clamps it to the real corner), then request a cursor
// position report and read back `ESC [ rows ; cols R`.
//
// Either path yields a full geometry or an error, never something in
// between. A terminal we cannot measure is a terminal we cannot draw on.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::io::RawFd;

use tracing::{debug, warn};

use crate::ansi;
use crate::error::{GeometryError, Result};

/// Cursor reports longer than this are treated as garbage.
///
/// `ESC [ 65535 ; 65535` is 13 bytes; 32 leaves room for a terminal that
/// pads its reply while still bounding a report that never terminates.
const REPORT_CAPACITY: usize = 32;

/// Far enough right and down to reach the corner of any real terminal.
/// Terminals clamp cursor moves, so the cursor lands on the last cell.
const FAR_CORNER: u16 = 999;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Both dimensions are non-zero.
    #[inline]
    #[must_use]
    pub const fn is_usable(self) -> bool {
        self.cols > 0 && self.rows > 0
    }
}

// ─── Primary Path ───────────────────────────────────────────────────────────

/// Query the size of the terminal behind `fd` via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if `fd` is not a terminal, the query fails, or the kernel
/// reports a zero dimension.
#[must_use]
pub fn query_window_size(fd: RawFd) -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };

    let size = Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    };
    (result == 0 && size.is_usable()).then_some(size)
}

// ─── Fallback Path ──────────────────────────────────────────────────────────

/// Measure the terminal by moving the cursor to the far corner and asking
/// where it ended up.
///
/// Writes the move and the report request to `output`, then reads the
/// reply from `input`.
///
/// # Errors
///
/// - [`GeometryError::Request`] if writing the request or reading the reply
///   fails.
/// - [`GeometryError::Malformed`] if the reply is not a cursor report.
/// - [`GeometryError::Empty`] if the reported position has a zero in it.
pub fn probe_cursor(input: &mut impl Read, output: &mut impl Write) -> Result<Size, GeometryError> {
    ansi::cursor_forward(output, FAR_CORNER)
        .and_then(|()| ansi::cursor_down(output, FAR_CORNER))
        .and_then(|()| ansi::request_cursor_position(output))
        .and_then(|()| output.flush())
        .map_err(GeometryError::Request)?;

    let mut scratch = [0u8; REPORT_CAPACITY];
    let len = read_cursor_report(input, &mut scratch)?;
    parse_cursor_report(&scratch[..len])
}

/// Read a cursor report into `scratch`, one byte at a time, up to but not
/// including the terminating `R`.
///
/// Stops early on `R`, on a zero-byte read (the raw-mode read timeout), or
/// one byte short of capacity. Returns the number of bytes stored.
fn read_cursor_report(input: &mut impl Read, scratch: &mut [u8]) -> Result<usize, GeometryError> {
    let mut len = 0;
    let mut byte = [0u8; 1];
    while len < scratch.len() - 1 {
        match input.read(&mut byte) {
            Ok(1) => {}
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(GeometryError::Request(e)),
        }
        if byte[0] == b'R' {
            break;
        }
        scratch[len] = byte[0];
        len += 1;
    }
    Ok(len)
}

/// Parse `ESC [ rows ; cols` (the report with its `R` already stripped).
///
/// # Errors
///
/// [`GeometryError::Malformed`] unless the input is exactly `ESC [`, a
/// decimal row, `;`, a decimal column. [`GeometryError::Empty`] if either
/// number is zero.
pub fn parse_cursor_report(report: &[u8]) -> Result<Size, GeometryError> {
    let body = report.strip_prefix(b"\x1b[").ok_or(GeometryError::Malformed)?;
    let text = std::str::from_utf8(body).map_err(|_| GeometryError::Malformed)?;
    let (rows, cols) = text.split_once(';').ok_or(GeometryError::Malformed)?;

    let size = Size {
        cols: parse_dimension(cols)?,
        rows: parse_dimension(rows)?,
    };
    if !size.is_usable() {
        return Err(GeometryError::Empty {
            cols: size.cols,
            rows: size.rows,
        });
    }
    Ok(size)
}

fn parse_dimension(s: &str) -> Result<u16, GeometryError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GeometryError::Malformed);
    }
    s.parse().map_err(|_| GeometryError::Malformed)
}

// ─── Probe ──────────────────────────────────────────────────────────────────

/// Determine the screen size: `TIOCGWINSZ` on `fd`, then the cursor-report
/// fallback over `input` / `output`.
///
/// # Errors
///
/// Returns [`Error::Geometry`](crate::Error::Geometry) if the fallback is
/// needed and fails.
pub fn probe(fd: RawFd, input: &mut impl Read, output: &mut impl Write) -> Result<Size> {
    if let Some(size) = query_window_size(fd) {
        debug!(cols = size.cols, rows = size.rows, "window size from TIOCGWINSZ");
        return Ok(size);
    }

    warn!(fd, "TIOCGWINSZ unavailable, probing with cursor position report");
    let size = probe_cursor(input, output)?;
    debug!(cols = size.cols, rows = size.rows, "window size from cursor report");
    Ok(size)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
