// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Every control sequence the core sends to the terminal lives here, both as
// a byte constant (for staging into a frame buffer) and as a function that
// writes it to any `impl Write` (for one-off output such as the quit path).
// No state and no decisions about when to emit: that belongs to the
// renderer and the dispatcher.
//
// All functions return `io::Result` propagated from the underlying writer.
// When the writer is a `RenderBuffer` (backed by a Vec) they never fail.
use std::io::{self, Write};

// ─── Sequences ───────────────────────────────────────────────────────────────

/// Erase the whole display (ED 2).
pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J";

/// Move the cursor to the top-left cell (CUP with no parameters).
pub const CURSOR_HOME: &[u8] = b"\x1b[H";

/// Hide the cursor (DECTCEM reset).
pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";

/// Show the cursor (DECTCEM set).
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

/// Erase from the cursor to the end of the line (EL 0).
pub const CLEAR_LINE: &[u8] = b"\x1b[K";

/// Ask the terminal to report the cursor position (DSR 6).
///
/// The reply arrives on stdin as `ESC [ row ; col R`.
pub const REQUEST_CURSOR_POSITION: &[u8] = b"\x1b[6n";

/// Row separator. Output post-processing is off in raw mode, so the
/// carriage return has to be explicit.
pub const LINE_BREAK: &[u8] = b"\r\n";

/// What the fatal path leaves behind: a blank screen, the cursor at home,
/// and the cursor visible again in case a frame was cut off mid-flight.
pub const FATAL_CLEAR: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to the top-left cell.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CURSOR_HOME)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CURSOR_HIDE)
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CURSOR_SHOW)
}

/// Move the cursor `n` columns right (CUF), clamped by the terminal.
#[inline]
pub fn cursor_forward(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}C")
}

/// Move the cursor `n` rows down (CUD), clamped by the terminal.
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}B")
}

/// Request a cursor position report (DSR 6).
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(REQUEST_CURSOR_POSITION)
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2). Does not move the cursor.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CLEAR_SCREEN)
}

/// Clear from the cursor to the end of the current line (EL 0).
#[inline]
pub fn clear_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CLEAR_LINE)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
