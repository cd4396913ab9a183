// SPDX-License-Identifier: MIT
//
// Screen renderer — one frame, one write.
//
// A frame is composed top to bottom into a fresh `RenderBuffer`:
//
//   hide cursor, home
//   row 0            marker, clear-to-EOL, \r\n
//   ...
//   row rows/3       marker, padding, banner, clear-to-EOL, \r\n
//   ...
//   row rows-1       marker, clear-to-EOL            (no line break)
//   home, show cursor
//
// The cursor is hidden while the frame paints so it doesn't flicker across
// the screen. Each row ends with clear-to-EOL instead of clearing the whole
// screen up front, so nothing is blanked and redrawn visibly, and leftovers
// from a wider previous frame still disappear. The last row has no line
// break: a `\r\n` there would scroll the terminal by one line.
//
// Rows other than the banner carry only the marker glyph. They are where a
// real editor's text lines will go.

use std::io::Write;

use crate::ansi;
use crate::error::{Error, Result};
use crate::geometry::Size;
use crate::output::RenderBuffer;

/// Glyph drawn at the start of every empty row.
pub const DEFAULT_MARKER: u8 = b'*';

/// What the renderer draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Banner text, centered on the row a third of the way down.
    pub title: String,
    /// Glyph that starts every row.
    pub marker: u8,
}

impl RenderConfig {
    /// A banner reading `<name> -- version <version>`.
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            title: format!("{name} -- version {version}"),
            marker: DEFAULT_MARKER,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new("my-editor", env!("CARGO_PKG_VERSION"))
    }
}

/// Compose the banner row: marker, left padding, title.
///
/// The title is cut to `cols` bytes if it doesn't fit. The left padding is
/// `(cols - len) / 2`; when it is non-zero the marker takes its first slot.
#[must_use]
pub fn banner_line(title: &[u8], cols: u16, marker: u8) -> Vec<u8> {
    let cols = usize::from(cols);
    let title = &title[..title.len().min(cols)];
    let mut padding = (cols - title.len()) / 2;

    let mut line = Vec::with_capacity(padding + title.len());
    if padding > 0 {
        line.push(marker);
        padding -= 1;
    }
    line.resize(line.len() + padding, b' ');
    line.extend_from_slice(title);
    line
}

/// Composes frames and writes them out.
#[derive(Debug, Clone, Default)]
pub struct ScreenRenderer {
    config: RenderConfig,
}

impl ScreenRenderer {
    /// A renderer drawing the banner and marker from `config`.
    #[must_use]
    pub const fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// The row the banner is drawn on.
    #[inline]
    #[must_use]
    pub const fn banner_row(size: Size) -> u16 {
        size.rows / 3
    }

    /// Build the complete frame for a screen of `size`.
    #[must_use]
    pub fn compose(&self, size: Size) -> RenderBuffer {
        let mut frame = RenderBuffer::new();
        frame.append(ansi::CURSOR_HIDE);
        frame.append(ansi::CURSOR_HOME);
        self.draw_rows(size, &mut frame);
        frame.append(ansi::CURSOR_HOME);
        frame.append(ansi::CURSOR_SHOW);
        frame
    }

    fn draw_rows(&self, size: Size, frame: &mut RenderBuffer) {
        let banner_row = Self::banner_row(size);
        for row in 0..size.rows {
            if row == banner_row {
                frame.append(&banner_line(self.config.title.as_bytes(), size.cols, self.config.marker));
            } else {
                frame.push(self.config.marker);
            }

            frame.append(ansi::CLEAR_LINE);
            if row + 1 < size.rows {
                frame.append(ansi::LINE_BREAK);
            }
        }
    }

    /// Compose a frame and write it to `out` in a single write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub fn refresh(&self, size: Size, out: &mut impl Write) -> Result<()> {
        self.compose(size)
            .flush_to(out)
            .map_err(|source| Error::io("write", source))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
