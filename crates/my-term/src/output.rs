// SPDX-License-Identifier: MIT
//
// Frame staging buffer.
//
// Every byte of a frame (escape sequences, row content, line breaks) goes
// into a `RenderBuffer` first, and the whole thing is handed to the
// terminal in one `write_all`. Many small writes let the terminal repaint
// between them and the user sees the cursor skate across the screen; one
// write does not.

use std::io::{self, Write};

/// Append-only byte buffer holding one frame.
///
/// Created fresh for each refresh and consumed by [`flush_to`](Self::flush_to)
/// or [`discard`](Self::discard). Grows as needed; there is no size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBuffer {
    buf: Vec<u8>,
}

/// Enough for a full 80×24 frame with room to spare.
const DEFAULT_CAPACITY: usize = 4096;

impl RenderBuffer {
    /// Create an empty buffer with default capacity (4 KB).
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer that can hold `capacity` bytes before growing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Copy `bytes` onto the end of the buffer.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Release the buffer without writing it anywhere.
    pub fn discard(self) {
        drop(self);
    }

    /// Write the whole buffer to `w` in one call, then release it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
        }
        Ok(())
    }
}

impl Write for RenderBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. Real flushing is flush_to().
        Ok(())
    }
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
