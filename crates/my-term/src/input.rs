// SPDX-License-Identifier: MIT
//
// Single-key input.
//
// Raw mode is configured with VMIN=0 / VTIME=1, so `read(2)` on the terminal
// returns after at most 100 ms, with one byte or with none. `read_key` turns
// that into a blocking call from the caller's point of view: zero-byte
// reads are timeouts, not end-of-input, and simply go round again. EINTR and
// EAGAIN go round too. Anything else is a real I/O error.
//
// Between retries the reader asks whether a termination signal arrived, so
// an idle editor still shuts down within one timeout of `kill`.

use std::io::{ErrorKind, Read};

use crate::error::{Error, Result};
use crate::signal;

/// Blocking single-byte key reader over any byte source.
pub struct InputReader<R> {
    source: R,
    termination: fn() -> Option<i32>,
}

impl<R: Read> InputReader<R> {
    /// Wrap `source`. Termination is checked against the process-wide
    /// signal flag.
    #[must_use]
    pub fn new(source: R) -> Self {
        Self {
            source,
            termination: signal::pending_termination,
        }
    }

    /// Replace the termination check consulted between timed-out reads.
    #[must_use]
    pub fn with_termination_check(mut self, check: fn() -> Option<i32>) -> Self {
        self.termination = check;
        self
    }

    /// Block until one byte arrives and return it.
    ///
    /// # Errors
    ///
    /// - [`Error::Terminated`] if a termination signal is pending after a
    ///   timed-out or interrupted read.
    /// - [`Error::Io`] for any read failure other than a timeout, `EINTR`
    ///   or `EAGAIN`.
    pub fn read_key(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(1) => return Ok(byte[0]),
                Ok(_) => {}
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
                Err(source) => return Err(Error::io("read", source)),
            }
            if let Some(sig) = (self.termination)() {
                return Err(Error::Terminated(sig));
            }
        }
    }

    /// The underlying source, for the geometry probe's cursor report.
    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
