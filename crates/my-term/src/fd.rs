// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Unbuffered reader and writer over raw file descriptors.
//
// `io::stdin()` sits behind an 8 KB `BufReader` and `io::stdout()` behind a
// `LineWriter`. Neither fits a raw-mode terminal: a buffered stdin would
// swallow the cursor-position reply during geometry probing, and a
// line-buffered stdout splits every frame at its first `\r\n`, turning one
// write into several. These handles go straight to `read(2)`/`write(2)`.
//
// They borrow the descriptor; nothing is closed on drop.

use std::io::{self, Read, Write};
use std::os::unix::io::RawFd;

/// A `Read` over a raw descriptor with no buffering.
#[derive(Debug, Clone, Copy)]
pub struct FdReader {
    fd: RawFd,
}

impl FdReader {
    /// Read from `fd`. The descriptor stays owned by the caller.
    #[must_use]
    pub const fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl Read for FdReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }
}

/// A `Write` over a raw descriptor with no buffering. `flush` is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct FdWriter {
    fd: RawFd,
}

impl FdWriter {
    /// Write to `fd`. The descriptor stays owned by the caller.
    #[must_use]
    pub const fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    /// Standard output.
    #[must_use]
    pub const fn stdout() -> Self {
        Self::new(libc::STDOUT_FILENO)
    }

    /// The wrapped descriptor.
    #[inline]
    #[must_use]
    pub const fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Write for FdWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
