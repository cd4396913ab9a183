// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Pseudo-terminal pairs for tests.
//
// Tests that need a real terminal discipline (tcgetattr, TIOCGWINSZ) get
// one from /dev/ptmx instead of touching the terminal running the tests.
// `open` returns `None` when the sandbox has no pty support; callers skip.

use std::ffi::CStr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Two disciplines agree on every field `tcsetattr` round-trips.
pub fn same_discipline(a: &libc::termios, b: &libc::termios) -> bool {
    a.c_iflag == b.c_iflag
        && a.c_oflag == b.c_oflag
        && a.c_cflag == b.c_cflag
        && a.c_lflag == b.c_lflag
        && a.c_cc == b.c_cc
        && unsafe { libc::cfgetispeed(a) == libc::cfgetispeed(b) }
        && unsafe { libc::cfgetospeed(a) == libc::cfgetospeed(b) }
}

pub struct Pty {
    master: OwnedFd,
    slave: OwnedFd,
}

impl Pty {
    pub fn open() -> Option<Self> {
        unsafe {
            let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            if master < 0 {
                return None;
            }
            let master = OwnedFd::from_raw_fd(master);
            if libc::grantpt(master.as_raw_fd()) != 0 || libc::unlockpt(master.as_raw_fd()) != 0 {
                return None;
            }

            let mut name = [0 as libc::c_char; 128];
            if libc::ptsname_r(master.as_raw_fd(), name.as_mut_ptr(), name.len()) != 0 {
                return None;
            }
            let path = CStr::from_ptr(name.as_ptr());

            let slave = libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NOCTTY);
            if slave < 0 {
                return None;
            }
            Some(Self {
                master,
                slave: OwnedFd::from_raw_fd(slave),
            })
        }
    }

    pub fn master(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    pub fn slave(&self) -> RawFd {
        self.slave.as_raw_fd()
    }

    /// Type `bytes` into the terminal, as if from a keyboard.
    pub fn send(&self, bytes: &[u8]) -> bool {
        let n = unsafe { libc::write(self.master(), bytes.as_ptr().cast(), bytes.len()) };
        usize::try_from(n).is_ok_and(|n| n == bytes.len())
    }

    /// Everything written to the slave side so far.
    pub fn drain(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        let mut pfd = libc::pollfd {
            fd: self.master(),
            events: libc::POLLIN,
            revents: 0,
        };
        while unsafe { libc::poll(&raw mut pfd, 1, 50) } > 0 {
            let n = unsafe { libc::read(self.master(), buf.as_mut_ptr().cast(), buf.len()) };
            match usize::try_from(n) {
                Ok(0) | Err(_) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
            }
        }
        out
    }

    /// Set the window size the slave side reports.
    pub fn set_size(&self, cols: u16, rows: u16) -> bool {
        let ws = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        unsafe { libc::ioctl(self.master(), libc::TIOCSWINSZ, &raw const ws) == 0 }
    }
}
