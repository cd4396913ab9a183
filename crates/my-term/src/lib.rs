// SPDX-License-Identifier: MIT
//
// my-term — terminal substrate for my-editor.
//
// Takes exclusive control of a character terminal and turns it into a
// byte-addressable canvas: raw mode with guaranteed restoration, screen
// geometry from TIOCGWINSZ or a cursor-report probe, and frames staged in
// memory and sent in a single write. A minimal render / read-key / dispatch
// loop ties it together.
//
// The crate talks to the terminal directly through termios and ANSI escape
// sequences rather than through crossterm. Every byte sent to the terminal
// is accounted for.

#[cfg(not(unix))]
compile_error!("my-term drives the terminal through termios and needs a Unix target");

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod fd;
pub mod geometry;
pub mod input;
pub mod output;
pub mod render;
pub mod signal;
pub mod terminal;

#[cfg(all(test, target_os = "linux"))]
mod pty;

pub use error::{Error, GeometryError, Result};
