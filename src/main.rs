// SPDX-License-Identifier: MIT
//
// my-editor — a screen-oriented terminal editor, starting from its core.
//
// This binary wires the `my-term` crate into a process:
//
//   raw mode → measure screen → [ draw frame → read key → dispatch ]* → restore
//
// and maps how the loop ended onto an exit status: 0 after Ctrl-Q,
// 128 + signo after a termination signal, 1 after any terminal error (via
// `error::fatal`, which clears the screen and restores the terminal first).
//
// Logging is opt-in. Standard output is the editor's canvas, so log lines
// can only go to a file: set MY_EDITOR_LOG to its path. RUST_LOG filters as
// usual and defaults to `info`.

use std::env;
use std::fs::OpenOptions;
use std::process;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use my_term::error;
use my_term::event_loop::{EventLoop, LoopConfig};
use my_term::render::RenderConfig;

/// Environment variable naming the log file.
const LOG_ENV: &str = "MY_EDITOR_LOG";

/// Install a file-backed tracing subscriber if `MY_EDITOR_LOG` is set.
fn init_logging() {
    let Some(path) = env::var_os(LOG_ENV) else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn config() -> LoopConfig {
    LoopConfig {
        render: RenderConfig::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        ..LoopConfig::default()
    }
}

fn main() {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "my-editor starting");

    let exit = EventLoop::with_config(config()).and_then(|mut event_loop| event_loop.run());
    match exit {
        Ok(exit) => process::exit(exit.code()),
        Err(e) => error::fatal(env!("CARGO_PKG_NAME"), &e),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
