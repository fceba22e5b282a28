//! Routing `anyhow` errors through a fault dispatcher.
//!
//! `anyhow::Error` values become [`Thrown`] exceptions with
//! [`IntoThrown`]. The whole context chain ends up in the record message and
//! the location is the conversion site.
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example anyhow_interop --features compat-anyhow1
//! ```

use anyhow::Context;
use faultline::{Disposition, FaultDispatcher, Options, compat::IntoThrown};

fn read_manifest(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading manifest {path}"))
}

fn load_release() -> anyhow::Result<String> {
    read_manifest("/nonexistent/release.toml").context("loading release metadata")
}

fn main() {
    let log_dir = std::env::temp_dir().join("faultline-anyhow-interop");
    let dispatcher = FaultDispatcher::builder()
        .options(Options::new().exit_code(2))
        .log_destination(&log_dir)
        .caller_source(|| Some("127.0.0.1".to_owned()))
        // Keep the process alive so the example can report what happened.
        .terminator(|code| println!("(would exit with status {code})"))
        .build();

    let Err(error) = load_release() else {
        return;
    };

    // A borrowed error converts too, leaving the original available.
    let thrown = (&error).into_thrown();
    match dispatcher.handle_exception(&thrown) {
        Ok(Disposition::Halted { persisted, .. }) => {
            println!("record persisted: {persisted}, logs in {}", log_dir.display());
        }
        Ok(other) => println!("pass ended with {other:?}"),
        Err(error) => eprintln!("fault handling failed: {error}"),
    }

    println!("original error still usable: {error:#}");
}
