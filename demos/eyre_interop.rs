//! Routing `eyre` reports through a fault dispatcher.
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example eyre_interop --features compat-eyre06
//! ```

use eyre::WrapErr;
use faultline::{FaultDispatcher, Options, compat::IntoThrown};

fn connect(port: u16) -> eyre::Result<()> {
    std::net::TcpStream::connect(("127.0.0.1", port))
        .map(drop)
        .wrap_err_with(|| format!("connecting to port {port}"))
}

fn main() {
    let dispatcher = FaultDispatcher::builder()
        // Render only, nothing is written to disk.
        .options(Options::new().write(false))
        .caller_source(|| None)
        .terminator(|code| println!("(would exit with status {code})"))
        .build();

    if let Err(report) = connect(1).wrap_err("starting session") {
        let disposition = dispatcher.handle_exception(&report.into_thrown());
        println!("{disposition:?}");
    }
}
