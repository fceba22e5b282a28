#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Process-wide fault capture for request-serving programs.
//!
//! ## Overview
//!
//! `faultline` intercepts the faults of a process, normalizes every one of
//! them into an [`ErrorRecord`], and routes the record to a log, to the client
//! that made the failing request, or both. Two kinds of faults are handled:
//!
//! - **Non-fatal faults** raised explicitly with [`trigger!`] or
//!   [`FaultDispatcher::handle_fault`], each carrying a [`FaultLevel`] such as
//!   [`FaultLevel::USER_WARNING`].
//! - **Uncaught exceptions**: panics, through the panic hook installed by
//!   [`FaultDispatcher::initialize`], and any [`Throwable`] handed to
//!   [`FaultDispatcher::handle_exception`].
//!
//! ## Quick Example
//!
//! ```no_run
//! use faultline::{FaultDispatcher, FaultLevel, Options, trigger};
//!
//! let dispatcher = FaultDispatcher::builder()
//!     .options(Options::new().allowed_caller_addresses(["127.0.0.1"]))
//!     .log_destination("/var/log/app/errors")
//!     .build();
//! dispatcher.configure_from_env().expect("invalid FAULTLINE configuration");
//! dispatcher.initialize().expect("dispatcher already initialized");
//!
//! let free_bytes = 512;
//! trigger!(
//!     dispatcher,
//!     FaultLevel::USER_WARNING,
//!     { "free_bytes" => free_bytes },
//!     "upload volume almost full"
//! )
//! .expect("failed to handle fault");
//! ```
//!
//! ## The Pipeline
//!
//! Every fault goes through the same steps:
//!
//! 1. **Suppression.** Faults silenced on the current thread with
//!    [`reporting::silence`] or [`reporting::restrict`] are ignored without
//!    side effects.
//! 2. **Classification.** The level is mapped to a [`Severity`].
//! 3. **Enrichment.** The caller address is resolved and the backtrace is
//!    captured and sanitized.
//! 4. **Routing.** Depending on the [`Config`], the record is written to the
//!    [`LogSink`], rendered to the [`ClientOutput`], and the process is halted
//!    through the [`Terminator`].
//!
//! Writing happens first. A record that cannot be serialized in full is
//! written without its scope variables and backtrace rather than dropped.
//!
//! ## Ecosystem
//!
//! - **[`faultline-backtrace`]** - Captures live backtraces with the
//!   `backtrace` crate, for faults that do not carry a trace of their own.
//!
//! [`faultline-backtrace`]: https://docs.rs/faultline-backtrace
//!
//! ## Features
//!
//! - `compat-anyhow1` - Convert `anyhow` 1.x errors with [`compat::IntoThrown`]
//! - `compat-eyre06` - Convert `eyre` 0.6.x reports with
//!   [`compat::IntoThrown`]

#[macro_use]
mod macros;

pub mod caller;
pub mod compat;
pub mod entity;
pub mod frame;
pub mod render;
pub mod reporting;
pub mod sink;

mod dispatcher;
mod hooks;
mod options;
mod record;
mod scope;
mod severity;
mod terminator;
mod throwable;

pub use self::{
    caller::{CallerAddressSource, CgiEnvironment},
    dispatcher::{DispatchError, Disposition, FaultDispatcher, FaultDispatcherBuilder},
    entity::{Entity, EntityError},
    frame::{FrameCollector, StackFrame},
    hooks::AlreadyInitializedError,
    options::{Config, ConfigError, FxIndexSet, Options},
    record::{ErrorRecord, RecordField, UnknownFieldError},
    render::{ClientOutput, DisplayView},
    scope::{ScopeValue, ScopeVariables},
    severity::{FaultLevel, FaultSignal, Severity},
    sink::LogSink,
    terminator::{ProcessExit, Terminator},
    throwable::{PanicFault, Throwable, Thrown},
};

#[doc(hidden)]
pub mod __private {
    // Used by faultline-backtrace
    pub const FAULTLINE_LOCATION: &core::panic::Location = core::panic::Location::caller();

    #[doc(hidden)]
    pub use core::{file, line};
    #[doc(hidden)]
    pub use std::{format, string::ToString};
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(FaultDispatcher: Send, Sync);
    assert_impl_all!(ErrorRecord: Send, Sync, Clone);
    assert_impl_all!(DispatchError: Send, Sync, std::error::Error);
    assert_impl_all!(AlreadyInitializedError: Send, Sync, std::error::Error);
}
