//! Exception-like values accepted by
//! [`FaultDispatcher::handle_exception`](crate::FaultDispatcher::handle_exception).

use std::{any::Any, error::Error, panic::Location, panic::PanicHookInfo};

use crate::frame::StackFrame;

/// The capabilities the dispatcher needs from an uncaught exception.
pub trait Throwable {
    /// Source file the exception was raised in.
    fn file(&self) -> &str;

    /// Human-readable description.
    fn message(&self) -> String;

    /// Source line the exception was raised at.
    fn line(&self) -> u32;

    /// Call stack at the point the exception was raised, most recent first.
    fn trace(&self) -> Vec<StackFrame>;

    /// Application-defined code, `0` when there is none.
    fn code(&self) -> i64;
}

/// A thrown error with its raise site.
///
/// ```
/// use faultline::{Thrown, Throwable};
///
/// let thrown = Thrown::new("session store unreachable").with_code(503);
/// assert_eq!(thrown.code(), 503);
/// assert!(thrown.file().ends_with(".rs"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Thrown {
    message: String,
    file: String,
    line: u32,
    code: i64,
    trace: Vec<StackFrame>,
}

impl Thrown {
    /// Creates a thrown error located at the caller.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::at(message, Location::caller())
    }

    /// Creates a thrown error located at `location`.
    pub fn at(message: impl Into<String>, location: &Location<'_>) -> Self {
        Self {
            message: message.into(),
            file: location.file().to_owned(),
            line: location.line(),
            code: 0,
            trace: Vec::new(),
        }
    }

    /// Creates a thrown error from `error` and its source chain, located at
    /// the caller.
    #[track_caller]
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(message)
    }

    /// Sets the application code.
    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Sets the call stack.
    #[must_use]
    pub fn with_trace(mut self, trace: Vec<StackFrame>) -> Self {
        self.trace = trace;
        self
    }
}

impl Throwable for Thrown {
    fn file(&self) -> &str {
        &self.file
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn trace(&self) -> Vec<StackFrame> {
        self.trace.clone()
    }

    fn code(&self) -> i64 {
        self.code
    }
}

/// A panic observed by the panic hook.
#[derive(Clone, Debug, PartialEq)]
pub struct PanicFault {
    message: String,
    file: String,
    line: u32,
    trace: Vec<StackFrame>,
}

impl PanicFault {
    /// Captures the payload and location of a panic.
    pub fn new(info: &PanicHookInfo<'_>, trace: Vec<StackFrame>) -> Self {
        let (file, line) = info.location().map_or_else(
            || (String::new(), 0),
            |location| (location.file().to_owned(), location.line()),
        );
        Self {
            message: payload_message(info.payload()),
            file,
            line,
            trace,
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

impl Throwable for PanicFault {
    fn file(&self) -> &str {
        &self.file
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn trace(&self) -> Vec<StackFrame> {
        self.trace.clone()
    }

    fn code(&self) -> i64 {
        0
    }
}
