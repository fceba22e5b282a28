//! Fault levels and their severity classification.
//!
//! Non-fatal faults carry a numeric [`FaultLevel`] taken from the runtime's
//! level taxonomy. [`Severity::classify`] buckets those levels, and uncaught
//! exceptions, into the labels that end up in an
//! [`ErrorRecord`](crate::ErrorRecord).
//!
//! ```
//! use faultline::{FaultLevel, FaultSignal, Severity};
//!
//! assert_eq!(
//!     Severity::classify(FaultSignal::Level(FaultLevel::USER_WARNING)),
//!     Severity::Warning
//! );
//! assert_eq!(
//!     Severity::classify(FaultSignal::UncaughtException),
//!     Severity::Exception
//! );
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// A raw fault level code.
///
/// The associated constants cover every level the classifier knows about.
/// Codes outside that set are still valid levels; they classify as
/// [`Severity::Unclassified`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultLevel(u32);

impl FaultLevel {
    /// Fatal run-time error.
    pub const ERROR: Self = Self(1);
    /// Run-time warning.
    pub const WARNING: Self = Self(2);
    /// Parse error.
    pub const PARSE: Self = Self(4);
    /// Run-time notice.
    pub const NOTICE: Self = Self(8);
    /// Fatal error during startup.
    pub const CORE_ERROR: Self = Self(16);
    /// Warning during startup.
    pub const CORE_WARNING: Self = Self(32);
    /// Fatal compile-time error.
    pub const COMPILE_ERROR: Self = Self(64);
    /// Compile-time warning.
    pub const COMPILE_WARNING: Self = Self(128);
    /// Error raised by application code.
    pub const USER_ERROR: Self = Self(256);
    /// Warning raised by application code.
    pub const USER_WARNING: Self = Self(512);
    /// Notice raised by application code.
    pub const USER_NOTICE: Self = Self(1024);
    /// Strict-standards notice.
    pub const STRICT: Self = Self(2048);
    /// Catchable fatal error.
    pub const RECOVERABLE_ERROR: Self = Self(4096);
    /// Deprecation notice.
    pub const DEPRECATED: Self = Self(8192);
    /// Deprecation notice raised by application code.
    pub const USER_DEPRECATED: Self = Self(16384);

    /// Every level with a name, in ascending code order.
    pub const KNOWN: [Self; 15] = [
        Self::ERROR,
        Self::WARNING,
        Self::PARSE,
        Self::NOTICE,
        Self::CORE_ERROR,
        Self::CORE_WARNING,
        Self::COMPILE_ERROR,
        Self::COMPILE_WARNING,
        Self::USER_ERROR,
        Self::USER_WARNING,
        Self::USER_NOTICE,
        Self::STRICT,
        Self::RECOVERABLE_ERROR,
        Self::DEPRECATED,
        Self::USER_DEPRECATED,
    ];

    /// Wraps a raw level code.
    pub const fn from_code(code: u32) -> Self {
        Self(code)
    }

    /// The raw level code.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Whether the code is one of the named levels.
    pub fn is_known(self) -> bool {
        Self::KNOWN.contains(&self)
    }

    /// The conventional constant name of the level, if it has one.
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            1 => "ERROR",
            2 => "WARNING",
            4 => "PARSE",
            8 => "NOTICE",
            16 => "CORE_ERROR",
            32 => "CORE_WARNING",
            64 => "COMPILE_ERROR",
            128 => "COMPILE_WARNING",
            256 => "USER_ERROR",
            512 => "USER_WARNING",
            1024 => "USER_NOTICE",
            2048 => "STRICT",
            4096 => "RECOVERABLE_ERROR",
            8192 => "DEPRECATED",
            16384 => "USER_DEPRECATED",
            _ => return None,
        })
    }
}

impl fmt::Display for FaultLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for FaultLevel {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// The raw signal handed to the classifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultSignal {
    /// A non-fatal runtime fault with its level code.
    Level(FaultLevel),
    /// An uncaught exception or panic, whatever its code.
    UncaughtException,
}

/// Severity label of an [`ErrorRecord`](crate::ErrorRecord).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Fatal, core, compile and parse level faults.
    Fatal,
    /// Application-raised or recoverable fatal errors.
    Error,
    /// Warnings of any origin.
    Warning,
    /// Notices.
    Info,
    /// Strict-standards notices.
    Strict,
    /// Uncaught exceptions and panics.
    Exception,
    /// Levels the classifier has no bucket for.
    #[default]
    Unclassified,
}

impl Severity {
    /// Maps a fault signal to its severity.
    pub const fn classify(signal: FaultSignal) -> Self {
        let level = match signal {
            FaultSignal::UncaughtException => return Self::Exception,
            FaultSignal::Level(level) => level,
        };
        match level {
            FaultLevel::ERROR
            | FaultLevel::CORE_ERROR
            | FaultLevel::COMPILE_ERROR
            | FaultLevel::PARSE => Self::Fatal,
            FaultLevel::USER_ERROR | FaultLevel::RECOVERABLE_ERROR => Self::Error,
            FaultLevel::WARNING
            | FaultLevel::CORE_WARNING
            | FaultLevel::COMPILE_WARNING
            | FaultLevel::USER_WARNING => Self::Warning,
            FaultLevel::NOTICE | FaultLevel::USER_NOTICE => Self::Info,
            FaultLevel::STRICT => Self::Strict,
            _ => Self::Unclassified,
        }
    }

    /// The label as written to logs and to the client.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Strict => "STRICT",
            Self::Exception => "EXCEPTION",
            Self::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
