//! Dispatcher configuration.
//!
//! [`Config`] is the resolved configuration a dispatcher runs with.
//! [`Options`] is a partial update merged into it by
//! [`FaultDispatcher::configure`](crate::FaultDispatcher::configure); fields
//! left unset keep their current value. Both deserialize with `serde`, so they
//! can be embedded in an application's configuration file.
//!
//! # Environment Variables
//!
//! [`Options::from_env`] reads:
//!
//! - `FAULTLINE` - Comma-separated flags: `write`, `no_write`, `display`,
//!   `no_display`
//! - `FAULTLINE_ALLOWED_CALLERS` - Comma-separated caller addresses allowed to
//!   see rendered faults
//! - `FAULTLINE_FIELDS` - Comma-separated record fields to persist
//! - `FAULTLINE_EXIT_CODE` - Exit status used when halting
//!
//! The log destination is read from `FAULTLINE_LOG_DIR` by
//! [`FaultDispatcher::configure_from_env`](crate::FaultDispatcher::configure_from_env).

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::record::{RecordField, UnknownFieldError};

/// Ordered set with a fast, deterministic hasher.
pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// The configuration a dispatcher runs with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Persist records to the log sink.
    pub write: bool,
    /// Render records to the client and halt.
    pub display: bool,
    /// Caller addresses allowed to see rendered records. Empty allows all.
    pub allowed_caller_addresses: FxIndexSet<String>,
    /// Record fields persisted to the log sink.
    pub included_fields: FxIndexSet<RecordField>,
    /// Exit status used when the pipeline halts the process.
    pub exit_code: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write: true,
            display: true,
            allowed_caller_addresses: FxIndexSet::default(),
            included_fields: RecordField::ALL.into_iter().collect(),
            exit_code: 1,
        }
    }
}

impl Config {
    /// Applies every field set in `options`.
    pub fn merge(&mut self, options: Options) {
        let Options {
            write,
            display,
            allowed_caller_addresses,
            included_fields,
            exit_code,
        } = options;
        if let Some(write) = write {
            self.write = write;
        }
        if let Some(display) = display {
            self.display = display;
        }
        if let Some(allowed_caller_addresses) = allowed_caller_addresses {
            self.allowed_caller_addresses = allowed_caller_addresses;
        }
        if let Some(included_fields) = included_fields {
            self.included_fields = included_fields;
        }
        if let Some(exit_code) = exit_code {
            self.exit_code = exit_code;
        }
    }

    /// Whether records may be rendered to a caller with `caller_address`.
    pub fn allows_display_to(&self, caller_address: Option<&str>) -> bool {
        self.allowed_caller_addresses.is_empty()
            || caller_address.is_some_and(|address| self.allowed_caller_addresses.contains(address))
    }
}

/// A partial update of a [`Config`].
///
/// ```
/// use faultline::{Config, Options};
///
/// let mut config = Config::default();
/// config.merge(Options::new().display(false).allowed_caller_addresses(["10.0.0.1"]));
/// assert!(config.write);
/// assert!(!config.display);
/// assert!(config.allowed_caller_addresses.contains("10.0.0.1"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// See [`Config::write`].
    pub write: Option<bool>,
    /// See [`Config::display`].
    pub display: Option<bool>,
    /// See [`Config::allowed_caller_addresses`].
    pub allowed_caller_addresses: Option<FxIndexSet<String>>,
    /// See [`Config::included_fields`].
    pub included_fields: Option<FxIndexSet<RecordField>>,
    /// See [`Config::exit_code`].
    pub exit_code: Option<i32>,
}

/// Error produced while reading options from the environment.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `FAULTLINE` contained a flag that is not recognized.
    #[error("unknown flag `{0}` in FAULTLINE")]
    UnknownFlag(String),
    /// `FAULTLINE_FIELDS` named a field that does not exist.
    #[error("invalid FAULTLINE_FIELDS")]
    UnknownField(#[from] UnknownFieldError),
    /// `FAULTLINE_EXIT_CODE` is not an integer.
    #[error("FAULTLINE_EXIT_CODE `{0}` is not an integer")]
    InvalidExitCode(String),
}

impl Options {
    /// Creates an update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`Config::write`].
    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = Some(write);
        self
    }

    /// Sets [`Config::display`].
    #[must_use]
    pub fn display(mut self, display: bool) -> Self {
        self.display = Some(display);
        self
    }

    /// Sets [`Config::allowed_caller_addresses`].
    #[must_use]
    pub fn allowed_caller_addresses<I>(mut self, addresses: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.allowed_caller_addresses = Some(addresses.into_iter().map(Into::into).collect());
        self
    }

    /// Sets [`Config::included_fields`].
    #[must_use]
    pub fn included_fields(mut self, fields: impl IntoIterator<Item = RecordField>) -> Self {
        self.included_fields = Some(fields.into_iter().collect());
        self
    }

    /// Sets [`Config::exit_code`].
    #[must_use]
    pub fn exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    /// Reads options from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads options through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut options = Self::new();

        if let Some(flags) = lookup("FAULTLINE") {
            for flag in split_list(&flags) {
                match flag.to_ascii_lowercase().as_str() {
                    "write" => options.write = Some(true),
                    "no_write" => options.write = Some(false),
                    "display" => options.display = Some(true),
                    "no_display" => options.display = Some(false),
                    _ => return Err(ConfigError::UnknownFlag(flag.to_owned())),
                }
            }
        }

        if let Some(addresses) = lookup("FAULTLINE_ALLOWED_CALLERS") {
            options = options.allowed_caller_addresses(split_list(&addresses));
        }

        if let Some(fields) = lookup("FAULTLINE_FIELDS") {
            let fields = split_list(&fields)
                .map(str::parse)
                .collect::<Result<Vec<RecordField>, _>>()?;
            options = options.included_fields(fields);
        }

        if let Some(exit_code) = lookup("FAULTLINE_EXIT_CODE") {
            let parsed = exit_code
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidExitCode(exit_code.clone()))?;
            options = options.exit_code(parsed);
        }

        Ok(options)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}
