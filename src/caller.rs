//! Best-effort attribution of a fault to the address of the request that
//! triggered it.
//!
//! # Caveat
//!
//! Forwarding headers are checked before the direct peer address so that
//! deployments behind a reverse proxy attribute faults to the real client.
//! Those headers are supplied by the client and can hold any value. The
//! resolved address is for attribution in logs only. Do not use it for access
//! decisions without verifying it independently; the display allow-list of
//! the dispatcher is a convenience filter, not a security control.

use std::borrow::Cow;

/// CGI variable names consulted by default, highest priority first.
pub const DEFAULT_CANDIDATES: [&str; 4] = [
    "HTTP_X_FORWARDED_FOR",
    "HTTP-X-FORWARDED-FOR",
    "HTTP_VIA",
    "REMOTE_ADDR",
];

/// Ordered, named sources of a caller address, each optionally present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerCandidates {
    entries: Vec<(Cow<'static, str>, Option<String>)>,
}

impl CallerCandidates {
    /// Creates an empty candidate list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate with the lowest priority so far.
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: Option<impl Into<String>>,
    ) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a candidate with the lowest priority so far.
    pub fn push(&mut self, name: impl Into<Cow<'static, str>>, value: Option<impl Into<String>>) {
        self.entries.push((name.into(), value.map(Into::into)));
    }

    /// Builds the default candidate list by looking up each name in
    /// [`DEFAULT_CANDIDATES`].
    pub fn lookup(mut lookup: impl FnMut(&str) -> Option<String>) -> Self {
        let mut candidates = Self::new();
        for name in DEFAULT_CANDIDATES {
            let value = lookup(name);
            candidates.push(name, value);
        }
        candidates
    }

    /// Builds the default candidate list from the process environment.
    pub fn from_env() -> Self {
        Self::lookup(|name| std::env::var(name).ok())
    }

    /// Iterates over the candidates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (&**name, value.as_deref()))
    }

    /// Returns the first present, non-empty candidate, trimmed.
    pub fn resolve(&self) -> Option<String> {
        self.iter()
            .filter_map(|(_, value)| value.map(str::trim))
            .find(|value| !value.is_empty())
            .map(str::to_owned)
    }
}

/// Supplies the caller address of the request currently being served.
pub trait CallerAddressSource: Send + Sync + 'static {
    /// The best-effort caller address, if any source yields one.
    fn caller_address(&self) -> Option<String>;
}

impl<F> CallerAddressSource for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn caller_address(&self) -> Option<String> {
        self()
    }
}

/// Resolves the caller address from CGI environment variables.
///
/// This is the default source of a dispatcher. Processes that are not spawned
/// per request should install their own source.
#[derive(Copy, Clone, Debug, Default)]
pub struct CgiEnvironment;

impl CallerAddressSource for CgiEnvironment {
    fn caller_address(&self) -> Option<String> {
        CallerCandidates::from_env().resolve()
    }
}
