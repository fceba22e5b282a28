//! Conversions from other error handling libraries into [`Thrown`].
//!
//! # Available Integrations
//!
//! - [`anyhow1`] - `anyhow` 1.x (requires the `compat-anyhow1` feature flag)
//! - [`eyre06`] - `eyre` 0.6.x (requires the `compat-eyre06` feature flag)
//!
//! Boxed standard errors are supported without any feature flag.
//!
//! ```
//! use faultline::{Throwable, compat::IntoThrown};
//!
//! let error: Box<dyn std::error::Error + Send + Sync> = "pool exhausted".into();
//! let thrown = error.into_thrown();
//! assert_eq!(thrown.message(), "pool exhausted");
//! ```

use std::error::Error;

use crate::throwable::Thrown;

#[cfg(feature = "compat-anyhow1")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-anyhow1")))]
pub mod anyhow1;

#[cfg(feature = "compat-eyre06")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-eyre06")))]
pub mod eyre06;

/// Converts an error from another library into a [`Thrown`] located at the
/// caller, ready for
/// [`FaultDispatcher::handle_exception`](crate::FaultDispatcher::handle_exception).
pub trait IntoThrown {
    /// Performs the conversion.
    #[track_caller]
    fn into_thrown(self) -> Thrown;
}

impl IntoThrown for Box<dyn Error + Send + Sync> {
    #[track_caller]
    fn into_thrown(self) -> Thrown {
        Thrown::from_error(&*self)
    }
}

impl IntoThrown for Box<dyn Error> {
    #[track_caller]
    fn into_thrown(self) -> Thrown {
        Thrown::from_error(&*self)
    }
}
