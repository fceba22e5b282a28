//! Integration with the [`anyhow`] 1.x error handling library.
//!
//! The whole context chain of the [`anyhow::Error`] becomes the message,
//! formatted the way `{:#}` shows it.
//!
//! ```
//! use faultline::{Throwable, compat::IntoThrown};
//!
//! let error = anyhow::anyhow!("connection reset").context("loading session");
//! let thrown = error.into_thrown();
//! assert_eq!(thrown.message(), "loading session: connection reset");
//! ```

use super::IntoThrown;
use crate::throwable::Thrown;

impl IntoThrown for anyhow::Error {
    #[track_caller]
    fn into_thrown(self) -> Thrown {
        Thrown::new(format!("{self:#}"))
    }
}

impl IntoThrown for &anyhow::Error {
    #[track_caller]
    fn into_thrown(self) -> Thrown {
        Thrown::new(format!("{self:#}"))
    }
}
