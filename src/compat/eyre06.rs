//! Integration with the [`eyre`] 0.6.x error handling library.

use super::IntoThrown;
use crate::throwable::Thrown;

impl IntoThrown for eyre::Report {
    #[track_caller]
    fn into_thrown(self) -> Thrown {
        Thrown::new(format!("{self:#}"))
    }
}

impl IntoThrown for &eyre::Report {
    #[track_caller]
    fn into_thrown(self) -> Thrown {
        Thrown::new(format!("{self:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throwable::Throwable;

    #[test]
    fn test_wrapped_report_keeps_the_chain() {
        let report = eyre::eyre!("disk full").wrap_err("writing upload");
        let thrown = report.into_thrown();
        assert_eq!(thrown.message(), "writing upload: disk full");
        assert_eq!(thrown.code(), 0);
    }
}
