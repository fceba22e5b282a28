//! Halting the process at the end of a fatal pass.

/// Ends execution after a fault has been persisted or rendered.
///
/// Implementations other than [`ProcessExit`] may return, in which case the
/// dispatcher reports the pass as halted and hands control back.
pub trait Terminator: Send + Sync + 'static {
    /// Stops the process with `code`.
    fn terminate(&self, code: i32);
}

/// Exits the process with [`std::process::exit`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code)
    }
}

impl<F> Terminator for F
where
    F: Fn(i32) + Send + Sync + 'static,
{
    fn terminate(&self, code: i32) {
        self(code)
    }
}
