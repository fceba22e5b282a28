//! Per-thread fault reporting mask.
//!
//! Code that expects a fault and wants it ignored narrows the mask of the
//! current thread for the duration of the operation. Faults the mask excludes
//! never reach the dispatcher's pipeline: no record is built and nothing is
//! written, rendered or halted.
//!
//! ```
//! use faultline::reporting::{self, FaultMask};
//!
//! let value = reporting::silenced(|| {
//!     assert!(reporting::current().is_empty());
//!     42
//! });
//! assert_eq!(value, 42);
//! assert_eq!(reporting::current(), FaultMask::all());
//! ```

use std::cell::Cell;

use crate::severity::FaultLevel;

bitflags::bitflags! {
    /// Set of fault levels that are reported.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct FaultMask: u32 {
        /// [`FaultLevel::ERROR`]
        const ERROR = FaultLevel::ERROR.code();
        /// [`FaultLevel::WARNING`]
        const WARNING = FaultLevel::WARNING.code();
        /// [`FaultLevel::PARSE`]
        const PARSE = FaultLevel::PARSE.code();
        /// [`FaultLevel::NOTICE`]
        const NOTICE = FaultLevel::NOTICE.code();
        /// [`FaultLevel::CORE_ERROR`]
        const CORE_ERROR = FaultLevel::CORE_ERROR.code();
        /// [`FaultLevel::CORE_WARNING`]
        const CORE_WARNING = FaultLevel::CORE_WARNING.code();
        /// [`FaultLevel::COMPILE_ERROR`]
        const COMPILE_ERROR = FaultLevel::COMPILE_ERROR.code();
        /// [`FaultLevel::COMPILE_WARNING`]
        const COMPILE_WARNING = FaultLevel::COMPILE_WARNING.code();
        /// [`FaultLevel::USER_ERROR`]
        const USER_ERROR = FaultLevel::USER_ERROR.code();
        /// [`FaultLevel::USER_WARNING`]
        const USER_WARNING = FaultLevel::USER_WARNING.code();
        /// [`FaultLevel::USER_NOTICE`]
        const USER_NOTICE = FaultLevel::USER_NOTICE.code();
        /// [`FaultLevel::STRICT`]
        const STRICT = FaultLevel::STRICT.code();
        /// [`FaultLevel::RECOVERABLE_ERROR`]
        const RECOVERABLE_ERROR = FaultLevel::RECOVERABLE_ERROR.code();
        /// [`FaultLevel::DEPRECATED`]
        const DEPRECATED = FaultLevel::DEPRECATED.code();
        /// [`FaultLevel::USER_DEPRECATED`]
        const USER_DEPRECATED = FaultLevel::USER_DEPRECATED.code();
    }
}

impl FaultMask {
    /// Whether a fault of `level` should be reported under this mask.
    ///
    /// An empty mask silences everything. Otherwise named levels must be in
    /// the mask, and codes without a name are always reported.
    pub fn reports(self, level: FaultLevel) -> bool {
        if self.is_empty() {
            return false;
        }
        if level.is_known() {
            self.contains(Self::from_bits_retain(level.code()))
        } else {
            true
        }
    }
}

thread_local! {
    static MASK: Cell<FaultMask> = const { Cell::new(FaultMask::all()) };
}

/// The reporting mask of the current thread.
pub fn current() -> FaultMask {
    MASK.with(Cell::get)
}

/// Replaces the reporting mask of the current thread, returning the old one.
pub fn set(mask: FaultMask) -> FaultMask {
    MASK.with(|cell| cell.replace(mask))
}

/// Restores the previous mask when dropped.
#[must_use = "the mask is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct MaskGuard {
    previous: FaultMask,
}

impl Drop for MaskGuard {
    fn drop(&mut self) {
        set(self.previous);
    }
}

/// Narrows the current thread's mask to `mask` until the guard is dropped.
pub fn restrict(mask: FaultMask) -> MaskGuard {
    MaskGuard {
        previous: set(mask),
    }
}

/// Silences every fault on the current thread until the guard is dropped.
pub fn silence() -> MaskGuard {
    restrict(FaultMask::empty())
}

/// Runs `f` with every fault on the current thread silenced.
pub fn silenced<T>(f: impl FnOnce() -> T) -> T {
    let _guard = silence();
    f()
}
