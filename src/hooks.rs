//! Process-wide installation of a dispatcher.
//!
//! The only global state of the crate lives here: the slot holding the
//! installed dispatcher and the panic hook that feeds it.

use core::fmt;
use std::{
    panic::{self, PanicHookInfo},
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    dispatcher::{Disposition, FaultDispatcher},
    throwable::PanicFault,
};

struct HookLock<T: 'static + Send + Sync>(RwLock<Option<T>>);

impl<T: 'static + Send + Sync + Clone> HookLock<T> {
    const fn new() -> Self {
        Self(RwLock::new(None))
    }

    fn get(&'static self) -> Option<T> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores `value` unless the slot is taken, in which case it is handed
    /// back.
    fn try_set(&'static self, value: T) -> Result<(), T> {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        Ok(())
    }
}

static INSTALLED: HookLock<Arc<FaultDispatcher>> = HookLock::new();

/// Error returned when a dispatcher is initialized while another one is
/// already installed.
///
/// Contains the dispatcher that was rejected.
pub struct AlreadyInitializedError(pub Arc<FaultDispatcher>);

impl fmt::Debug for AlreadyInitializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlreadyInitializedError").finish()
    }
}

impl fmt::Display for AlreadyInitializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a fault dispatcher is already initialized for this process")
    }
}

impl std::error::Error for AlreadyInitializedError {}

pub(crate) fn installed() -> Option<Arc<FaultDispatcher>> {
    INSTALLED.get()
}

pub(crate) fn install(dispatcher: Arc<FaultDispatcher>) -> Result<(), AlreadyInitializedError> {
    INSTALLED
        .try_set(Arc::clone(&dispatcher))
        .map_err(AlreadyInitializedError)?;

    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let fault = PanicFault::new(info, Vec::new());
        match dispatcher.handle_exception(&fault) {
            Ok(disposition) if disposition.halted() => {}
            Ok(Disposition::Ignored) => previous(info),
            Ok(disposition) => {
                tracing::debug!(?disposition, "panic handled without halting");
                previous(info);
            }
            Err(error) => {
                tracing::error!(%error, "failed to handle panic");
                previous(info);
            }
        }
    }));
    tracing::debug!("fault dispatcher initialized");
    Ok(())
}
