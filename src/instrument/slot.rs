use super::{Instrument, InstrumentError, InstrumentLoader};
use crate::scheduler::Scheduler;
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

/// Observable state of an instrument acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Ready,
    Failed,
}

enum Slot {
    Pending,
    Ready(Box<dyn Instrument>),
    Failed,
}

/// Shared cell an instrument acquisition publishes its result into.
///
/// Written once by the resolver, read by the scheduling pass.
#[derive(Clone)]
pub struct InstrumentSlot {
    inner: Arc<Mutex<Slot>>,
}

impl Default for InstrumentSlot {
    fn default() -> Self {
        Self::pending()
    }
}

impl InstrumentSlot {
    pub fn pending() -> Self {
        InstrumentSlot {
            inner: Arc::new(Mutex::new(Slot::Pending)),
        }
    }

    pub fn ready(instrument: Box<dyn Instrument>) -> Self {
        InstrumentSlot {
            inner: Arc::new(Mutex::new(Slot::Ready(instrument))),
        }
    }

    pub fn state(&self) -> SlotState {
        match &*self.inner.lock().unwrap_or_else(PoisonError::into_inner) {
            Slot::Pending => SlotState::Pending,
            Slot::Ready(_) => SlotState::Ready,
            Slot::Failed => SlotState::Failed,
        }
    }

    fn fill(&self, result: Result<Box<dyn Instrument>, InstrumentError>) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = match result {
            Ok(instrument) => Slot::Ready(instrument),
            Err(_) => Slot::Failed,
        };
    }

    /// Runs `f` against the instrument if it is ready and not currently being
    /// written. Never blocks.
    pub fn with_ready<R>(&self, f: impl FnOnce(&mut dyn Instrument) -> R) -> Option<R> {
        let mut slot = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        match &mut *slot {
            Slot::Ready(instrument) => Some(f(instrument.as_mut())),
            Slot::Pending | Slot::Failed => None,
        }
    }
}

/// Starts acquiring `id` on `scheduler` and returns the slot the result lands in.
/// Failures are logged and leave the slot `Failed`.
pub fn resolve<S: Scheduler>(
    id: &str,
    loader: Arc<dyn InstrumentLoader>,
    scheduler: &S,
) -> InstrumentSlot {
    let slot = InstrumentSlot::pending();
    let target = slot.clone();
    let id = id.to_string();
    scheduler.spawn(move || {
        let result = loader.load(&id);
        match &result {
            Ok(_) => info!("Instrument '{}' ready", id),
            Err(e) => warn!("Failed to load instrument '{}': {}", id, e),
        }
        target.fill(result);
    });
    slot
}
