//! Event delivery.
//!
//! Observers are called synchronously, in registration order, after a vault
//! operation has committed. Failed operations notify nobody.

use std::sync::{Arc, Mutex, PoisonError};

use autovault_types::VaultEvent;

/// Receives vault events.
pub trait VaultObserver: Send {
    fn notify(&mut self, event: &VaultEvent);
}

impl<F> VaultObserver for F
where
    F: FnMut(&VaultEvent) + Send,
{
    fn notify(&mut self, event: &VaultEvent) {
        self(event)
    }
}

/// Observer that records every event. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<VaultEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove and return every recorded event.
    pub fn drain(&self) -> Vec<VaultEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VaultObserver for EventLog {
    fn notify(&mut self, event: &VaultEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
