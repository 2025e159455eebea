//! Broadcast event bus.
//!
//! Vault events are fanned out to any number of subscribers over a
//! `tokio::sync::broadcast` channel. Each subscriber has its own buffer;
//! a slow subscriber lags instead of blocking the vault.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use autovault_core::VaultObserver;
use autovault_types::VaultEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A vault event with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// 1-based sequence number.
    pub sequence: u64,
    pub category: EventCategory,
    pub event: VaultEvent,
}

/// Coarse grouping used by subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Deposits and withdrawals.
    Position,
    Harvest,
    /// Pause, unpause, emergency withdraw and token recovery.
    Emergency,
    /// Fee and role changes.
    Governance,
}

impl EventCategory {
    pub fn of(event: &VaultEvent) -> Self {
        match event {
            VaultEvent::Deposit { .. } | VaultEvent::Withdraw { .. } => EventCategory::Position,
            VaultEvent::Harvest { .. } => EventCategory::Harvest,
            VaultEvent::Paused
            | VaultEvent::Unpaused
            | VaultEvent::EmergencyWithdraw { .. }
            | VaultEvent::ForeignTokenRecovered { .. } => EventCategory::Emergency,
            VaultEvent::FeeUpdated { .. }
            | VaultEvent::WithdrawFeePeriodUpdated { .. }
            | VaultEvent::AdminChanged { .. }
            | VaultEvent::TreasuryChanged { .. }
            | VaultEvent::OwnershipTransferred { .. } => EventCategory::Governance,
        }
    }
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Accept only these categories. `None` accepts all.
    pub categories: Option<Vec<EventCategory>>,
}

impl EventFilter {
    pub fn matches(&self, event: &SequencedEvent) -> bool {
        match &self.categories {
            Some(categories) => categories.contains(&event.category),
            None => true,
        }
    }
}

/// Event bus for broadcasting vault events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SequencedEvent>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: VaultEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let category = EventCategory::of(&event);
        tracing::trace!(sequence, name = event.name(), "bus: emit");
        // no subscribers is fine
        let _ = self.sender.send(SequencedEvent {
            sequence,
            category,
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequencedEvent> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl VaultObserver for EventBus {
    fn notify(&mut self, event: &VaultEvent) {
        self.emit(event.clone());
    }
}

/// Take every event currently buffered for `receiver`.
///
/// Lagged receivers skip what they missed and keep reading.
pub fn drain(receiver: &mut broadcast::Receiver<SequencedEvent>) -> Vec<SequencedEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "bus: subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}
