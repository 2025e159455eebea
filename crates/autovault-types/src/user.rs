//! Per-depositor share record.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Bookkeeping kept for every depositor.
///
/// Created on first deposit and never removed. Once the share balance drops
/// to zero the record stays with `shares == 0` and `asset_at_last_action == 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Proportional claim on the vault's managed balance.
    pub shares: u128,
    /// Time of the most recent deposit. Drives the withdrawal fee window.
    pub last_deposited_time: Timestamp,
    /// Asset value of `shares` at the last deposit or withdrawal. Informational.
    pub asset_at_last_action: u128,
    /// Time of the most recent deposit or withdrawal.
    pub last_user_action_time: Timestamp,
}

impl UserRecord {
    /// Whether the depositor currently holds any shares.
    pub fn has_shares(&self) -> bool {
        self.shares > 0
    }
}
