//! Share ledger.
//!
//! Maps each depositor to a [`UserRecord`] and keeps `total_shares` equal to
//! the sum of every record's shares. Records are created on first credit and
//! never removed.

use std::collections::BTreeMap;

use autovault_types::{Address, Timestamp, UserRecord};
use serde::{Deserialize, Serialize};

/// Share bookkeeping failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient shares for {user}: held {held}, requested {requested}")]
    InsufficientShares {
        user: Address,
        held: u128,
        requested: u128,
    },

    #[error("share supply overflow")]
    Overflow,
}

/// Per-depositor share balances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareLedger {
    users: BTreeMap<Address, UserRecord>,
    total_shares: u128,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all depositors' shares.
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// The depositor's record, or a zeroed record if they never deposited.
    pub fn record(&self, user: &Address) -> UserRecord {
        self.users.get(user).copied().unwrap_or_default()
    }

    pub fn shares_of(&self, user: &Address) -> u128 {
        self.users.get(user).map_or(0, |record| record.shares)
    }

    /// Number of depositors that ever held shares.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &UserRecord)> {
        self.users.iter()
    }

    /// Mint `shares` to `user` and stamp the deposit time.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the user balance or the supply would overflow
    pub fn credit(&mut self, user: Address, shares: u128, now: Timestamp) -> Result<(), LedgerError> {
        let total = self.total_shares.checked_add(shares).ok_or(LedgerError::Overflow)?;
        let record = self.users.entry(user).or_default();
        record.shares = record.shares.checked_add(shares).ok_or(LedgerError::Overflow)?;
        record.last_deposited_time = now;
        record.last_user_action_time = now;
        self.total_shares = total;
        Ok(())
    }

    /// Burn `shares` from `user`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientShares`] if the user holds fewer shares
    pub fn debit(&mut self, user: Address, shares: u128, now: Timestamp) -> Result<(), LedgerError> {
        let held = self.shares_of(&user);
        if held < shares {
            return Err(LedgerError::InsufficientShares {
                user,
                held,
                requested: shares,
            });
        }
        let record = self.users.entry(user).or_default();
        record.shares = held - shares;
        record.last_user_action_time = now;
        if record.shares == 0 {
            record.asset_at_last_action = 0;
        }
        // held <= total_shares is the ledger invariant
        self.total_shares = self.total_shares.saturating_sub(shares);
        Ok(())
    }

    /// Record the asset value of the user's shares after their last action.
    pub fn set_snapshot(&mut self, user: Address, value: u128) {
        if let Some(record) = self.users.get_mut(&user) {
            record.asset_at_last_action = value;
        }
    }

    /// Whether `total_shares` equals the sum of all user balances.
    pub fn is_consistent(&self) -> bool {
        let sum = self
            .users
            .values()
            .try_fold(0u128, |acc, record| acc.checked_add(record.shares));
        sum == Some(self.total_shares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let mut ledger = ShareLedger::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        ledger.credit(alice, 10, 100).expect("credit");
        ledger.credit(bob, 20, 105).expect("credit");
        ledger.credit(alice, 5, 110).expect("credit");
        assert_eq!(ledger.total_shares(), 35);
        assert_eq!(ledger.shares_of(&alice), 15);
        assert_eq!(ledger.record(&alice).last_deposited_time, 110);
        assert!(ledger.is_consistent());

        ledger.debit(alice, 15, 200).expect("debit");
        assert_eq!(ledger.total_shares(), 20);
        let record = ledger.record(&alice);
        assert_eq!(record.shares, 0);
        assert_eq!(record.last_user_action_time, 200);
        assert_eq!(record.last_deposited_time, 110);
        assert!(ledger.is_consistent());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_debit_more_than_held() {
        let mut ledger = ShareLedger::new();
        let alice = Address::from_label("alice");
        ledger.credit(alice, 10, 0).expect("credit");

        let err = ledger.debit(alice, 11, 1).expect_err("overdraw");
        assert_eq!(
            err,
            LedgerError::InsufficientShares {
                user: alice,
                held: 10,
                requested: 11,
            }
        );
        assert_eq!(ledger.shares_of(&alice), 10);
        assert_eq!(ledger.total_shares(), 10);
    }

    #[test]
    fn test_unknown_user_is_default() {
        let ledger = ShareLedger::new();
        assert_eq!(ledger.record(&Address::from_label("nobody")), UserRecord::default());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_snapshot_cleared_at_zero() {
        let mut ledger = ShareLedger::new();
        let alice = Address::from_label("alice");
        ledger.credit(alice, 10, 0).expect("credit");
        ledger.set_snapshot(alice, 12);
        assert_eq!(ledger.record(&alice).asset_at_last_action, 12);

        ledger.debit(alice, 10, 5).expect("debit");
        assert_eq!(ledger.record(&alice).asset_at_last_action, 0);
    }

    #[test]
    fn test_credit_overflow_leaves_ledger_unchanged() {
        let mut ledger = ShareLedger::new();
        let alice = Address::from_label("alice");
        ledger.credit(alice, u128::MAX, 0).expect("credit");
        assert_eq!(ledger.credit(alice, 1, 1), Err(LedgerError::Overflow));
        assert_eq!(ledger.record(&alice).last_deposited_time, 0);
    }
}
