//! Vault notifications.
//!
//! Every successful state change of a vault produces exactly one
//! [`VaultEvent`], delivered to observers after the change is committed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, Timestamp};

/// The three configurable fees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    /// Charged on harvest, paid to the treasury.
    Performance,
    /// Charged on harvest, paid to whoever triggered it.
    Call,
    /// Charged on early withdrawal, paid to the treasury.
    Withdraw,
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeeKind::Performance => "performance",
            FeeKind::Call => "call",
            FeeKind::Withdraw => "withdraw",
        };
        f.write_str(name)
    }
}

/// A committed vault state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEvent {
    Deposit {
        user: Address,
        amount: u128,
        shares: u128,
        last_deposited_time: Timestamp,
    },
    Withdraw {
        user: Address,
        amount: u128,
        shares: u128,
        fee: u128,
    },
    Harvest {
        caller: Address,
        performance_fee: u128,
        call_fee: u128,
    },
    Paused,
    Unpaused,
    /// The whole stake was pulled back from the yield source.
    EmergencyWithdraw {
        amount: u128,
    },
    ForeignTokenRecovered {
        token: Address,
        amount: u128,
    },
    FeeUpdated {
        kind: FeeKind,
        previous: u64,
        current: u64,
    },
    WithdrawFeePeriodUpdated {
        previous: u64,
        current: u64,
    },
    AdminChanged {
        previous: Address,
        current: Address,
    },
    TreasuryChanged {
        previous: Address,
        current: Address,
    },
    OwnershipTransferred {
        previous: Address,
        current: Address,
    },
}

impl VaultEvent {
    /// Short event name, e.g. `"Harvest"`.
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::Deposit { .. } => "Deposit",
            VaultEvent::Withdraw { .. } => "Withdraw",
            VaultEvent::Harvest { .. } => "Harvest",
            VaultEvent::Paused => "Pause",
            VaultEvent::Unpaused => "Unpause",
            VaultEvent::EmergencyWithdraw { .. } => "EmergencyWithdraw",
            VaultEvent::ForeignTokenRecovered { .. } => "ForeignTokenRecovered",
            VaultEvent::FeeUpdated { .. } => "FeeUpdated",
            VaultEvent::WithdrawFeePeriodUpdated { .. } => "WithdrawFeePeriodUpdated",
            VaultEvent::AdminChanged { .. } => "AdminChanged",
            VaultEvent::TreasuryChanged { .. } => "TreasuryChanged",
            VaultEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = VaultEvent::Harvest {
            caller: Address::from_label("keeper"),
            performance_fee: 200,
            call_fee: 25,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["harvest"]["performance_fee"], 200);
        assert_eq!(value["harvest"]["call_fee"], 25);

        let back: VaultEvent = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_unit_event_json() {
        let json = serde_json::to_string(&VaultEvent::Paused).expect("serialize");
        assert_eq!(json, "\"paused\"");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(VaultEvent::Paused.name(), "Pause");
        assert_eq!(VaultEvent::Unpaused.name(), "Unpause");
        assert_eq!(VaultEvent::EmergencyWithdraw { amount: 0 }.name(), "EmergencyWithdraw");
    }

    #[test]
    fn test_fee_kind_display() {
        assert_eq!(FeeKind::Performance.to_string(), "performance");
        assert_eq!(FeeKind::Call.to_string(), "call");
        assert_eq!(FeeKind::Withdraw.to_string(), "withdraw");
    }
}
