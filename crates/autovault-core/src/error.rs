//! Error taxonomy.
//!
//! Every failed vault operation returns a [`VaultError`] in one of three
//! categories and leaves the vault unchanged:
//!
//! - [`ValidationError`] — the request itself is unacceptable
//! - [`AuthorizationError`] — the caller lacks the required role
//! - [`StateError`] — the vault or a collaborator is not in a state that
//!   allows the operation

use std::fmt;

use autovault_math::{FeeError, MathError};
use autovault_types::Address;

use crate::access::Role;
use crate::collaborators::{TokenError, YieldSourceError};
use crate::ledger::LedgerError;

/// Coarse classification of a [`VaultError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    State,
}

/// Tokens the admin may never sweep out of the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictedToken {
    /// The asset depositors hand in.
    DepositAsset,
    /// The receipt the yield source issues for the vault's stake.
    ReceiptAsset,
}

impl fmt::Display for RestrictedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestrictedToken::DepositAsset => f.write_str("deposit"),
            RestrictedToken::ReceiptAsset => f.write_str("receipt"),
        }
    }
}

/// The request is malformed or exceeds what the caller is entitled to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("nothing to deposit")]
    NothingToDeposit,

    #[error("nothing to withdraw")]
    NothingToWithdraw,

    /// The deposit is worth less than one share at the current price.
    #[error("deposit of {amount} is too small to mint a share")]
    DepositTooSmall { amount: u128 },

    #[error("withdraw amount exceeds balance: requested {requested}, available {available}")]
    WithdrawExceedsBalance { requested: u128, available: u128 },

    #[error(transparent)]
    Fee(FeeError),

    #[error("{role} cannot be the zero address")]
    ZeroAddress { role: Role },

    #[error("token {token} cannot be the same as the {kind} token")]
    RestrictedToken { token: Address, kind: RestrictedToken },

    /// The depositor's balance or allowance does not cover the deposit.
    #[error("deposit funding failed: {0}")]
    Funding(TokenError),
}

/// The caller does not hold the role the operation requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not the admin")]
    NotAdmin { caller: Address },
}

/// The vault or one of its collaborators cannot perform the operation now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("vault is paused")]
    Paused,

    #[error("vault is not paused")]
    NotPaused,

    /// Shares are outstanding but the managed balance is zero.
    #[error("vault is insolvent: {total_shares} shares outstanding with no managed balance")]
    Insolvent { total_shares: u128 },

    /// The vault could not gather enough idle funds to pay out.
    #[error("insufficient custody: needed {needed}, held {held}")]
    InsufficientCustody { needed: u128, held: u128 },

    #[error("yield source: {0}")]
    YieldSource(#[from] YieldSourceError),

    #[error("token transfer: {0}")]
    Token(TokenError),

    #[error("share ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("arithmetic: {0}")]
    Arithmetic(MathError),
}

/// Any failure of a vault operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl VaultError {
    /// Which of the three categories this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VaultError::Validation(_) => ErrorCategory::Validation,
            VaultError::Authorization(_) => ErrorCategory::Authorization,
            VaultError::State(_) => ErrorCategory::State,
        }
    }
}

impl From<MathError> for StateError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::EmptyPool { total_shares } => StateError::Insolvent { total_shares },
            other => StateError::Arithmetic(other),
        }
    }
}

impl From<MathError> for VaultError {
    fn from(err: MathError) -> Self {
        VaultError::State(err.into())
    }
}

impl From<FeeError> for VaultError {
    fn from(err: FeeError) -> Self {
        match err {
            FeeError::Math(math) => math.into(),
            bound => VaultError::Validation(ValidationError::Fee(bound)),
        }
    }
}

impl From<YieldSourceError> for VaultError {
    fn from(err: YieldSourceError) -> Self {
        VaultError::State(err.into())
    }
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        VaultError::State(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autovault_types::FeeKind;

    #[test]
    fn test_categories() {
        let err: VaultError = ValidationError::NothingToDeposit.into();
        assert_eq!(err.category(), ErrorCategory::Validation);

        let err: VaultError = AuthorizationError::NotAdmin {
            caller: Address::from_label("mallory"),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Authorization);

        let err: VaultError = StateError::Paused.into();
        assert_eq!(err.category(), ErrorCategory::State);
    }

    #[test]
    fn test_fee_bound_is_validation() {
        let err: VaultError = FeeError::AboveMaximum {
            kind: FeeKind::Performance,
            value: 9999,
            max: 500,
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "performance fee cannot be more than 500 bps, got 9999");
    }

    #[test]
    fn test_empty_pool_is_insolvency() {
        let err: VaultError = MathError::EmptyPool { total_shares: 7 }.into();
        assert_eq!(err, VaultError::State(StateError::Insolvent { total_shares: 7 }));
    }

    #[test]
    fn test_fee_math_is_state() {
        let err: VaultError = FeeError::Math(MathError::Overflow).into();
        assert_eq!(err, VaultError::State(StateError::Arithmetic(MathError::Overflow)));
    }

    #[test]
    fn test_messages() {
        assert_eq!(VaultError::from(ValidationError::NothingToDeposit).to_string(), "nothing to deposit");
        assert_eq!(VaultError::from(StateError::Paused).to_string(), "vault is paused");
        let err = ValidationError::WithdrawExceedsBalance {
            requested: 999,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "withdraw amount exceeds balance: requested 999, available 10"
        );
    }
}
