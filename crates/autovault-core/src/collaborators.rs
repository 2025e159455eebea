//! External collaborators.
//!
//! The vault never moves funds itself. It drives two collaborators:
//!
//! - an [`AssetToken`] — the fungible deposit asset (and, for recovery, any
//!   foreign token that ended up in the vault)
//! - a [`YieldSource`] — the external protocol the pooled balance is staked in
//!
//! Every call is synchronous and all-or-nothing: an `Err` means the
//! collaborator changed nothing.

use autovault_types::Address;

/// Token transfer failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("transfer amount exceeds balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("transfer amount exceeds allowance: needed {needed}, allowed {allowed}")]
    InsufficientAllowance { needed: u128, allowed: u128 },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Yield source failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YieldSourceError {
    /// The yield source is not accepting stake changes.
    #[error("yield source is halted")]
    Halted,

    #[error("insufficient stake: requested {requested}, staked {staked}")]
    InsufficientStake { requested: u128, staked: u128 },

    #[error("token movement failed: {0}")]
    Token(#[from] TokenError),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// A fungible token ledger as seen by the vault.
pub trait AssetToken {
    /// Address of this token.
    fn address(&self) -> Address;

    fn balance_of(&self, holder: Address) -> u128;

    /// Move `amount` from `holder`'s own balance to `to`.
    fn transfer(&mut self, holder: Address, to: Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;
}

/// The external staking protocol that earns the vault's yield.
///
/// Stake positions are keyed by account. Depositing and withdrawing stake
/// does not pay out pending reward; reward reaches the account only through
/// [`claim_reward`](YieldSource::claim_reward).
pub trait YieldSource {
    /// Pull `amount` of the asset from `from` and add it to `from`'s stake.
    fn deposit(&mut self, from: Address, amount: u128) -> Result<(), YieldSourceError>;

    /// Remove `amount` from `to`'s stake and send it to `to`.
    fn withdraw(&mut self, to: Address, amount: u128) -> Result<(), YieldSourceError>;

    /// Pay all pending reward of `to` to `to`. Returns the amount paid.
    fn claim_reward(&mut self, to: Address) -> Result<u128, YieldSourceError>;

    /// Return `to`'s whole stake, forfeiting pending reward. Returns the
    /// principal sent. Expected to work even when the source is halted.
    fn emergency_withdraw(&mut self, to: Address) -> Result<u128, YieldSourceError>;

    fn pending_reward(&self, account: Address) -> u128;

    fn staked_balance(&self, account: Address) -> u128;

    /// Address of the receipt token issued against stake.
    fn receipt_token(&self) -> Address;
}
