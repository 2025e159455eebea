//! Multi-token balance book.
//!
//! Every simulated token lives in one [`TokenLedger`], keyed by token
//! address. The vault and the staking pool see it through [`LedgerToken`]
//! handles that share the same `Arc<Mutex<_>>`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autovault_core::{AssetToken, TokenError};
use autovault_types::Address;

/// Ledger shared between tokens, pool and harness.
pub type SharedLedger = Arc<Mutex<TokenLedger>>;

/// Allowance that is never decremented.
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX;

/// Balances, allowances and supply for any number of tokens.
#[derive(Debug, Default)]
pub struct TokenLedger {
    balances: BTreeMap<(Address, Address), u128>,
    allowances: BTreeMap<(Address, Address, Address), u128>,
    supply: BTreeMap<Address, u128>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh ledger for sharing.
    pub fn shared() -> SharedLedger {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn balance(&self, token: Address, holder: Address) -> u128 {
        self.balances.get(&(token, holder)).copied().unwrap_or_default()
    }

    pub fn total_supply(&self, token: Address) -> u128 {
        self.supply.get(&token).copied().unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Create `amount` new units of `token` for `to`.
    pub fn mint(&mut self, token: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or_else(|| TokenError::Rejected(format!("{token} supply overflow")))?;
        // balance <= supply, so this cannot overflow once the supply check passed
        let balance = self.balance(token, to).saturating_add(amount);
        self.supply.insert(token, supply);
        self.balances.insert((token, to), balance);
        Ok(())
    }

    /// Destroy `amount` units of `token` held by `from`.
    pub fn burn(&mut self, token: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance(token, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.balances.insert((token, from), available - amount);
        let supply = self.total_supply(token).saturating_sub(amount);
        self.supply.insert(token, supply);
        Ok(())
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128) {
        self.allowances.insert((token, owner, spender), amount);
    }

    /// Move `amount` of `token` between two holders.
    pub fn move_balance(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let available = self.balance(token, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        self.balances.insert((token, from), available - amount);
        let credited = self.balance(token, to).saturating_add(amount);
        self.balances.insert((token, to), credited);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on `spender`'s allowance.
    ///
    /// Nothing changes unless both the allowance and the balance suffice.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                needed: amount,
                allowed,
            });
        }
        self.move_balance(token, from, to, amount)?;
        if allowed != UNLIMITED_ALLOWANCE {
            self.approve(token, from, spender, allowed - amount);
        }
        Ok(())
    }
}

/// Lock the shared ledger, recovering from a poisoned lock.
pub fn lock(ledger: &SharedLedger) -> MutexGuard<'_, TokenLedger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One token of the shared ledger, as seen by the vault.
#[derive(Clone, Debug)]
pub struct LedgerToken {
    address: Address,
    ledger: SharedLedger,
}

impl LedgerToken {
    pub fn new(address: Address, ledger: SharedLedger) -> Self {
        Self { address, ledger }
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn mint(&self, to: Address, amount: u128) -> Result<(), TokenError> {
        lock(&self.ledger).mint(self.address, to, amount)
    }

    pub fn approve(&self, owner: Address, spender: Address, amount: u128) {
        lock(&self.ledger).approve(self.address, owner, spender, amount);
    }

    pub fn total_supply(&self) -> u128 {
        lock(&self.ledger).total_supply(self.address)
    }
}

impl AssetToken for LedgerToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, holder: Address) -> u128 {
        lock(&self.ledger).balance(self.address, holder)
    }

    fn transfer(&mut self, holder: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        lock(&self.ledger).move_balance(self.address, holder, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        lock(&self.ledger).transfer_from(self.address, spender, from, to, amount)
    }
}
