//! Simulated staking pool.
//!
//! Stakers deposit the asset and receive receipt tokens one to one.
//! Rewards are injected with [`StakingPool::add_reward`] (or accrued over
//! time with [`StakingPool::advance`]) and split pro rata across current
//! stakes. Deposits and withdrawals do not touch pending reward; it is paid
//! only by `claim_reward`.
//!
//! A halted pool rejects everything except `emergency_withdraw`, which
//! returns principal and forfeits pending reward.
//!
//! Handles are cheap clones over shared state, so a harness can keep one
//! while the vault owns another.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autovault_core::{TokenError, YieldSource, YieldSourceError};
use autovault_math::pricing::{self, Rounding};
use autovault_types::Address;

use crate::ledger::{self, SharedLedger};

#[derive(Debug, Default)]
struct PoolState {
    stakes: BTreeMap<Address, u128>,
    pending: BTreeMap<Address, u128>,
    total_staked: u128,
    reward_per_second: u128,
    halted: bool,
}

/// Handle to a staking pool over the shared ledger.
#[derive(Clone, Debug)]
pub struct StakingPool {
    address: Address,
    asset: Address,
    receipt: Address,
    ledger: SharedLedger,
    state: Arc<Mutex<PoolState>>,
}

impl StakingPool {
    pub fn new(
        address: Address,
        asset: Address,
        receipt: Address,
        ledger: SharedLedger,
        reward_per_second: u128,
    ) -> Self {
        Self {
            address,
            asset,
            receipt,
            ledger,
            state: Arc::new(Mutex::new(PoolState {
                reward_per_second,
                ..PoolState::default()
            })),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn total_staked(&self) -> u128 {
        self.state().total_staked
    }

    pub fn is_halted(&self) -> bool {
        self.state().halted
    }

    /// Make every call except `emergency_withdraw` fail with
    /// [`YieldSourceError::Halted`].
    pub fn set_halted(&self, halted: bool) {
        self.state().halted = halted;
        tracing::warn!(pool = %self.address, halted, "pool: halt state changed");
    }

    pub fn set_reward_per_second(&self, reward_per_second: u128) {
        self.state().reward_per_second = reward_per_second;
    }

    /// Mint `amount` of reward into the pool and assign it pro rata.
    ///
    /// Returns the amount actually assigned. With no stakers nothing is
    /// minted; rounding dust is never minted.
    pub fn add_reward(&self, amount: u128) -> Result<u128, TokenError> {
        let mut state = self.state();
        if state.total_staked == 0 || amount == 0 {
            return Ok(0);
        }
        let total_staked = state.total_staked;
        let shares: Vec<(Address, u128)> = state
            .stakes
            .iter()
            .map(|(account, stake)| {
                // stake <= total_staked, so the quotient is bounded by amount
                let share = pricing::mul_div(amount, *stake, total_staked, Rounding::Down).unwrap_or_default();
                (*account, share)
            })
            .collect();
        let distributed: u128 = shares.iter().map(|(_, share)| share).sum();

        ledger::lock(&self.ledger).mint(self.asset, self.address, distributed)?;
        for (account, share) in shares {
            let pending = state.pending.entry(account).or_default();
            *pending = pending.saturating_add(share);
        }
        tracing::debug!(pool = %self.address, amount, distributed, "pool: reward added");
        Ok(distributed)
    }

    /// Accrue `seconds` worth of reward at the configured rate.
    pub fn advance(&self, seconds: u64) -> Result<u128, TokenError> {
        let rate = self.state().reward_per_second;
        self.add_reward(rate.saturating_mul(u128::from(seconds)))
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn running(state: &PoolState) -> Result<(), YieldSourceError> {
    if state.halted {
        return Err(YieldSourceError::Halted);
    }
    Ok(())
}

impl YieldSource for StakingPool {
    fn deposit(&mut self, from: Address, amount: u128) -> Result<(), YieldSourceError> {
        let mut state = self.state();
        running(&state)?;
        let stake = state.stakes.get(&from).copied().unwrap_or_default();
        let new_stake = stake.checked_add(amount);
        let new_total = state.total_staked.checked_add(amount);
        let (Some(new_stake), Some(new_total)) = (new_stake, new_total) else {
            return Err(YieldSourceError::Rejected("stake overflow".to_string()));
        };

        let mut book = ledger::lock(&self.ledger);
        // receipt supply tracks total_staked, so minting cannot overflow after this
        book.transfer_from(self.asset, self.address, from, self.address, amount)?;
        book.mint(self.receipt, from, amount)?;
        drop(book);

        state.stakes.insert(from, new_stake);
        state.total_staked = new_total;
        Ok(())
    }

    fn withdraw(&mut self, to: Address, amount: u128) -> Result<(), YieldSourceError> {
        let mut state = self.state();
        running(&state)?;
        let staked = state.stakes.get(&to).copied().unwrap_or_default();
        if staked < amount {
            return Err(YieldSourceError::InsufficientStake {
                requested: amount,
                staked,
            });
        }

        let mut book = ledger::lock(&self.ledger);
        let receipts = book.balance(self.receipt, to);
        if receipts < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available: receipts,
            }
            .into());
        }
        book.move_balance(self.asset, self.address, to, amount)?;
        book.burn(self.receipt, to, amount)?;
        drop(book);

        state.stakes.insert(to, staked - amount);
        state.total_staked = state.total_staked.saturating_sub(amount);
        Ok(())
    }

    fn claim_reward(&mut self, to: Address) -> Result<u128, YieldSourceError> {
        let mut state = self.state();
        running(&state)?;
        let reward = state.pending.get(&to).copied().unwrap_or_default();
        if reward > 0 {
            ledger::lock(&self.ledger).move_balance(self.asset, self.address, to, reward)?;
            state.pending.remove(&to);
        }
        Ok(reward)
    }

    fn emergency_withdraw(&mut self, to: Address) -> Result<u128, YieldSourceError> {
        let mut state = self.state();
        let staked = state.stakes.get(&to).copied().unwrap_or_default();

        let mut book = ledger::lock(&self.ledger);
        book.move_balance(self.asset, self.address, to, staked)?;
        let receipts = book.balance(self.receipt, to).min(staked);
        book.burn(self.receipt, to, receipts)?;
        drop(book);

        let forfeited = state.pending.remove(&to).unwrap_or_default();
        state.stakes.remove(&to);
        state.total_staked = state.total_staked.saturating_sub(staked);
        tracing::warn!(pool = %self.address, account = %to, staked, forfeited, "pool: emergency withdraw");
        Ok(staked)
    }

    fn pending_reward(&self, account: Address) -> u128 {
        self.state().pending.get(&account).copied().unwrap_or_default()
    }

    fn staked_balance(&self, account: Address) -> u128 {
        self.state().stakes.get(&account).copied().unwrap_or_default()
    }

    fn receipt_token(&self) -> Address {
        self.receipt
    }
}
