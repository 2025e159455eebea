//! Vault controller.
//!
//! Owns the share ledger, the fee schedule, the role holders and the two
//! collaborators. All mutations go through `&mut self`, so they are
//! serialized; each one follows the same order:
//!
//! 1. authorize and validate, compute every local delta
//! 2. perform the external calls
//! 3. commit local state
//! 4. notify observers
//!
//! A failure in steps 1 or 2 returns before anything local changes.
//!
//! ## States
//!
//! `Active` and `Paused`. Pausing blocks [`Vault::deposit`] and
//! [`Vault::harvest`]; withdrawals and [`Vault::emergency_withdraw`] keep
//! working so depositors can always leave.

use autovault_math::{pricing, MathError};
use autovault_math::fees::FeeSchedule;
use autovault_types::{Address, FeeKind, Timestamp, UserRecord, VaultEvent};
use serde::{Deserialize, Serialize};

use crate::access::{Capability, Roles};
use crate::collaborators::{AssetToken, TokenError, YieldSource};
use crate::config::VaultConfig;
use crate::error::{RestrictedToken, StateError, ValidationError, VaultError};
use crate::ledger::ShareLedger;
use crate::observer::VaultObserver;
use crate::Result;

/// Outcome of a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// Asset amount taken out of the vault, fee included.
    pub amount: u128,
    pub shares_burned: u128,
    /// Part of `amount` sent to the treasury.
    pub fee: u128,
}

impl WithdrawReceipt {
    /// Amount the depositor actually received.
    pub fn received(&self) -> u128 {
        self.amount.saturating_sub(self.fee)
    }
}

/// Outcome of a harvest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Reward paid out by the yield source.
    pub claimed: u128,
    pub performance_fee: u128,
    pub call_fee: u128,
    /// Staked back into the yield source.
    pub reinvested: u128,
}

/// A share-based vault over one asset and one yield source.
pub struct Vault<T, Y> {
    address: Address,
    asset: T,
    source: Y,
    roles: Roles,
    fees: FeeSchedule,
    ledger: ShareLedger,
    paused: bool,
    last_harvested_time: Timestamp,
    observers: Vec<Box<dyn VaultObserver>>,
}

impl<T: AssetToken, Y: YieldSource> Vault<T, Y> {
    /// Create a vault at `address` from a validated configuration.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ZeroAddress`] if a role is the zero address
    /// - [`ValidationError::Fee`] if a fee exceeds its ceiling
    pub fn new(address: Address, asset: T, source: Y, config: &VaultConfig) -> Result<Self> {
        let roles = config.roles()?;
        let fees = config.fee_schedule()?;
        Ok(Self::from_parts(address, asset, source, roles, fees))
    }

    /// Create a vault from already validated parts.
    pub fn from_parts(address: Address, asset: T, source: Y, roles: Roles, fees: FeeSchedule) -> Self {
        tracing::info!(
            vault = %address,
            asset = %asset.address(),
            owner = %roles.owner(),
            admin = %roles.admin(),
            treasury = %roles.treasury(),
            "vault: created"
        );
        Self {
            address,
            asset,
            source,
            roles,
            fees,
            ledger: ShareLedger::new(),
            paused: false,
            last_harvested_time: 0,
            observers: Vec::new(),
        }
    }

    /// Register an observer for every subsequent event.
    pub fn subscribe(&mut self, observer: impl VaultObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ---------------------------------------------------------------------
    // Read surface
    // ---------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn asset(&self) -> &T {
        &self.asset
    }

    pub fn yield_source(&self) -> &Y {
        &self.source
    }

    pub fn total_shares(&self) -> u128 {
        self.ledger.total_shares()
    }

    /// Asset held idle by the vault itself.
    pub fn available(&self) -> u128 {
        self.asset.balance_of(self.address)
    }

    /// Managed balance: idle asset plus the stake in the yield source.
    pub fn balance_of(&self) -> u128 {
        self.available()
            .saturating_add(self.source.staked_balance(self.address))
    }

    /// Asset value of one full share, scaled by
    /// [`PRICE_PRECISION`](autovault_math::pricing::PRICE_PRECISION).
    pub fn price_per_full_share(&self) -> Result<u128> {
        Ok(pricing::price_per_full_share(self.balance_of(), self.total_shares())?)
    }

    pub fn user_info(&self, user: Address) -> UserRecord {
        self.ledger.record(&user)
    }

    /// Current asset value of `user`'s shares.
    pub fn asset_value_of(&self, user: Address) -> Result<u128> {
        let shares = self.ledger.shares_of(&user);
        Ok(pricing::assets_for_shares(shares, self.total_shares(), self.balance_of())?)
    }

    pub fn last_harvested_time(&self) -> Timestamp {
        self.last_harvested_time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn ledger(&self) -> &ShareLedger {
        &self.ledger
    }

    /// Idle asset plus reward pending in the yield source: the base the next
    /// harvest would split.
    pub fn total_pending_rewards(&self) -> u128 {
        self.available()
            .saturating_add(self.source.pending_reward(self.address))
    }

    /// Call fee a harvest would pay its caller right now.
    pub fn pending_harvest_call_fee(&self) -> Result<u128> {
        Ok(self.fees.pending_call_fee(self.total_pending_rewards())?)
    }

    // ---------------------------------------------------------------------
    // Depositor operations
    // ---------------------------------------------------------------------

    /// Deposit `amount` of the asset for `user`. Returns the shares minted.
    ///
    /// The whole idle balance is staked afterwards. If staking fails the
    /// deposit is returned to `user` and no shares are minted.
    ///
    /// # Errors
    ///
    /// - [`StateError::Paused`] while paused
    /// - [`ValidationError::NothingToDeposit`] if `amount` is zero
    /// - [`ValidationError::DepositTooSmall`] if it would mint zero shares
    /// - [`ValidationError::Funding`] if `user` lacks balance or allowance
    /// - [`StateError::Insolvent`] if shares exist but nothing backs them
    /// - [`StateError::YieldSource`] if staking fails
    pub fn deposit(&mut self, user: Address, amount: u128, now: Timestamp) -> Result<u128> {
        self.require_active()?;
        if amount == 0 {
            return Err(ValidationError::NothingToDeposit.into());
        }

        let total_shares = self.total_shares();
        let minted = pricing::shares_for_deposit(amount, total_shares, self.balance_of())?;
        if minted == 0 {
            return Err(ValidationError::DepositTooSmall { amount }.into());
        }
        total_shares.checked_add(minted).ok_or(MathError::Overflow)?;

        self.asset
            .transfer_from(self.address, user, self.address, amount)
            .map_err(funding_error)?;
        if let Err(err) = self.stake_idle() {
            self.return_deposit(user, amount);
            return Err(err);
        }

        self.ledger.credit(user, minted, now)?;
        self.refresh_snapshot(user);

        tracing::info!(%user, amount, shares = minted, total_shares = self.total_shares(), "vault: deposit");
        self.emit(VaultEvent::Deposit {
            user,
            amount,
            shares: minted,
            last_deposited_time: now,
        });
        Ok(minted)
    }

    /// Withdraw `amount` of the asset (not shares) for `user`.
    ///
    /// Burns `ceil(amount * total_shares / balance_of)` shares. Inside the
    /// withdrawal fee window the fee is taken out of `amount` and sent to the
    /// treasury.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NothingToWithdraw`] if `amount` is zero
    /// - [`ValidationError::WithdrawExceedsBalance`] if `user`'s shares are worth less
    /// - [`StateError::YieldSource`] if unstaking the shortfall fails
    pub fn withdraw(&mut self, user: Address, amount: u128, now: Timestamp) -> Result<WithdrawReceipt> {
        if amount == 0 {
            return Err(ValidationError::NothingToWithdraw.into());
        }

        let record = self.ledger.record(&user);
        let total_shares = self.total_shares();
        let managed = self.balance_of();
        let available = pricing::assets_for_shares(record.shares, total_shares, managed)?;
        if available < amount {
            return Err(ValidationError::WithdrawExceedsBalance {
                requested: amount,
                available,
            }
            .into());
        }
        // available >= amount bounds the burn by record.shares
        let shares = pricing::shares_for_withdrawal(amount, total_shares, managed)?;

        self.settle_withdrawal(user, &record, amount, shares, now)
    }

    /// Withdraw the full value of `user`'s shares, burning all of them.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NothingToWithdraw`] if `user` holds no shares
    /// - [`StateError::YieldSource`] if unstaking the shortfall fails
    pub fn withdraw_all(&mut self, user: Address, now: Timestamp) -> Result<WithdrawReceipt> {
        let record = self.ledger.record(&user);
        if !record.has_shares() {
            return Err(ValidationError::NothingToWithdraw.into());
        }
        let amount = pricing::assets_for_shares(record.shares, self.total_shares(), self.balance_of())?;

        self.settle_withdrawal(user, &record, amount, record.shares, now)
    }

    fn settle_withdrawal(
        &mut self,
        user: Address,
        record: &UserRecord,
        amount: u128,
        shares: u128,
        now: Timestamp,
    ) -> Result<WithdrawReceipt> {
        let fee = self.fees.withdraw_fee(amount, record.last_deposited_time, now)?;
        let payout = amount.checked_sub(fee).ok_or(MathError::Overflow)?;

        let idle = self.available();
        if idle < amount {
            let shortfall = amount - idle;
            tracing::debug!(shortfall, "vault: unstaking shortfall");
            self.source.withdraw(self.address, shortfall)?;
            let held = self.available();
            if held < amount {
                return Err(StateError::InsufficientCustody { needed: amount, held }.into());
            }
        }

        if fee > 0 {
            self.asset
                .transfer(self.address, self.roles.treasury(), fee)
                .map_err(StateError::Token)?;
        }
        if payout > 0 {
            self.asset
                .transfer(self.address, user, payout)
                .map_err(StateError::Token)?;
        }

        self.ledger.debit(user, shares, now)?;
        self.refresh_snapshot(user);

        tracing::info!(%user, amount, shares, fee, total_shares = self.total_shares(), "vault: withdraw");
        self.emit(VaultEvent::Withdraw {
            user,
            amount,
            shares,
            fee,
        });
        Ok(WithdrawReceipt {
            amount,
            shares_burned: shares,
            fee,
        })
    }

    /// Claim the pending reward, pay the performance and call fees, and
    /// restake the rest. A zero reward is a valid harvest.
    ///
    /// Both fees are computed on `idle + claimed`.
    ///
    /// If the restake is rejected no fee is paid, no event is emitted and
    /// `last_harvested_time` is kept. The claimed reward stays idle in the
    /// vault, still backing the shares, and is split by the next harvest.
    ///
    /// # Errors
    ///
    /// - [`StateError::Paused`] while paused
    /// - [`StateError::YieldSource`] if claiming or restaking fails
    pub fn harvest(&mut self, caller: Address, now: Timestamp) -> Result<HarvestReport> {
        self.require_active()?;

        let idle_before = self.available();
        let claimed = self.source.claim_reward(self.address)?;
        let base = idle_before.checked_add(claimed).ok_or(MathError::Overflow)?;
        let split = self.fees.harvest_split(base)?;

        if split.reinvested > 0 {
            if let Err(err) = self.source.deposit(self.address, split.reinvested) {
                // The claim cannot be undone. The reward stays idle with no
                // fee taken and joins the next harvest's base.
                tracing::error!(claimed, reinvested = split.reinvested, %err, "vault: restake failed, harvest aborted");
                return Err(err.into());
            }
        }
        if split.performance_fee > 0 {
            self.asset
                .transfer(self.address, self.roles.treasury(), split.performance_fee)
                .map_err(StateError::Token)?;
        }
        if split.call_fee > 0 {
            self.asset
                .transfer(self.address, caller, split.call_fee)
                .map_err(StateError::Token)?;
        }

        self.last_harvested_time = self.last_harvested_time.max(now);

        tracing::info!(
            %caller,
            claimed,
            performance_fee = split.performance_fee,
            call_fee = split.call_fee,
            reinvested = split.reinvested,
            "vault: harvest"
        );
        self.emit(VaultEvent::Harvest {
            caller,
            performance_fee: split.performance_fee,
            call_fee: split.call_fee,
        });
        Ok(HarvestReport {
            claimed,
            performance_fee: split.performance_fee,
            call_fee: split.call_fee,
            reinvested: split.reinvested,
        })
    }

    // ---------------------------------------------------------------------
    // Admin surface
    // ---------------------------------------------------------------------

    pub fn set_performance_fee(&mut self, caller: Address, bps: u64) -> Result<()> {
        self.set_fee(caller, FeeKind::Performance, bps)
    }

    pub fn set_call_fee(&mut self, caller: Address, bps: u64) -> Result<()> {
        self.set_fee(caller, FeeKind::Call, bps)
    }

    pub fn set_withdraw_fee(&mut self, caller: Address, bps: u64) -> Result<()> {
        self.set_fee(caller, FeeKind::Withdraw, bps)
    }

    /// Set any fee rate. Values above the ceiling are rejected and the
    /// previous rate is kept.
    pub fn set_fee(&mut self, caller: Address, kind: FeeKind, bps: u64) -> Result<()> {
        self.roles.authorize(caller, Capability::Admin)?;
        let previous = self.fees.set_rate(kind, bps)?;
        tracing::info!(%kind, previous, current = bps, "vault: fee updated");
        self.emit(VaultEvent::FeeUpdated {
            kind,
            previous,
            current: bps,
        });
        Ok(())
    }

    /// Set the withdrawal fee window in seconds.
    pub fn set_withdraw_fee_period(&mut self, caller: Address, seconds: u64) -> Result<()> {
        self.roles.authorize(caller, Capability::Admin)?;
        let previous = self.fees.set_withdraw_fee_period(seconds)?;
        tracing::info!(previous, current = seconds, "vault: withdraw fee period updated");
        self.emit(VaultEvent::WithdrawFeePeriodUpdated {
            previous,
            current: seconds,
        });
        Ok(())
    }

    pub fn pause(&mut self, caller: Address) -> Result<()> {
        self.roles.authorize(caller, Capability::Admin)?;
        self.require_active()?;
        self.paused = true;
        tracing::warn!(%caller, "vault: paused");
        self.emit(VaultEvent::Paused);
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<()> {
        self.roles.authorize(caller, Capability::Admin)?;
        if !self.paused {
            return Err(StateError::NotPaused.into());
        }
        self.paused = false;
        tracing::info!(%caller, "vault: unpaused");
        self.emit(VaultEvent::Unpaused);
        Ok(())
    }

    /// Pull the whole stake out of the yield source into the vault.
    ///
    /// Share balances are untouched; afterwards `available() == balance_of()`
    /// and depositors can withdraw without the yield source. Pending reward
    /// is forfeited. Returns the amount pulled back.
    pub fn emergency_withdraw(&mut self, caller: Address) -> Result<u128> {
        self.roles.authorize(caller, Capability::Admin)?;
        let amount = self.source.emergency_withdraw(self.address)?;
        tracing::warn!(%caller, amount, "vault: emergency withdraw");
        self.emit(VaultEvent::EmergencyWithdraw { amount });
        Ok(amount)
    }

    /// Sweep the vault's balance of a token sent to it by mistake to the admin.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::RestrictedToken`] for the deposit asset or the
    ///   yield source receipt token
    pub fn recover_foreign_token(&mut self, caller: Address, token: &mut dyn AssetToken) -> Result<u128> {
        self.roles.authorize(caller, Capability::Admin)?;
        let token_address = token.address();
        let restricted = if token_address == self.asset.address() {
            Some(RestrictedToken::DepositAsset)
        } else if token_address == self.source.receipt_token() {
            Some(RestrictedToken::ReceiptAsset)
        } else {
            None
        };
        if let Some(kind) = restricted {
            return Err(ValidationError::RestrictedToken {
                token: token_address,
                kind,
            }
            .into());
        }

        let amount = token.balance_of(self.address);
        if amount > 0 {
            token
                .transfer(self.address, caller, amount)
                .map_err(StateError::Token)?;
        }
        tracing::warn!(token = %token_address, amount, "vault: foreign token recovered");
        self.emit(VaultEvent::ForeignTokenRecovered {
            token: token_address,
            amount,
        });
        Ok(amount)
    }

    // ---------------------------------------------------------------------
    // Owner surface
    // ---------------------------------------------------------------------

    pub fn set_admin(&mut self, caller: Address, admin: Address) -> Result<()> {
        self.roles.authorize(caller, Capability::Owner)?;
        let previous = self.roles.set_admin(admin)?;
        tracing::info!(%previous, current = %admin, "vault: admin changed");
        self.emit(VaultEvent::AdminChanged {
            previous,
            current: admin,
        });
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: Address, treasury: Address) -> Result<()> {
        self.roles.authorize(caller, Capability::Owner)?;
        let previous = self.roles.set_treasury(treasury)?;
        tracing::info!(%previous, current = %treasury, "vault: treasury changed");
        self.emit(VaultEvent::TreasuryChanged {
            previous,
            current: treasury,
        });
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, owner: Address) -> Result<()> {
        self.roles.authorize(caller, Capability::Owner)?;
        let previous = self.roles.transfer_ownership(owner)?;
        tracing::info!(%previous, current = %owner, "vault: ownership transferred");
        self.emit(VaultEvent::OwnershipTransferred {
            previous,
            current: owner,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn require_active(&self) -> Result<()> {
        if self.paused {
            return Err(StateError::Paused.into());
        }
        Ok(())
    }

    /// Stake everything the vault holds idle.
    fn stake_idle(&mut self) -> Result<()> {
        let idle = self.available();
        if idle > 0 {
            self.source.deposit(self.address, idle)?;
        }
        Ok(())
    }

    fn return_deposit(&mut self, user: Address, amount: u128) {
        if let Err(err) = self.asset.transfer(self.address, user, amount) {
            tracing::error!(%user, amount, %err, "vault: could not return deposit after failed stake");
        }
    }

    fn refresh_snapshot(&mut self, user: Address) {
        // shares <= total_shares, so the value is bounded by the managed balance
        let value = match self.asset_value_of(user) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%user, %err, "vault: could not value shares, snapshot reset");
                0
            }
        };
        self.ledger.set_snapshot(user, value);
    }

    fn emit(&mut self, event: VaultEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
    }
}

fn funding_error(err: TokenError) -> VaultError {
    match err {
        TokenError::Rejected(_) => StateError::Token(err).into(),
        insufficient => ValidationError::Funding(insufficient).into(),
    }
}
