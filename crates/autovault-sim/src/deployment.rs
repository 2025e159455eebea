//! Deployment harness.
//!
//! Wires one asset token, one staking pool with its receipt token, and a
//! vault over the shared ledger, with every address derived from a fixed
//! label. Keeps the simulation clock.

use autovault_core::{
    AssetToken, FeeConfig, TokenError, Vault, VaultConfig, VaultError, YieldSource,
};
use autovault_types::{Address, Timestamp};

use crate::bus::EventBus;
use crate::ledger::{self, LedgerToken, SharedLedger, TokenLedger, UNLIMITED_ALLOWANCE};
use crate::pool::StakingPool;

pub const ASSET_LABEL: &str = "cake";
pub const RECEIPT_LABEL: &str = "syrup";
pub const POOL_LABEL: &str = "pool";
pub const VAULT_LABEL: &str = "vault";
pub const OWNER_LABEL: &str = "owner";
pub const ADMIN_LABEL: &str = "admin";
pub const TREASURY_LABEL: &str = "treasury";

/// Labels that resolve without being declared as accounts.
pub const ROLE_LABELS: [&str; 3] = [OWNER_LABEL, ADMIN_LABEL, TREASURY_LABEL];

/// Parameters of a deployment.
#[derive(Debug, Clone, Default)]
pub struct DeploymentConfig {
    pub fees: FeeConfig,
    pub reward_per_second: u128,
    pub start_time: Timestamp,
}

/// The simulated vault type.
pub type SimVault = Vault<LedgerToken, StakingPool>;

/// A vault deployed over simulated collaborators.
pub struct Deployment {
    ledger: SharedLedger,
    asset: LedgerToken,
    pool: StakingPool,
    vault: SimVault,
    bus: EventBus,
    now: Timestamp,
}

impl Deployment {
    pub fn new(config: &DeploymentConfig) -> Result<Self, VaultError> {
        let ledger = TokenLedger::shared();
        let asset = LedgerToken::new(account(ASSET_LABEL), ledger.clone());
        let pool = StakingPool::new(
            account(POOL_LABEL),
            asset.address(),
            account(RECEIPT_LABEL),
            ledger.clone(),
            config.reward_per_second,
        );

        let mut vault_config = VaultConfig::new(
            account(OWNER_LABEL),
            account(ADMIN_LABEL),
            account(TREASURY_LABEL),
        );
        vault_config.fees = config.fees.clone();
        let mut vault = Vault::new(account(VAULT_LABEL), asset.clone(), pool.clone(), &vault_config)?;

        // the vault stakes through the pool's allowance
        asset.approve(vault.address(), pool.address(), UNLIMITED_ALLOWANCE);

        let bus = EventBus::default();
        vault.subscribe(bus.clone());

        tracing::info!(
            vault = %vault.address(),
            pool = %pool.address(),
            reward_per_second = config.reward_per_second,
            "deployment: ready"
        );
        Ok(Self {
            ledger,
            asset,
            pool,
            vault,
            bus,
            now: config.start_time,
        })
    }

    /// Mint `amount` of the asset to `holder` and approve the vault for it.
    pub fn fund(&self, holder: Address, amount: u128) -> Result<(), TokenError> {
        self.asset.mint(holder, amount)?;
        self.asset.approve(holder, self.vault.address(), UNLIMITED_ALLOWANCE);
        Ok(())
    }

    /// Send asset straight to the vault without minting shares.
    pub fn donate(&self, amount: u128) -> Result<(), TokenError> {
        self.asset.mint(self.vault.address(), amount)
    }

    /// Asset balance of `holder`.
    pub fn balance(&self, holder: Address) -> u128 {
        self.asset.balance_of(holder)
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Move the clock forward and accrue pool reward for the elapsed time.
    pub fn advance(&mut self, seconds: u64) -> Result<u128, TokenError> {
        self.now = self.now.saturating_add(seconds);
        self.pool.advance(seconds)
    }

    pub fn vault(&self) -> &SimVault {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut SimVault {
        &mut self.vault
    }

    pub fn pool(&self) -> &StakingPool {
        &self.pool
    }

    pub fn asset(&self) -> &LedgerToken {
        &self.asset
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Receipt tokens held by the vault.
    pub fn vault_receipts(&self) -> u128 {
        ledger::lock(&self.ledger).balance(self.pool.receipt_token(), self.vault.address())
    }

    /// A second token on the same ledger, unrelated to the vault.
    pub fn foreign_token(&self, label: &str) -> LedgerToken {
        LedgerToken::new(account(label), self.ledger.clone())
    }

    pub fn owner(&self) -> Address {
        account(OWNER_LABEL)
    }

    pub fn admin(&self) -> Address {
        account(ADMIN_LABEL)
    }

    pub fn treasury(&self) -> Address {
        account(TREASURY_LABEL)
    }
}

/// Deterministic address for a label.
pub fn account(label: &str) -> Address {
    Address::from_label(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_and_deposit() {
        let mut deployment = Deployment::new(&DeploymentConfig::default()).expect("deploy");
        let alice = account("alice");
        deployment.fund(alice, 100).expect("fund");

        let now = deployment.now();
        deployment.vault_mut().deposit(alice, 100, now).expect("deposit");
        assert_eq!(deployment.pool().total_staked(), 100);
        assert_eq!(deployment.vault_receipts(), 100);
        assert_eq!(deployment.vault().balance_of(), 100);
        assert_eq!(deployment.bus().sequence(), 1);
    }

    #[test]
    fn test_advance_moves_clock_and_accrues() {
        let mut deployment = Deployment::new(&DeploymentConfig {
            reward_per_second: 2,
            start_time: 1_000,
            ..DeploymentConfig::default()
        })
        .expect("deploy");
        let alice = account("alice");
        deployment.fund(alice, 10).expect("fund");
        deployment.vault_mut().deposit(alice, 10, 1_000).expect("deposit");

        assert_eq!(deployment.advance(30).expect("advance"), 60);
        assert_eq!(deployment.now(), 1_030);
        assert_eq!(deployment.vault().total_pending_rewards(), 60);
    }

    #[test]
    fn test_role_addresses_are_derived() {
        let deployment = Deployment::new(&DeploymentConfig::default()).expect("deploy");
        assert_ne!(deployment.treasury(), Address::ZERO);
        assert_eq!(deployment.asset().address(), account(ASSET_LABEL));
    }
}
