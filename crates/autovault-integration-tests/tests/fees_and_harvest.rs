//! Integration test: withdrawal fee gate and harvest fee split.
//!
//! Exercises fee accounting end to end:
//! 1. The withdrawal fee applies only inside the window after the last deposit
//! 2. A new deposit restarts the window
//! 3. Harvest takes 2% / 0.25% of idle + claimed and restakes the rest
//! 4. Zero-reward harvests succeed and `last_harvested_time` never goes back
//! 5. Paused vaults and halted pools reject harvests without side effects

use autovault_core::{FeeConfig, StateError, VaultError, YieldSource, YieldSourceError};
use autovault_math::fees::{DEFAULT_WITHDRAW_FEE_PERIOD, MAX_WITHDRAW_FEE_PERIOD};
use autovault_sim::{account, Deployment, DeploymentConfig};
use autovault_types::{Address, VaultEvent, SECONDS_PER_HOUR};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

fn deploy(fees: FeeConfig) -> Deployment {
    Deployment::new(&DeploymentConfig {
        fees,
        reward_per_second: 0,
        start_time: BASE_TIME,
    })
    .expect("deployment should succeed")
}

fn depositor(deployment: &Deployment, label: &str, amount: u128) -> Address {
    let user = account(label);
    deployment.fund(user, amount).expect("funding should succeed");
    user
}

/// Default withdrawal fee (0.1% for 72 hours), no harvest fees.
fn withdraw_fee_only() -> FeeConfig {
    FeeConfig {
        performance_fee_bps: 0,
        call_fee_bps: 0,
        ..FeeConfig::default()
    }
}

#[test]
fn withdraw_fee_charged_inside_window_only() {
    let mut d = deploy(withdraw_fee_only());
    let alice = depositor(&d, "alice", 100_000);
    let treasury = d.treasury();
    d.vault_mut().deposit(alice, 100_000, BASE_TIME).expect("deposit");

    let receipt = d
        .vault_mut()
        .withdraw(alice, 50_000, BASE_TIME + SECONDS_PER_HOUR)
        .expect("early withdraw");
    assert_eq!(receipt.fee, 50);
    assert_eq!(receipt.received(), 49_950);
    assert_eq!(d.balance(treasury), 50);
    assert_eq!(d.balance(alice), 49_950);

    // exactly at the end of the window the fee no longer applies
    let receipt = d
        .vault_mut()
        .withdraw_all(alice, BASE_TIME + DEFAULT_WITHDRAW_FEE_PERIOD)
        .expect("late withdraw");
    assert_eq!(receipt.fee, 0);
    assert_eq!(receipt.amount, 50_000);
    assert_eq!(d.balance(alice), 99_950);
    assert_eq!(d.balance(treasury), 50);
}

#[test]
fn new_deposit_restarts_fee_window() {
    let mut d = deploy(withdraw_fee_only());
    let alice = depositor(&d, "alice", 20_000);
    d.vault_mut().deposit(alice, 10_000, BASE_TIME).expect("first deposit");
    let top_up = BASE_TIME + 71 * SECONDS_PER_HOUR;
    d.vault_mut().deposit(alice, 10_000, top_up).expect("top up");

    let receipt = d
        .vault_mut()
        .withdraw(alice, 20_000, BASE_TIME + DEFAULT_WITHDRAW_FEE_PERIOD + 1)
        .expect("withdraw");
    assert_eq!(receipt.fee, 20);
}

#[test]
fn fee_window_follows_admin_period() {
    let mut d = deploy(withdraw_fee_only());
    let alice = depositor(&d, "alice", 10_000);
    let admin = d.admin();
    d.vault_mut().deposit(alice, 10_000, BASE_TIME).expect("deposit");

    d.vault_mut().set_withdraw_fee_period(admin, 0).expect("no window");
    let receipt = d.vault_mut().withdraw(alice, 5_000, BASE_TIME).expect("withdraw");
    assert_eq!(receipt.fee, 0);

    d.vault_mut()
        .set_withdraw_fee_period(admin, MAX_WITHDRAW_FEE_PERIOD)
        .expect("max window");
    let receipt = d.vault_mut().withdraw_all(alice, BASE_TIME + 1).expect("withdraw");
    assert_eq!(receipt.fee, 5);
}

#[test]
fn harvest_splits_fees_on_idle_plus_reward() {
    let mut d = deploy(FeeConfig {
        performance_fee_bps: 200,
        call_fee_bps: 25,
        withdraw_fee_bps: 0,
        ..FeeConfig::default()
    });
    let alice = depositor(&d, "alice", 600_000);
    let bob = depositor(&d, "bob", 400_000);
    let keeper = account("keeper");
    let treasury = d.treasury();
    d.vault_mut().deposit(alice, 600_000, BASE_TIME).expect("alice");
    d.vault_mut().deposit(bob, 400_000, BASE_TIME).expect("bob");

    // I = 40_000 idle, R = 360_000 reward
    d.donate(40_000).expect("donate");
    d.pool().add_reward(360_000).expect("reward");
    assert_eq!(d.vault().total_pending_rewards(), 400_000);
    assert_eq!(d.vault().pending_harvest_call_fee().expect("preview"), 1_000);

    let value_before = d.vault().balance_of();
    let report = d.vault_mut().harvest(keeper, BASE_TIME + 10).expect("harvest");
    assert_eq!(report.claimed, 360_000);
    assert_eq!(report.performance_fee, 8_000);
    assert_eq!(report.call_fee, 1_000);
    assert_eq!(report.reinvested, 391_000);

    assert_eq!(d.balance(treasury), 8_000);
    assert_eq!(d.balance(keeper), 1_000);
    assert_eq!(d.vault().available(), 0);
    assert_eq!(d.vault().balance_of(), 1_391_000);
    // the donated idle was already part of the managed balance
    assert_eq!(d.vault().balance_of() - value_before, 360_000 - 9_000);

    let alice_value = d.vault().asset_value_of(alice).expect("alice value");
    let bob_value = d.vault().asset_value_of(bob).expect("bob value");
    assert_eq!(alice_value, 834_600);
    assert_eq!(bob_value, 556_400);
    assert_eq!(alice_value + bob_value, 1_000_000 + 400_000 - 9_000);
    assert_eq!(d.vault().last_harvested_time(), BASE_TIME + 10);
}

#[test]
fn zero_reward_harvest_succeeds() {
    let mut d = deploy(FeeConfig::zero());
    let keeper = account("keeper");
    let mut rx = d.bus().subscribe();

    let report = d.vault_mut().harvest(keeper, BASE_TIME).expect("harvest");
    assert_eq!(report.claimed, 0);
    assert_eq!(report.reinvested, 0);
    assert_eq!(d.vault().last_harvested_time(), BASE_TIME);

    let event = rx.try_recv().expect("harvest event");
    assert_eq!(
        event.event,
        VaultEvent::Harvest {
            caller: keeper,
            performance_fee: 0,
            call_fee: 0,
        }
    );
}

#[test]
fn last_harvested_time_never_decreases() {
    let mut d = deploy(FeeConfig::default());
    let keeper = account("keeper");
    d.vault_mut().harvest(keeper, BASE_TIME + 100).expect("first");
    d.vault_mut().harvest(keeper, BASE_TIME + 50).expect("clock went back");
    assert_eq!(d.vault().last_harvested_time(), BASE_TIME + 100);
}

#[test]
fn reward_accrues_over_time() {
    let mut d = Deployment::new(&DeploymentConfig {
        fees: FeeConfig::default(),
        reward_per_second: 5,
        start_time: BASE_TIME,
    })
    .expect("deployment");
    let alice = depositor(&d, "alice", 10_000);
    let keeper = account("keeper");
    d.vault_mut().deposit(alice, 10_000, BASE_TIME).expect("deposit");

    assert_eq!(d.advance(2_000).expect("advance"), 10_000);
    let vault_address = d.vault().address();
    assert_eq!(d.pool().pending_reward(vault_address), 10_000);

    let now = d.now();
    let report = d.vault_mut().harvest(keeper, now).expect("harvest");
    assert_eq!(report.performance_fee, 200);
    assert_eq!(report.call_fee, 25);
    assert_eq!(d.vault().balance_of(), 19_775);
    assert_eq!(d.pool().pending_reward(vault_address), 0);
}

#[test]
fn harvest_rejected_when_paused_or_pool_halted() {
    let mut d = deploy(FeeConfig::default());
    let alice = depositor(&d, "alice", 1_000);
    let keeper = account("keeper");
    let admin = d.admin();
    d.vault_mut().deposit(alice, 1_000, BASE_TIME).expect("deposit");
    d.pool().add_reward(100).expect("reward");

    d.vault_mut().pause(admin).expect("pause");
    let err = d.vault_mut().harvest(keeper, BASE_TIME + 1).expect_err("paused");
    assert_eq!(err, VaultError::State(StateError::Paused));
    d.vault_mut().unpause(admin).expect("unpause");

    d.pool().set_halted(true);
    let err = d.vault_mut().harvest(keeper, BASE_TIME + 2).expect_err("halted");
    assert_eq!(err, VaultError::State(StateError::YieldSource(YieldSourceError::Halted)));

    assert_eq!(d.vault().last_harvested_time(), 0);
    assert_eq!(d.balance(keeper), 0);
    assert_eq!(d.vault().total_pending_rewards(), 100);
}
