//! TOML scenarios.
//!
//! A scenario declares funded accounts and a list of steps. Steps run in
//! order against a fresh [`Deployment`]; a failing step is recorded in the
//! report and the run continues, so rejections can be scripted too.
//!
//! ```toml
//! start_time = 1_700_000_000
//! reward_per_second = 10
//!
//! [fees]
//! withdraw_fee_bps = 0
//!
//! [[accounts]]
//! label = "alice"
//! balance = 1000
//!
//! [[steps]]
//! action = "deposit"
//! account = "alice"
//! amount = 500
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use autovault_core::{AssetToken, FeeConfig, YieldSource};
use autovault_types::{Address, FeeKind, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bus::{drain, SequencedEvent};
use crate::deployment::{account, Deployment, DeploymentConfig, ADMIN_LABEL, OWNER_LABEL, ROLE_LABELS};
use crate::{Result, SimError};

/// A scripted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_time: Timestamp,
    #[serde(default)]
    pub reward_per_second: u64,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A depositor funded before the first step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSpec {
    pub label: String,
    #[serde(default)]
    pub balance: u64,
}

fn default_admin() -> String {
    ADMIN_LABEL.to_string()
}

fn default_owner() -> String {
    OWNER_LABEL.to_string()
}

/// One scripted action. Accounts are referenced by label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Deposit {
        account: String,
        amount: u64,
    },
    Withdraw {
        account: String,
        amount: u64,
    },
    WithdrawAll {
        account: String,
    },
    Harvest {
        caller: String,
    },
    /// Move the clock and accrue pool reward.
    Advance {
        seconds: u64,
    },
    /// Inject reward into the pool.
    AddReward {
        amount: u64,
    },
    /// Send asset to the vault without minting shares.
    Donate {
        amount: u64,
    },
    Pause {
        #[serde(default = "default_admin")]
        caller: String,
    },
    Unpause {
        #[serde(default = "default_admin")]
        caller: String,
    },
    EmergencyWithdraw {
        #[serde(default = "default_admin")]
        caller: String,
    },
    HaltPool,
    ResumePool,
    SetFee {
        kind: FeeKind,
        bps: u64,
        #[serde(default = "default_admin")]
        caller: String,
    },
    SetWithdrawFeePeriod {
        seconds: u64,
        #[serde(default = "default_admin")]
        caller: String,
    },
    SetAdmin {
        admin: String,
        #[serde(default = "default_owner")]
        caller: String,
    },
    SetTreasury {
        treasury: String,
        #[serde(default = "default_owner")]
        caller: String,
    },
    TransferOwnership {
        owner: String,
        #[serde(default = "default_owner")]
        caller: String,
    },
    /// Mint a token other than the asset straight to the vault.
    SendStrayToken {
        token: String,
        amount: u64,
    },
    /// Sweep the vault's balance of `token` to the caller.
    RecoverForeignToken {
        token: String,
        #[serde(default = "default_admin")]
        caller: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawAll { .. } => "withdraw_all",
            Step::Harvest { .. } => "harvest",
            Step::Advance { .. } => "advance",
            Step::AddReward { .. } => "add_reward",
            Step::Donate { .. } => "donate",
            Step::Pause { .. } => "pause",
            Step::Unpause { .. } => "unpause",
            Step::EmergencyWithdraw { .. } => "emergency_withdraw",
            Step::HaltPool => "halt_pool",
            Step::ResumePool => "resume_pool",
            Step::SetFee { .. } => "set_fee",
            Step::SetWithdrawFeePeriod { .. } => "set_withdraw_fee_period",
            Step::SetAdmin { .. } => "set_admin",
            Step::SetTreasury { .. } => "set_treasury",
            Step::TransferOwnership { .. } => "transfer_ownership",
            Step::SendStrayToken { .. } => "send_stray_token",
            Step::RecoverForeignToken { .. } => "recover_foreign_token",
        }
    }

    /// Account labels the step refers to. Token labels are not accounts.
    fn labels(&self) -> Vec<&str> {
        match self {
            Step::Deposit { account, .. }
            | Step::Withdraw { account, .. }
            | Step::WithdrawAll { account } => vec![account.as_str()],
            Step::Harvest { caller }
            | Step::Pause { caller }
            | Step::Unpause { caller }
            | Step::EmergencyWithdraw { caller }
            | Step::SetFee { caller, .. }
            | Step::SetWithdrawFeePeriod { caller, .. }
            | Step::RecoverForeignToken { caller, .. } => vec![caller.as_str()],
            Step::SetAdmin { admin: target, caller }
            | Step::SetTreasury { treasury: target, caller }
            | Step::TransferOwnership { owner: target, caller } => vec![caller.as_str(), target.as_str()],
            Step::Advance { .. }
            | Step::AddReward { .. }
            | Step::Donate { .. }
            | Step::HaltPool
            | Step::ResumePool
            | Step::SendStrayToken { .. } => Vec::new(),
        }
    }
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that every step refers to a declared account or a role.
    pub fn validate(&self) -> Result<()> {
        let known: BTreeSet<&str> = self
            .accounts
            .iter()
            .map(|spec| spec.label.as_str())
            .chain(ROLE_LABELS)
            .collect();
        for step in &self.steps {
            if let Some(label) = step.labels().into_iter().find(|label| !known.contains(label)) {
                return Err(SimError::UnknownAccount {
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Result of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: String,
    /// Clock value when the step ran.
    pub time: Timestamp,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SequencedEvent>,
}

/// One account at the end of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub label: String,
    pub address: Address,
    /// Asset held outside the vault.
    pub wallet: u128,
    pub shares: u128,
    /// Current asset value of the shares.
    pub value: u128,
}

/// Vault state at the end of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub time: Timestamp,
    pub total_shares: u128,
    pub balance_of: u128,
    pub available: u128,
    pub staked: u128,
    /// `None` if the vault is insolvent.
    pub price_per_full_share: Option<u128>,
    pub last_harvested_time: Timestamp,
    pub paused: bool,
    pub treasury_balance: u128,
    pub accounts: Vec<AccountSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<StepOutcome>,
    pub failed_steps: usize,
    pub final_state: VaultSnapshot,
}

/// Run `scenario` against a fresh deployment.
///
/// # Errors
///
/// Only setup failures: unknown labels, invalid fees or funding overflow.
/// Step failures are reported in [`ScenarioReport::steps`].
pub fn run(scenario: &Scenario) -> Result<ScenarioReport> {
    scenario.validate()?;

    let mut deployment = Deployment::new(&DeploymentConfig {
        fees: scenario.fees.clone(),
        reward_per_second: u128::from(scenario.reward_per_second),
        start_time: scenario.start_time,
    })?;
    for spec in &scenario.accounts {
        deployment.fund(account(&spec.label), u128::from(spec.balance))?;
    }
    let mut receiver = deployment.bus().subscribe();

    tracing::info!(
        name = scenario.name.as_deref().unwrap_or("unnamed"),
        accounts = scenario.accounts.len(),
        steps = scenario.steps.len(),
        "scenario: starting"
    );

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let time = deployment.now();
        let result = apply(&mut deployment, step);
        let events = drain(&mut receiver);
        let outcome = match result {
            Ok(detail) => StepOutcome {
                index,
                action: step.name().to_string(),
                time,
                ok: true,
                detail,
                error: None,
                events,
            },
            Err(err) => {
                tracing::warn!(index, action = step.name(), %err, "scenario: step failed");
                StepOutcome {
                    index,
                    action: step.name().to_string(),
                    time,
                    ok: false,
                    detail: None,
                    error: Some(err.to_string()),
                    events,
                }
            }
        };
        steps.push(outcome);
    }

    let failed_steps = steps.iter().filter(|outcome| !outcome.ok).count();
    let final_state = snapshot(&deployment, scenario);
    tracing::info!(
        failed_steps,
        total_shares = final_state.total_shares,
        balance_of = final_state.balance_of,
        "scenario: finished"
    );
    Ok(ScenarioReport {
        name: scenario.name.clone(),
        steps,
        failed_steps,
        final_state,
    })
}

fn apply(deployment: &mut Deployment, step: &Step) -> Result<Option<serde_json::Value>> {
    let now = deployment.now();
    let detail = match step {
        Step::Deposit { account: label, amount } => {
            let shares = deployment
                .vault_mut()
                .deposit(account(label), u128::from(*amount), now)?;
            Some(json!({ "shares": shares }))
        }
        Step::Withdraw { account: label, amount } => {
            let receipt = deployment
                .vault_mut()
                .withdraw(account(label), u128::from(*amount), now)?;
            Some(serde_json::to_value(receipt)?)
        }
        Step::WithdrawAll { account: label } => {
            let receipt = deployment.vault_mut().withdraw_all(account(label), now)?;
            Some(serde_json::to_value(receipt)?)
        }
        Step::Harvest { caller } => {
            let report = deployment.vault_mut().harvest(account(caller), now)?;
            Some(serde_json::to_value(report)?)
        }
        Step::Advance { seconds } => {
            let accrued = deployment.advance(*seconds)?;
            Some(json!({ "accrued": accrued }))
        }
        Step::AddReward { amount } => {
            let distributed = deployment.pool().add_reward(u128::from(*amount))?;
            Some(json!({ "distributed": distributed }))
        }
        Step::Donate { amount } => {
            deployment.donate(u128::from(*amount))?;
            None
        }
        Step::Pause { caller } => {
            deployment.vault_mut().pause(account(caller))?;
            None
        }
        Step::Unpause { caller } => {
            deployment.vault_mut().unpause(account(caller))?;
            None
        }
        Step::EmergencyWithdraw { caller } => {
            let amount = deployment.vault_mut().emergency_withdraw(account(caller))?;
            Some(json!({ "amount": amount }))
        }
        Step::HaltPool => {
            deployment.pool().set_halted(true);
            None
        }
        Step::ResumePool => {
            deployment.pool().set_halted(false);
            None
        }
        Step::SetFee { kind, bps, caller } => {
            deployment.vault_mut().set_fee(account(caller), *kind, *bps)?;
            None
        }
        Step::SetWithdrawFeePeriod { seconds, caller } => {
            deployment
                .vault_mut()
                .set_withdraw_fee_period(account(caller), *seconds)?;
            None
        }
        Step::SetAdmin { admin, caller } => {
            deployment.vault_mut().set_admin(account(caller), account(admin))?;
            None
        }
        Step::SetTreasury { treasury, caller } => {
            deployment
                .vault_mut()
                .set_treasury(account(caller), account(treasury))?;
            None
        }
        Step::TransferOwnership { owner, caller } => {
            deployment
                .vault_mut()
                .transfer_ownership(account(caller), account(owner))?;
            None
        }
        Step::SendStrayToken { token, amount } => {
            let vault = deployment.vault().address();
            deployment.foreign_token(token).mint(vault, u128::from(*amount))?;
            None
        }
        Step::RecoverForeignToken { token, caller } => {
            let mut token = deployment.foreign_token(token);
            let amount = deployment
                .vault_mut()
                .recover_foreign_token(account(caller), &mut token)?;
            Some(json!({ "amount": amount }))
        }
    };
    Ok(detail)
}

fn snapshot(deployment: &Deployment, scenario: &Scenario) -> VaultSnapshot {
    let vault = deployment.vault();
    let accounts = scenario
        .accounts
        .iter()
        .map(|spec| {
            let address = account(&spec.label);
            AccountSnapshot {
                label: spec.label.clone(),
                address,
                wallet: deployment.balance(address),
                shares: vault.user_info(address).shares,
                value: vault.asset_value_of(address).unwrap_or_default(),
            }
        })
        .collect();
    VaultSnapshot {
        time: deployment.now(),
        total_shares: vault.total_shares(),
        balance_of: vault.balance_of(),
        available: vault.available(),
        staked: vault.yield_source().staked_balance(vault.address()),
        price_per_full_share: vault.price_per_full_share().ok(),
        last_harvested_time: vault.last_harvested_time(),
        paused: vault.is_paused(),
        treasury_balance: deployment.asset().balance_of(vault.roles().treasury()),
        accounts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "three depositors"
start_time = 1000

[fees]
performance_fee_bps = 0
call_fee_bps = 0
withdraw_fee_bps = 0

[[accounts]]
label = "alice"
balance = 10

[[accounts]]
label = "bob"
balance = 20

[[accounts]]
label = "carol"
balance = 100

[[steps]]
action = "deposit"
account = "alice"
amount = 10

[[steps]]
action = "deposit"
account = "bob"
amount = 20

[[steps]]
action = "deposit"
account = "carol"
amount = 100

[[steps]]
action = "withdraw"
account = "bob"
amount = 25
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_toml_str(SAMPLE).expect("parse");
        assert_eq!(scenario.accounts.len(), 3);
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(scenario.steps[3].name(), "withdraw");
        assert_eq!(scenario.fees.withdraw_fee_period_secs, FeeConfig::default().withdraw_fee_period_secs);
    }

    #[test]
    fn test_run_records_failures_and_continues() {
        let scenario = Scenario::from_toml_str(SAMPLE).expect("parse");
        let report = run(&scenario).expect("run");

        assert_eq!(report.failed_steps, 1);
        let failed = &report.steps[3];
        assert!(!failed.ok);
        assert!(failed.error.as_deref().is_some_and(|err| err.contains("exceeds")));
        assert!(failed.events.is_empty());

        assert_eq!(report.steps[0].events.len(), 1);
        assert_eq!(report.final_state.total_shares, 130);
        assert_eq!(report.final_state.price_per_full_share, Some(autovault_math::pricing::PRICE_PRECISION));
        assert_eq!(report.final_state.accounts[2].shares, 100);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let content = "[[steps]]\naction = \"harvest\"\ncaller = \"mallory\"\n";
        let scenario = Scenario::from_toml_str(content).expect("parse");
        let err = run(&scenario).expect_err("unknown");
        assert!(matches!(err, SimError::UnknownAccount { label } if label == "mallory"));
    }

    #[test]
    fn test_admin_defaults_and_pool_controls() {
        let content = r#"
reward_per_second = 1

[fees]
withdraw_fee_bps = 0

[[accounts]]
label = "alice"
balance = 1000

[[steps]]
action = "deposit"
account = "alice"
amount = 1000

[[steps]]
action = "advance"
seconds = 100

[[steps]]
action = "halt_pool"

[[steps]]
action = "harvest"
caller = "alice"

[[steps]]
action = "emergency_withdraw"

[[steps]]
action = "withdraw_all"
account = "alice"

[[steps]]
action = "set_fee"
kind = "performance"
bps = 9999
"#;
        let scenario = Scenario::from_toml_str(content).expect("parse");
        let report = run(&scenario).expect("run");
        let oks: Vec<bool> = report.steps.iter().map(|step| step.ok).collect();
        assert_eq!(oks, [true, true, true, false, true, true, false]);
        assert_eq!(report.final_state.total_shares, 0);
        assert_eq!(report.final_state.accounts[0].wallet, 1_000);
    }

    #[test]
    fn test_governance_and_recovery_steps() {
        let content = r#"
[[accounts]]
label = "alice"

[[accounts]]
label = "bob"

[[steps]]
action = "send_stray_token"
token = "airdrop"
amount = 77

[[steps]]
action = "recover_foreign_token"
token = "cake"

[[steps]]
action = "set_admin"
admin = "alice"

[[steps]]
action = "recover_foreign_token"
token = "airdrop"

[[steps]]
action = "recover_foreign_token"
token = "airdrop"
caller = "alice"

[[steps]]
action = "transfer_ownership"
owner = "bob"

[[steps]]
action = "set_treasury"
treasury = "alice"

[[steps]]
action = "set_treasury"
treasury = "alice"
caller = "bob"
"#;
        let scenario = Scenario::from_toml_str(content).expect("parse");
        let report = run(&scenario).expect("run");
        let oks: Vec<bool> = report.steps.iter().map(|step| step.ok).collect();
        assert_eq!(oks, [true, false, true, false, true, true, false, true]);
        assert_eq!(report.steps[4].detail, Some(json!({ "amount": 77 })));
        assert_eq!(report.steps[4].events[0].event.name(), "ForeignTokenRecovered");
        assert!(report.steps[1].error.as_deref().is_some_and(|err| err.contains("deposit token")));
        assert_eq!(report.steps[7].events[0].event.name(), "TreasuryChanged");
    }

    #[test]
    fn test_governance_targets_must_be_known() {
        let content = "[[steps]]\naction = \"set_admin\"\nadmin = \"mallory\"\n";
        let scenario = Scenario::from_toml_str(content).expect("parse");
        let err = run(&scenario).expect_err("unknown");
        assert!(matches!(err, SimError::UnknownAccount { label } if label == "mallory"));
    }

    #[test]
    fn test_bundled_scenario_runs_clean() {
        let scenario = Scenario::from_toml_str(include_str!("../scenarios/harvest.toml")).expect("parse");
        let report = run(&scenario).expect("run");
        assert_eq!(report.failed_steps, 0);
        assert_eq!(report.final_state.total_shares, 0);
        assert!(report.final_state.treasury_balance > 0);
        assert!(report.final_state.accounts[0].wallet > 100_000);
    }
}
