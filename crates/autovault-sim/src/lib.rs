//! # autovault-sim
//!
//! In-memory collaborators for the vault and a scenario runner.
//!
//! The vault only talks to its asset token and yield source through the
//! traits in `autovault-core`. This crate implements both over a single
//! shared balance book so a whole deployment can run in one process, in
//! tests or from a TOML script.
//!
//! ## Modules
//!
//! - [`ledger`] — Multi-token balance book and the `AssetToken` view of it
//! - [`pool`] — Staking pool with receipt tokens and pro rata rewards
//! - [`bus`] — Broadcast event bus fed by the vault
//! - [`deployment`] — Wires token, pool and vault from fixed labels
//! - [`scenario`] — TOML scenarios and their reports

pub mod bus;
pub mod deployment;
pub mod ledger;
pub mod pool;
pub mod scenario;

pub use bus::{EventBus, EventCategory, EventFilter, SequencedEvent};
pub use deployment::{account, Deployment, DeploymentConfig, SimVault};
pub use ledger::{LedgerToken, SharedLedger, TokenLedger};
pub use pool::StakingPool;
pub use scenario::{run, Scenario, ScenarioReport, Step, StepOutcome};

use autovault_core::{TokenError, VaultError};

/// Error types for simulation setup and scenario runs.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Scenario file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid TOML for a scenario.
    #[error("scenario parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A step names an account that was never declared.
    #[error("unknown account label: {label}")]
    UnknownAccount {
        /// The undeclared label.
        label: String,
    },

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("token: {0}")]
    Token(#[from] TokenError),

    #[error("report encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
