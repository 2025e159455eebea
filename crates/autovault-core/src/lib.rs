//! # autovault-core
//!
//! Share-based auto-compounding vault.
//!
//! Depositors hand the vault a single fungible asset and receive shares. The
//! vault stakes everything it holds into an external yield source; harvesting
//! claims the accrued reward, takes the performance and call fees, and
//! restakes the rest, which raises the value of every share at once.
//!
//! ## Modules
//!
//! - [`vault`] — The controller: deposit, withdraw, harvest, admin surface
//! - [`ledger`] — Per-depositor share balances and `total_shares`
//! - [`access`] — Owner/admin role guard
//! - [`collaborators`] — Traits for the asset token and the yield source
//! - [`observer`] — Event delivery after each committed change
//! - [`config`] — TOML vault configuration
//! - [`error`] — Validation / authorization / state error taxonomy

pub mod access;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod ledger;
pub mod observer;
pub mod vault;

pub use access::{Capability, Role, Roles};
pub use collaborators::{AssetToken, TokenError, YieldSource, YieldSourceError};
pub use config::{ConfigError, FeeConfig, RoleConfig, VaultConfig};
pub use error::{
    AuthorizationError, ErrorCategory, RestrictedToken, StateError, ValidationError, VaultError,
};
pub use ledger::{LedgerError, ShareLedger};
pub use observer::{EventLog, VaultObserver};
pub use vault::{HarvestReport, Vault, WithdrawReceipt};

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
