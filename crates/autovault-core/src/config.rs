//! Vault configuration.
//!
//! ```toml
//! [roles]
//! owner = "0x…"
//! admin = "0x…"
//! treasury = "0x…"
//!
//! [fees]                      # optional, defaults shown
//! performance_fee_bps = 200
//! call_fee_bps = 25
//! withdraw_fee_bps = 10
//! withdraw_fee_period_secs = 259200
//! ```

use std::path::Path;

use autovault_math::fees::{
    FeeSchedule, DEFAULT_CALL_FEE_BPS, DEFAULT_PERFORMANCE_FEE_BPS, DEFAULT_WITHDRAW_FEE_BPS,
    DEFAULT_WITHDRAW_FEE_PERIOD,
};
use autovault_math::FeeError;
use autovault_types::Address;
use serde::{Deserialize, Serialize};

use crate::access::Roles;
use crate::error::ValidationError;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid fees: {0}")]
    Fee(#[from] FeeError),

    #[error("invalid roles: {0}")]
    Roles(#[from] ValidationError),
}

/// Complete vault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Role holders.
    pub roles: RoleConfig,
    /// Initial fee schedule.
    #[serde(default)]
    pub fees: FeeConfig,
}

/// Initial role holders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    pub owner: Address,
    pub admin: Address,
    /// Fee recipient.
    pub treasury: Address,
}

/// Initial fee schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_performance_fee_bps")]
    pub performance_fee_bps: u64,
    #[serde(default = "default_call_fee_bps")]
    pub call_fee_bps: u64,
    #[serde(default = "default_withdraw_fee_bps")]
    pub withdraw_fee_bps: u64,
    #[serde(default = "default_withdraw_fee_period")]
    pub withdraw_fee_period_secs: u64,
}

// Default value functions

fn default_performance_fee_bps() -> u64 {
    DEFAULT_PERFORMANCE_FEE_BPS
}

fn default_call_fee_bps() -> u64 {
    DEFAULT_CALL_FEE_BPS
}

fn default_withdraw_fee_bps() -> u64 {
    DEFAULT_WITHDRAW_FEE_BPS
}

fn default_withdraw_fee_period() -> u64 {
    DEFAULT_WITHDRAW_FEE_PERIOD
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            performance_fee_bps: default_performance_fee_bps(),
            call_fee_bps: default_call_fee_bps(),
            withdraw_fee_bps: default_withdraw_fee_bps(),
            withdraw_fee_period_secs: default_withdraw_fee_period(),
        }
    }
}

impl FeeConfig {
    /// All fees zero.
    pub fn zero() -> Self {
        Self {
            performance_fee_bps: 0,
            call_fee_bps: 0,
            withdraw_fee_bps: 0,
            withdraw_fee_period_secs: 0,
        }
    }
}

impl VaultConfig {
    /// Configuration with the given roles and default fees.
    pub fn new(owner: Address, admin: Address, treasury: Address) -> Self {
        Self {
            roles: RoleConfig {
                owner,
                admin,
                treasury,
            },
            fees: FeeConfig::default(),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validated role holders.
    pub fn roles(&self) -> Result<Roles, ValidationError> {
        Roles::new(self.roles.owner, self.roles.admin, self.roles.treasury)
    }

    /// Validated fee schedule.
    pub fn fee_schedule(&self) -> Result<FeeSchedule, FeeError> {
        FeeSchedule::new(
            self.fees.performance_fee_bps,
            self.fees.call_fee_bps,
            self.fees.withdraw_fee_bps,
            self.fees.withdraw_fee_period_secs,
        )
    }

    /// Check every value without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.roles()?;
        self.fee_schedule()?;
        Ok(())
    }
}
