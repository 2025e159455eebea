//! # autovault-math
//!
//! Share pricing and fee policy for the vault.
//!
//! Everything here is pure: callers pass in the current managed balance and
//! share supply, and get back share or asset amounts. Nothing is cached.
//!
//! ## Modules
//!
//! - [`pricing`] — Share/asset conversion and price per full share
//! - [`fees`] — Performance, call and withdrawal fees with their ceilings

pub mod fees;
pub mod pricing;

use autovault_types::FeeKind;

/// Arithmetic failures in share and fee computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// Result does not fit in 128 bits.
    #[error("arithmetic overflow")]
    Overflow,

    /// Division by a zero denominator.
    #[error("division by zero")]
    DivisionByZero,

    /// Shares are outstanding but the pool holds no assets to price them.
    #[error("pool has {total_shares} shares outstanding but no managed balance")]
    EmptyPool {
        /// Outstanding share supply.
        total_shares: u128,
    },
}

/// Fee configuration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    /// A fee rate above its ceiling was requested.
    #[error("{kind} fee cannot be more than {max} bps, got {value}")]
    AboveMaximum {
        /// Which fee.
        kind: FeeKind,
        /// Requested rate in basis points.
        value: u64,
        /// Ceiling in basis points.
        max: u64,
    },

    /// A withdrawal fee window above its ceiling was requested.
    #[error("withdraw fee period cannot be more than {max}s, got {value}s")]
    PeriodAboveMaximum {
        /// Requested window in seconds.
        value: u64,
        /// Ceiling in seconds.
        max: u64,
    },

    /// Fee arithmetic failed.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for math operations.
pub type Result<T> = std::result::Result<T, MathError>;
