//! # autovault-types
//!
//! Shared domain types used across the autovault workspace.
//!
//! ## Modules
//!
//! - [`address`] — 20-byte account and token identifiers
//! - [`user`] — Per-depositor share record
//! - [`events`] — Vault notifications and fee kinds

pub mod address;
pub mod events;
pub mod user;

pub use address::{Address, AddressParseError};
pub use events::{FeeKind, VaultEvent};
pub use user::UserRecord;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Seconds in one hour.
pub const SECONDS_PER_HOUR: u64 = 3600;
