//! Integration test crate for the vault.
//!
//! This crate has no library code. Its tests drive a vault end to end over
//! the simulated token ledger and staking pool from `autovault-sim`.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p autovault-integration-tests
//! ```
