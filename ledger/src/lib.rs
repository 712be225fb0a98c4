//! Settlement core of the quizmaster platform.
//!
//! Owns the SQLite-backed ledger (accounts, per-currency wallets, an
//! append-only transaction log) and the engines that move money through it:
//! peer transfers, game entry pools, daily bonuses, currency conversion, and
//! the admin surface. Every money-moving operation runs as one atomic unit
//! via [`Database::write`]; a failure anywhere in the unit rolls the whole
//! unit back.
//!
//! Operations take the current time as an explicit `now` argument (unix
//! seconds) so that behavior is reproducible in tests; nothing in this crate
//! reads the wall clock.

pub mod admin;
pub mod bonus;
pub mod config;
pub mod convert;
pub mod db;
pub mod error;
pub mod fraud;
pub mod game;
pub mod store;
pub mod transfer;

pub use config::LedgerConfig;
pub use db::Database;
pub use error::{LedgerError, Result};

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod bonus_tests;
#[cfg(test)]
mod settlement_tests;
#[cfg(test)]
mod store_tests;
