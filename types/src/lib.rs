//! Domain types shared across the quizmaster ledger.
//!
//! Everything in this crate is pure data: wallets, ledger entries, transfers,
//! games, and fraud verdicts, plus the constants that govern them. Storage and
//! settlement logic live in `quizmaster-ledger`.

pub mod constants;

mod currency;
mod fraud;
mod game;
mod transaction;
mod transfer;
mod wallet;

pub use currency::*;
pub use fraud::*;
pub use game::*;
pub use transaction::*;
pub use transfer::*;
pub use wallet::*;

/// Monetary amount in integer cents. Two decimal places, no floats.
pub type Amount = i64;
