use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Amount, Currency};

/// Violation of a wallet balance invariant.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WalletInvariantError {
    #[error("{field} is negative ({value})")]
    NegativeComponent { field: &'static str, value: Amount },
    #[error("locked plus non-transferable ({held}) exceeds balance ({balance})")]
    Overdrawn { held: Amount, balance: Amount },
}

/// Snapshot of one per-user, per-currency wallet.
///
/// `balance` is the total held; `locked_balance` is escrowed for in-flight
/// games and pending withdrawals; `non_transferable_balance` is promotional
/// money that can be spent but not transferred or withdrawn. The spendable
/// remainder is [`Wallet::available_balance`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub currency: Currency,
    pub balance: Amount,
    pub locked_balance: Amount,
    pub non_transferable_balance: Amount,
}

impl Wallet {
    /// Balance available for transfers, withdrawals, and game entry.
    pub fn available_balance(&self) -> Amount {
        self.balance - self.locked_balance - self.non_transferable_balance
    }

    /// Checks that every component is non-negative and that held funds never
    /// exceed the total balance.
    pub fn validate_invariants(&self) -> Result<(), WalletInvariantError> {
        for (field, value) in [
            ("balance", self.balance),
            ("locked_balance", self.locked_balance),
            ("non_transferable_balance", self.non_transferable_balance),
        ] {
            if value < 0 {
                return Err(WalletInvariantError::NegativeComponent { field, value });
            }
        }
        let held = self.locked_balance + self.non_transferable_balance;
        if held > self.balance {
            return Err(WalletInvariantError::Overdrawn {
                held,
                balance: self.balance,
            });
        }
        Ok(())
    }
}

/// A platform account. Wallets hang off the account, one per currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub device_fingerprint: Option<String>,
    pub is_active: bool,
    pub vouchers: u32,
    pub created_at: u64,
}
