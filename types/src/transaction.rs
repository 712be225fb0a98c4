use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Amount, Currency, ParseEnumError};

/// Kind of a ledger entry. One row in the append-only transaction log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    EntryFee,
    Prize,
    Bonus,
    ConversionIn,
    ConversionOut,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Deposit => "deposit",
            EntryType::Withdrawal => "withdrawal",
            EntryType::TransferIn => "transfer_in",
            EntryType::TransferOut => "transfer_out",
            EntryType::EntryFee => "entry_fee",
            EntryType::Prize => "prize",
            EntryType::Bonus => "bonus",
            EntryType::ConversionIn => "conversion_in",
            EntryType::ConversionOut => "conversion_out",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(EntryType::Deposit),
            "withdrawal" => Ok(EntryType::Withdrawal),
            "transfer_in" => Ok(EntryType::TransferIn),
            "transfer_out" => Ok(EntryType::TransferOut),
            "entry_fee" => Ok(EntryType::EntryFee),
            "prize" => Ok(EntryType::Prize),
            "bonus" => Ok(EntryType::Bonus),
            "conversion_in" => Ok(EntryType::ConversionIn),
            "conversion_out" => Ok(EntryType::ConversionOut),
            other => Err(ParseEnumError::new("entry type", other)),
        }
    }
}

/// Lifecycle status of a ledger entry. Entries are immutable once written;
/// the only sanctioned status change is admin resolution of a pending
/// withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Completed,
    Rejected,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Completed => "completed",
            EntryStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntryStatus::Pending),
            "completed" => Ok(EntryStatus::Completed),
            "rejected" => Ok(EntryStatus::Rejected),
            other => Err(ParseEnumError::new("entry status", other)),
        }
    }
}

/// Kind of daily bonus granted, by schedule position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    Welcome,
    Vouchers,
    SecondaryCurrency,
    Mixed,
    Streak,
}

/// Admin resolution stamped onto a withdrawal entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResolution {
    pub resolved_by: String,
    pub resolved_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Structured metadata attached to a ledger entry, tagged by entry kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryMeta {
    None,
    Deposit {
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    Withdrawal {
        #[serde(skip_serializing_if = "Option::is_none")]
        iban: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        resolution: Option<WithdrawalResolution>,
    },
    TransferOut {
        transfer_id: i64,
        to_user: String,
    },
    TransferIn {
        transfer_id: i64,
        from_user: String,
    },
    EntryFee {
        game_id: i64,
    },
    Prize {
        game_id: i64,
        position: u32,
    },
    Bonus {
        day: u32,
        bonus: BonusKind,
    },
    Conversion {
        counterpart: Currency,
        rate_micros: i64,
    },
}

/// One immutable row of the transaction log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub wallet_id: i64,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub currency: Currency,
    pub status: EntryStatus,
    pub meta: EntryMeta,
    pub created_at: u64,
}
