use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Amount, Currency, ParseEnumError, SuspicionReason};

/// Status of a peer transfer. `Flagged` transfers moved no money and await
/// manual review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Completed,
    Flagged,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Completed => "completed",
            TransferStatus::Flagged => "flagged",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransferStatus::Completed),
            "flagged" => Ok(TransferStatus::Flagged),
            other => Err(ParseEnumError::new("transfer status", other)),
        }
    }
}

/// One peer-to-peer transfer record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub from_user: String,
    pub to_user: String,
    pub amount: Amount,
    pub fee: Amount,
    pub currency: Currency,
    pub message: Option<String>,
    pub status: TransferStatus,
    pub suspicion: Option<SuspicionReason>,
    pub created_at: u64,
}
