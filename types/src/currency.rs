use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a persisted enum tag no longer parses.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unrecognized {what}: {value}")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

/// Currencies supported by the platform. AOA is the primary currency; USD is
/// the secondary one used for premium bonuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Aoa,
    Usd,
}

impl Currency {
    /// Every supported currency, in the order wallets are provisioned.
    pub const ALL: [Currency; 2] = [Currency::Aoa, Currency::Usd];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Aoa => "AOA",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AOA" => Ok(Currency::Aoa),
            "USD" => Ok(Currency::Usd),
            other => Err(ParseEnumError::new("currency", other)),
        }
    }
}
