use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Aggregate risk of a fraud evaluation. Ordered so that escalation is
/// simply `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn escalate(self, other: RiskLevel) -> RiskLevel {
        self.max(other)
    }
}

/// Individual signals that can corroborate a fraud verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudFlag {
    SuspiciousDevice,
    SuspiciousIp,
    SuspiciousBehavior,
    RapidAccountCreation,
}

impl fmt::Display for FraudFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FraudFlag::SuspiciousDevice => "suspicious_device",
            FraudFlag::SuspiciousIp => "suspicious_ip",
            FraudFlag::SuspiciousBehavior => "suspicious_behavior",
            FraudFlag::RapidAccountCreation => "rapid_account_creation",
        };
        f.write_str(s)
    }
}

/// Outcome of a fraud evaluation. Blocking requires corroboration: high risk
/// alone is not enough, at least two independent flags must agree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudVerdict {
    pub risk: RiskLevel,
    pub flags: Vec<FraudFlag>,
    pub should_block: bool,
}

impl FraudVerdict {
    /// A verdict that lets the action proceed with no signals raised.
    pub fn clear() -> Self {
        Self {
            risk: RiskLevel::Low,
            flags: Vec::new(),
            should_block: false,
        }
    }

    pub fn allowed(&self) -> bool {
        !self.should_block
    }
}

/// Why a transfer was held for review instead of settling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SuspicionReason {
    /// Sender and recipient registered with the same device fingerprint.
    SharedDevice,
    /// Too many transfers between the same pair of users within one hour.
    RapidPairTransfers { count: u32 },
    /// Amount above the large-transfer threshold.
    LargeAmount { amount: Amount },
}

impl fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspicionReason::SharedDevice => f.write_str("shared device fingerprint"),
            SuspicionReason::RapidPairTransfers { count } => {
                write!(f, "{count} transfers between pair in the last hour")
            }
            SuspicionReason::LargeAmount { amount } => {
                write!(f, "large amount ({amount} cents)")
            }
        }
    }
}

/// Sticky per-device registration counter. Once `flagged` is set it never
/// clears, even if the count stops growing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlag {
    pub device_fingerprint: String,
    pub user_count: u32,
    pub flagged: bool,
    pub last_flagged_at: Option<u64>,
}
