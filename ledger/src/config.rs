use serde::Serialize;

use quizmaster_types::constants::{
    DEFAULT_BONUS_STREAK_CAP_DAYS, DEFAULT_DAILY_TRANSFER_LIMIT, DEFAULT_LARGE_TRANSFER_THRESHOLD,
    DEFAULT_MAX_PLAYERS, DEFAULT_MIN_TRANSFER_AMOUNT, DEFAULT_PAIR_TRANSFER_HOURLY_LIMIT,
    DEFAULT_TRANSFER_FEE,
};
use quizmaster_types::Amount;

/// Tunable settlement parameters.
///
/// Every field is optional; unset fields fall back to the platform defaults
/// through the accessor methods. Construct with struct update syntax:
///
/// ```
/// use quizmaster_ledger::LedgerConfig;
///
/// let config = LedgerConfig {
///     transfer_fee: Some(0),
///     ..LedgerConfig::default()
/// };
/// assert_eq!(config.transfer_fee(), 0);
/// ```
#[derive(Clone, Debug, Default, Serialize)]
pub struct LedgerConfig {
    /// Flat fee destroyed on every completed transfer.
    pub transfer_fee: Option<Amount>,
    /// Smallest transferable amount.
    pub min_transfer_amount: Option<Amount>,
    /// Cap on a sender's completed transfers (amount plus fee) per UTC day.
    pub daily_transfer_limit: Option<Amount>,
    /// Transfers strictly above this amount are held as suspicious.
    pub large_transfer_threshold: Option<Amount>,
    /// Transfers between one pair of users per hour before suspicion.
    pub pair_transfer_hourly_limit: Option<u32>,
    /// Player capacity for games that do not specify one.
    pub default_max_players: Option<u32>,
    /// Streak days counted toward the recurring daily bonus.
    pub bonus_streak_cap_days: Option<u32>,
}

impl LedgerConfig {
    pub fn transfer_fee(&self) -> Amount {
        self.transfer_fee.unwrap_or(DEFAULT_TRANSFER_FEE)
    }

    pub fn min_transfer_amount(&self) -> Amount {
        self.min_transfer_amount.unwrap_or(DEFAULT_MIN_TRANSFER_AMOUNT)
    }

    pub fn daily_transfer_limit(&self) -> Amount {
        self.daily_transfer_limit
            .unwrap_or(DEFAULT_DAILY_TRANSFER_LIMIT)
    }

    pub fn large_transfer_threshold(&self) -> Amount {
        self.large_transfer_threshold
            .unwrap_or(DEFAULT_LARGE_TRANSFER_THRESHOLD)
    }

    pub fn pair_transfer_hourly_limit(&self) -> u32 {
        self.pair_transfer_hourly_limit
            .unwrap_or(DEFAULT_PAIR_TRANSFER_HOURLY_LIMIT)
    }

    pub fn default_max_players(&self) -> u32 {
        self.default_max_players.unwrap_or(DEFAULT_MAX_PLAYERS)
    }

    pub fn bonus_streak_cap_days(&self) -> u32 {
        self.bonus_streak_cap_days
            .unwrap_or(DEFAULT_BONUS_STREAK_CAP_DAYS)
    }
}
