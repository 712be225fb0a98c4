//! Platform constants. All monetary values are integer cents.

use crate::Amount;

/// Cents per whole currency unit.
pub const CENTS_PER_UNIT: Amount = 100;

/// Seconds in one hour.
pub const SECONDS_PER_HOUR: u64 = 3_600;

/// Seconds in one UTC calendar day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Smallest transferable amount (1.00).
pub const DEFAULT_MIN_TRANSFER_AMOUNT: Amount = 100;

/// Flat fee charged on every peer transfer (2.00). The fee is destroyed, not
/// credited to any wallet.
pub const DEFAULT_TRANSFER_FEE: Amount = 200;

/// Daily cap on a sender's completed transfers, amount plus fee (1000.00).
pub const DEFAULT_DAILY_TRANSFER_LIMIT: Amount = 100_000;

/// Transfers strictly above this amount are flagged as suspicious (1000.00).
pub const DEFAULT_LARGE_TRANSFER_THRESHOLD: Amount = 100_000;

/// More than this many transfers between the same pair of users within one
/// hour, in either direction, marks a transfer suspicious.
pub const DEFAULT_PAIR_TRANSFER_HOURLY_LIMIT: u32 = 3;

/// A device fingerprint registered by more than this many accounts is a
/// high-risk fraud signal.
pub const DEVICE_USER_COUNT_SUSPICIOUS: u32 = 3;

/// Registrations at which a device fingerprint is stickily flagged. The flag
/// never clears on its own.
pub const DEVICE_FLAG_THRESHOLD: u32 = 3;

/// More than this many distinct users seen from one IP in 24 hours is a
/// medium-risk fraud signal.
pub const IP_DISTINCT_USERS_SUSPICIOUS: u32 = 5;

/// More than this many logged actions in the last hour is a high-risk
/// behavior signal.
pub const BEHAVIOR_ACTIONS_PER_HOUR: u32 = 30;

/// More than this many failed logins in the last hour is a high-risk
/// behavior signal.
pub const BEHAVIOR_FAILED_LOGINS_PER_HOUR: u32 = 5;

/// More than this many accounts created from one IP in 24 hours is a
/// high-risk creation signal.
pub const RAPID_ACCOUNTS_PER_IP_24H: u32 = 3;

/// More than this many accounts created on one device in 24 hours is a
/// high-risk creation signal.
pub const RAPID_ACCOUNTS_PER_DEVICE_24H: u32 = 2;

/// Default player capacity of a game.
pub const DEFAULT_MAX_PLAYERS: u32 = 10;

/// Prize split for the top three finishers, in basis points of the pool.
pub const PRIZE_SPLIT_BPS: [i64; 3] = [7_000, 2_000, 1_000];

/// Basis-point denominator.
pub const BPS_DENOMINATOR: i64 = 10_000;

/// Day-0 welcome bonus (5.00 AOA).
pub const BONUS_DAY0_AOA: Amount = 500;

/// Day-1 bonus: free game-entry vouchers.
pub const BONUS_DAY1_VOUCHERS: u32 = 2;

/// Day-2 bonus (5.00 USD, non-transferable).
pub const BONUS_DAY2_USD: Amount = 500;

/// Day-3 mixed bonus, AOA leg (7.00 AOA).
pub const BONUS_DAY3_AOA: Amount = 700;

/// Day-3 mixed bonus, USD leg (1.00 USD, non-transferable).
pub const BONUS_DAY3_USD: Amount = 100;

/// Base daily bonus from day 4 onward (2.00 AOA).
pub const BONUS_REGULAR_BASE: Amount = 200;

/// Streak increment per consecutive claim day (1.00 AOA).
pub const BONUS_STREAK_STEP: Amount = 100;

/// Streak days counted toward the bonus are capped here.
pub const DEFAULT_BONUS_STREAK_CAP_DAYS: u32 = 5;

/// Window over which consecutive claim days are counted.
pub const BONUS_STREAK_WINDOW_DAYS: u64 = 7;

/// Fixed-point scale for conversion rates.
pub const RATE_SCALE: i64 = 1_000_000;

/// AOA to USD conversion rate in micro-units (0.0011).
pub const AOA_TO_USD_RATE_MICROS: i64 = 1_100;

/// USD to AOA conversion rate in micro-units (909.09).
pub const USD_TO_AOA_RATE_MICROS: i64 = 909_090_000;
