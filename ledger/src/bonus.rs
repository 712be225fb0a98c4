//! Daily bonus issuance.
//!
//! One successful claim per user per UTC calendar day, idempotency checked
//! across all of the user's wallets. The grant depends on how many days have
//! passed since registration; from day 4 onward a streak of consecutive
//! claim days in the last week raises the base amount.

use rusqlite::{params, Transaction};
use serde::Serialize;
use tracing::debug;

use quizmaster_types::constants::{
    BONUS_DAY0_AOA, BONUS_DAY1_VOUCHERS, BONUS_DAY2_USD, BONUS_DAY3_AOA, BONUS_DAY3_USD,
    BONUS_REGULAR_BASE, BONUS_STREAK_STEP, BONUS_STREAK_WINDOW_DAYS, SECONDS_PER_DAY,
};
use quizmaster_types::{Amount, BonusKind, Currency, EntryMeta, EntryStatus, EntryType};

use crate::config::LedgerConfig;
use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::store;

/// What a daily claim granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BonusGrant {
    /// Days since registration at claim time.
    pub day_index: u32,
    pub bonus: BonusKind,
    pub aoa: Amount,
    pub usd: Amount,
    pub vouchers: u32,
    /// Consecutive claim days counted toward the streak amount.
    pub streak_days: u32,
}

/// Claims the daily bonus for `user`. Fails with
/// [`LedgerError::AlreadyClaimed`] on a repeat claim the same day.
pub fn claim_daily(
    db: &Database,
    config: &LedgerConfig,
    user: &str,
    now: u64,
) -> Result<BonusGrant> {
    db.write(|tx| {
        let account = store::account(tx, user)?;
        let today = now / SECONDS_PER_DAY;
        let claimed_today: u32 = tx.query_row(
            "SELECT COUNT(*) FROM transactions t JOIN wallets w ON t.wallet_id = w.id
             WHERE w.user_id = ?1 AND t.tx_type = 'bonus' AND t.created_at / 86400 = ?2",
            params![user, today],
            |row| row.get(0),
        )?;
        if claimed_today > 0 {
            return Err(LedgerError::AlreadyClaimed);
        }

        let day_index = (now.saturating_sub(account.created_at) / SECONDS_PER_DAY) as u32;
        let grant = match day_index {
            0 => {
                grant_aoa(tx, user, BONUS_DAY0_AOA, day_index, BonusKind::Welcome, now)?;
                BonusGrant {
                    day_index,
                    bonus: BonusKind::Welcome,
                    aoa: BONUS_DAY0_AOA,
                    usd: 0,
                    vouchers: 0,
                    streak_days: 0,
                }
            }
            1 => {
                tx.execute(
                    "UPDATE accounts SET vouchers = vouchers + ?1 WHERE user_id = ?2",
                    params![BONUS_DAY1_VOUCHERS, user],
                )?;
                // Zero-amount entry so the calendar-day idempotency key holds
                // even though no balance moves.
                grant_aoa(tx, user, 0, day_index, BonusKind::Vouchers, now)?;
                BonusGrant {
                    day_index,
                    bonus: BonusKind::Vouchers,
                    aoa: 0,
                    usd: 0,
                    vouchers: BONUS_DAY1_VOUCHERS,
                    streak_days: 0,
                }
            }
            2 => {
                grant_usd_non_transferable(tx, user, BONUS_DAY2_USD, day_index, now)?;
                BonusGrant {
                    day_index,
                    bonus: BonusKind::SecondaryCurrency,
                    aoa: 0,
                    usd: BONUS_DAY2_USD,
                    vouchers: 0,
                    streak_days: 0,
                }
            }
            3 => {
                grant_aoa(tx, user, BONUS_DAY3_AOA, day_index, BonusKind::Mixed, now)?;
                grant_usd_non_transferable(tx, user, BONUS_DAY3_USD, day_index, now)?;
                BonusGrant {
                    day_index,
                    bonus: BonusKind::Mixed,
                    aoa: BONUS_DAY3_AOA,
                    usd: BONUS_DAY3_USD,
                    vouchers: 0,
                    streak_days: 0,
                }
            }
            _ => {
                let streak = streak_days(tx, user, now)?.min(config.bonus_streak_cap_days());
                let amount = BONUS_REGULAR_BASE + Amount::from(streak) * BONUS_STREAK_STEP;
                grant_aoa(tx, user, amount, day_index, BonusKind::Streak, now)?;
                BonusGrant {
                    day_index,
                    bonus: BonusKind::Streak,
                    aoa: amount,
                    usd: 0,
                    vouchers: 0,
                    streak_days: streak,
                }
            }
        };
        debug!(user, day = grant.day_index, "daily bonus granted");
        Ok(grant)
    })
}

fn grant_aoa(
    tx: &Transaction<'_>,
    user: &str,
    amount: Amount,
    day: u32,
    bonus: BonusKind,
    now: u64,
) -> Result<()> {
    let wallet = if amount > 0 {
        store::adjust_balance(tx, user, Currency::Aoa, amount, 0, 0)?
    } else {
        store::wallet(tx, user, Currency::Aoa)?
    };
    store::append_entry(
        tx,
        wallet.id,
        EntryType::Bonus,
        amount,
        Currency::Aoa,
        EntryStatus::Completed,
        &EntryMeta::Bonus { day, bonus },
        now,
    )?;
    Ok(())
}

/// USD bonus money is spendable but not transferable: the grant raises both
/// `balance` and `non_transferable_balance`, leaving available unchanged.
fn grant_usd_non_transferable(
    tx: &Transaction<'_>,
    user: &str,
    amount: Amount,
    day: u32,
    now: u64,
) -> Result<()> {
    let wallet = store::adjust_balance(tx, user, Currency::Usd, amount, 0, amount)?;
    store::append_entry(
        tx,
        wallet.id,
        EntryType::Bonus,
        amount,
        Currency::Usd,
        EntryStatus::Completed,
        &EntryMeta::Bonus {
            day,
            bonus: if day == 2 {
                BonusKind::SecondaryCurrency
            } else {
                BonusKind::Mixed
            },
        },
        now,
    )?;
    Ok(())
}

/// Distinct calendar days with a bonus claim in the trailing week.
fn streak_days(tx: &Transaction<'_>, user: &str, now: u64) -> Result<u32> {
    let since = now.saturating_sub(BONUS_STREAK_WINDOW_DAYS * SECONDS_PER_DAY);
    Ok(tx.query_row(
        "SELECT COUNT(DISTINCT t.created_at / 86400)
         FROM transactions t JOIN wallets w ON t.wallet_id = w.id
         WHERE w.user_id = ?1 AND t.tx_type = 'bonus' AND t.created_at >= ?2",
        params![user, since],
        |row| row.get(0),
    )?)
}
