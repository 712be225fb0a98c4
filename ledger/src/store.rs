//! Ledger primitives: accounts, wallets, and the append-only transaction log.
//!
//! Functions that move money take the open [`Transaction`] handle so the
//! caller decides the unit boundary; read helpers take any [`Connection`]
//! (a `Transaction` derefs to one).

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::warn;

use quizmaster_types::constants::DEVICE_FLAG_THRESHOLD;
use quizmaster_types::{
    Account, Amount, Currency, EntryMeta, EntryStatus, EntryType, LedgerEntry, Wallet,
};

use crate::db::Database;
use crate::error::{LedgerError, Result};

/// Parses a TEXT column persisted from one of the domain enums.
pub(crate) fn parse_text<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn parse_meta(idx: usize, value: String) -> rusqlite::Result<EntryMeta> {
    serde_json::from_str(&value)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn read_wallet(row: &Row<'_>) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        currency: parse_text(2, row.get(2)?)?,
        balance: row.get(3)?,
        locked_balance: row.get(4)?,
        non_transferable_balance: row.get(5)?,
    })
}

fn read_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        entry_type: parse_text(2, row.get(2)?)?,
        amount: row.get(3)?,
        currency: parse_text(4, row.get(4)?)?,
        status: parse_text(5, row.get(5)?)?,
        meta: parse_meta(6, row.get(6)?)?,
        created_at: row.get(7)?,
    })
}

const WALLET_COLUMNS: &str =
    "id, user_id, currency, balance, locked_balance, non_transferable_balance";

const ENTRY_COLUMNS: &str = "id, wallet_id, tx_type, amount, currency, status, meta, created_at";

/// Fetches one wallet, failing if the user has none in that currency.
pub fn wallet(conn: &Connection, user: &str, currency: Currency) -> Result<Wallet> {
    let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ?1 AND currency = ?2");
    conn.query_row(&sql, params![user, currency.code()], read_wallet)
        .optional()?
        .ok_or_else(|| LedgerError::WalletNotFound {
            user: user.to_string(),
            currency,
        })
}

pub fn wallet_by_id(conn: &Connection, wallet_id: i64) -> Result<Wallet> {
    let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ?1");
    Ok(conn.query_row(&sql, params![wallet_id], read_wallet)?)
}

/// All of a user's wallets, in a stable currency order.
pub fn wallets(conn: &Connection, user: &str) -> Result<Vec<Wallet>> {
    let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ?1 ORDER BY currency");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], read_wallet)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn account(conn: &Connection, user: &str) -> Result<Account> {
    conn.query_row(
        "SELECT user_id, device_fingerprint, is_active, vouchers, created_at
         FROM accounts WHERE user_id = ?1",
        params![user],
        |row| {
            Ok(Account {
                user_id: row.get(0)?,
                device_fingerprint: row.get(1)?,
                is_active: row.get(2)?,
                vouchers: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::AccountNotFound(user.to_string()))
}

/// Applies deltas to one wallet's balance components.
///
/// Fails with [`LedgerError::InsufficientFunds`] if any component or the
/// derived available balance would go negative; the check runs against the
/// row as seen inside the caller's transaction.
pub fn adjust_balance(
    tx: &Transaction<'_>,
    user: &str,
    currency: Currency,
    delta_balance: Amount,
    delta_locked: Amount,
    delta_non_transferable: Amount,
) -> Result<Wallet> {
    let before = wallet(tx, user, currency)?;
    let after = Wallet {
        balance: before.balance + delta_balance,
        locked_balance: before.locked_balance + delta_locked,
        non_transferable_balance: before.non_transferable_balance + delta_non_transferable,
        ..before.clone()
    };
    if after.validate_invariants().is_err() {
        return Err(LedgerError::InsufficientFunds {
            user: user.to_string(),
            currency,
            available: before.available_balance(),
            required: before.available_balance() - after.available_balance(),
        });
    }
    tx.execute(
        "UPDATE wallets
         SET balance = ?1, locked_balance = ?2, non_transferable_balance = ?3
         WHERE id = ?4",
        params![
            after.balance,
            after.locked_balance,
            after.non_transferable_balance,
            after.id
        ],
    )?;
    Ok(after)
}

/// Appends one immutable row to the transaction log and returns its id.
pub fn append_entry(
    tx: &Transaction<'_>,
    wallet_id: i64,
    entry_type: EntryType,
    amount: Amount,
    currency: Currency,
    status: EntryStatus,
    meta: &EntryMeta,
    now: u64,
) -> Result<i64> {
    tx.execute(
        "INSERT INTO transactions (wallet_id, tx_type, amount, currency, status, meta, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            wallet_id,
            entry_type.as_str(),
            amount,
            currency.code(),
            status.as_str(),
            serde_json::to_string(meta)?,
            now
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

pub fn entry(conn: &Connection, entry_id: i64) -> Result<LedgerEntry> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM transactions WHERE id = ?1");
    Ok(conn.query_row(&sql, params![entry_id], read_entry)?)
}

/// A user's transaction history across all wallets, newest first.
pub fn entries_for_user(conn: &Connection, user: &str, limit: u32) -> Result<Vec<LedgerEntry>> {
    let sql =
        "SELECT t.id, t.wallet_id, t.tx_type, t.amount, t.currency, t.status, t.meta, t.created_at
         FROM transactions t JOIN wallets w ON t.wallet_id = w.id
         WHERE w.user_id = ?1
         ORDER BY t.created_at DESC, t.id DESC
         LIMIT ?2";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![user, limit], read_entry)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn log_ip(
    tx: &Transaction<'_>,
    user: Option<&str>,
    ip: &str,
    action: &str,
    now: u64,
) -> Result<()> {
    tx.execute(
        "INSERT INTO ip_logs (user_id, ip_address, action, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user, ip, action, now],
    )?;
    Ok(())
}

pub fn audit(
    tx: &Transaction<'_>,
    user: Option<&str>,
    admin: Option<&str>,
    action: &str,
    details: &serde_json::Value,
    now: u64,
) -> Result<()> {
    tx.execute(
        "INSERT INTO audit_logs (user_id, admin_id, action, details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user, admin, action, details.to_string(), now],
    )?;
    Ok(())
}

/// Creates an account with one zero wallet per supported currency, counts the
/// registration against the device fingerprint (flagging it stickily at the
/// threshold), and records the registration IP. One atomic unit.
pub fn create_account(
    db: &Database,
    user_id: &str,
    device_fingerprint: Option<&str>,
    ip: Option<&str>,
    now: u64,
) -> Result<Account> {
    db.write(|tx| {
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM accounts WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(LedgerError::AccountExists(user_id.to_string()));
        }
        tx.execute(
            "INSERT INTO accounts (user_id, device_fingerprint, is_active, vouchers, created_at)
             VALUES (?1, ?2, 1, 0, ?3)",
            params![user_id, device_fingerprint, now],
        )?;
        for currency in Currency::ALL {
            tx.execute(
                "INSERT INTO wallets (user_id, currency) VALUES (?1, ?2)",
                params![user_id, currency.code()],
            )?;
        }
        if let Some(fingerprint) = device_fingerprint {
            tx.execute(
                "INSERT INTO device_flags (device_fingerprint, user_count) VALUES (?1, 1)
                 ON CONFLICT (device_fingerprint) DO UPDATE SET user_count = user_count + 1",
                params![fingerprint],
            )?;
            let (count, flagged): (u32, bool) = tx.query_row(
                "SELECT user_count, flagged FROM device_flags WHERE device_fingerprint = ?1",
                params![fingerprint],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            if count >= DEVICE_FLAG_THRESHOLD && !flagged {
                tx.execute(
                    "UPDATE device_flags SET flagged = 1, last_flagged_at = ?1
                     WHERE device_fingerprint = ?2",
                    params![now, fingerprint],
                )?;
                warn!(fingerprint, count, "device fingerprint flagged at registration");
            }
        }
        if let Some(ip) = ip {
            log_ip(tx, Some(user_id), ip, "register", now)?;
        }
        account(tx, user_id)
    })
}

/// Credits a wallet with external money and logs a completed deposit entry.
pub fn deposit(
    db: &Database,
    user: &str,
    currency: Currency,
    amount: Amount,
    reference: Option<&str>,
    now: u64,
) -> Result<i64> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    db.write(|tx| {
        let wallet = adjust_balance(tx, user, currency, amount, 0, 0)?;
        append_entry(
            tx,
            wallet.id,
            EntryType::Deposit,
            amount,
            currency,
            EntryStatus::Completed,
            &EntryMeta::Deposit {
                reference: reference.map(str::to_string),
            },
            now,
        )
    })
}

/// Escrows `amount` into `locked_balance` and logs a pending withdrawal
/// entry awaiting admin resolution.
pub fn request_withdrawal(
    db: &Database,
    user: &str,
    currency: Currency,
    amount: Amount,
    iban: Option<&str>,
    now: u64,
) -> Result<i64> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    db.write(|tx| {
        let wallet = adjust_balance(tx, user, currency, 0, amount, 0)?;
        append_entry(
            tx,
            wallet.id,
            EntryType::Withdrawal,
            amount,
            currency,
            EntryStatus::Pending,
            &EntryMeta::Withdrawal {
                iban: iban.map(str::to_string),
                resolution: None,
            },
            now,
        )
    })
}
