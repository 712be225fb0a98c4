//! Peer-to-peer transfer settlement.
//!
//! A suspicious transfer is not rejected up front: it is persisted with
//! status `flagged`, moves no money, and is surfaced to the caller as
//! [`LedgerError::TransferFlagged`] after the unit commits. The flat fee on
//! completed transfers is destroyed, not credited anywhere.

use rusqlite::{params, Connection, Row};
use tracing::warn;

use quizmaster_types::constants::SECONDS_PER_DAY;
use quizmaster_types::{
    Amount, Currency, EntryMeta, EntryStatus, EntryType, Transfer, TransferStatus,
};

use crate::config::LedgerConfig;
use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::fraud::FraudEvaluator;
use crate::store;

pub struct TransferRequest<'a> {
    pub from_user: &'a str,
    pub to_user: &'a str,
    pub amount: Amount,
    pub currency: Currency,
    pub message: Option<&'a str>,
    pub now: u64,
}

fn read_transfer(row: &Row<'_>) -> rusqlite::Result<Transfer> {
    let suspicion: Option<String> = row.get(8)?;
    Ok(Transfer {
        id: row.get(0)?,
        from_user: row.get(1)?,
        to_user: row.get(2)?,
        amount: row.get(3)?,
        fee: row.get(4)?,
        currency: store::parse_text(5, row.get(5)?)?,
        message: row.get(6)?,
        status: store::parse_text(7, row.get(7)?)?,
        suspicion: match suspicion {
            Some(json) => Some(serde_json::from_str(&json).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })?),
            None => None,
        },
        created_at: row.get(9)?,
    })
}

const TRANSFER_COLUMNS: &str =
    "id, from_user, to_user, amount, fee, currency, message, status, suspicion, created_at";

/// Settles one peer transfer.
///
/// Preconditions (distinct users, minimum amount, daily limit, sufficient
/// available balance) are validated before any write; the balance check is
/// repeated under the write transaction so a concurrent debit cannot slip
/// through.
pub fn transfer(db: &Database, config: &LedgerConfig, req: &TransferRequest<'_>) -> Result<Transfer> {
    if req.from_user == req.to_user {
        return Err(LedgerError::SelfTransfer);
    }
    if req.amount < config.min_transfer_amount() {
        return Err(LedgerError::InvalidAmount(req.amount));
    }
    let fee = config.transfer_fee();
    let total = req.amount + fee;

    let suspicion =
        FraudEvaluator::new(db, config).transfer_suspicion(req.from_user, req.to_user, req.amount, req.now);

    let transfer = db.write(|tx| {
        let today = req.now / SECONDS_PER_DAY;
        let spent_today: Amount = tx.query_row(
            "SELECT COALESCE(SUM(amount + fee), 0) FROM transfers
             WHERE from_user = ?1 AND currency = ?2 AND status = 'completed'
             AND created_at / 86400 = ?3",
            params![req.from_user, req.currency.code(), today],
            |row| row.get(0),
        )?;
        if spent_today + total > config.daily_transfer_limit() {
            return Err(LedgerError::DailyLimitExceeded {
                limit: config.daily_transfer_limit(),
                attempted: spent_today + total,
            });
        }

        // Both wallets must exist; fetch in ascending user-id order so any
        // row-locking backend sees one lock order.
        let (sender, recipient) = if req.from_user <= req.to_user {
            let sender = store::wallet(tx, req.from_user, req.currency)?;
            let recipient = store::wallet(tx, req.to_user, req.currency)?;
            (sender, recipient)
        } else {
            let recipient = store::wallet(tx, req.to_user, req.currency)?;
            let sender = store::wallet(tx, req.from_user, req.currency)?;
            (sender, recipient)
        };

        if sender.available_balance() < total {
            return Err(LedgerError::InsufficientFunds {
                user: req.from_user.to_string(),
                currency: req.currency,
                available: sender.available_balance(),
                required: total,
            });
        }

        let status = match suspicion {
            Some(_) => TransferStatus::Flagged,
            None => TransferStatus::Completed,
        };
        let suspicion_json = match &suspicion {
            Some(reason) => Some(serde_json::to_string(reason)?),
            None => None,
        };
        tx.execute(
            "INSERT INTO transfers
             (from_user, to_user, amount, fee, currency, message, status, suspicion, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                req.from_user,
                req.to_user,
                req.amount,
                fee,
                req.currency.code(),
                req.message,
                status.as_str(),
                suspicion_json,
                req.now
            ],
        )?;
        let transfer_id = tx.last_insert_rowid();

        if status == TransferStatus::Flagged {
            // No balance movement for a flagged transfer.
            store::audit(
                tx,
                Some(req.from_user),
                None,
                "transfer_flagged",
                &serde_json::json!({
                    "transfer_id": transfer_id,
                    "to_user": req.to_user,
                    "amount": req.amount,
                    "suspicion": &suspicion,
                }),
                req.now,
            )?;
        } else {
            store::adjust_balance(tx, req.from_user, req.currency, -total, 0, 0)?;
            store::append_entry(
                tx,
                sender.id,
                EntryType::TransferOut,
                total,
                req.currency,
                EntryStatus::Completed,
                &EntryMeta::TransferOut {
                    transfer_id,
                    to_user: req.to_user.to_string(),
                },
                req.now,
            )?;
            store::adjust_balance(tx, req.to_user, req.currency, req.amount, 0, 0)?;
            store::append_entry(
                tx,
                recipient.id,
                EntryType::TransferIn,
                req.amount,
                req.currency,
                EntryStatus::Completed,
                &EntryMeta::TransferIn {
                    transfer_id,
                    from_user: req.from_user.to_string(),
                },
                req.now,
            )?;
        }

        Ok(Transfer {
            id: transfer_id,
            from_user: req.from_user.to_string(),
            to_user: req.to_user.to_string(),
            amount: req.amount,
            fee,
            currency: req.currency,
            message: req.message.map(str::to_string),
            status,
            suspicion: suspicion.clone(),
            created_at: req.now,
        })
    })?;

    if let Some(reason) = transfer.suspicion.clone() {
        warn!(
            transfer_id = transfer.id,
            from = req.from_user,
            to = req.to_user,
            %reason,
            "transfer held for review"
        );
        return Err(LedgerError::TransferFlagged {
            transfer_id: transfer.id,
            reason,
        });
    }
    Ok(transfer)
}

/// One transfer by id.
pub fn transfer_by_id(conn: &Connection, transfer_id: i64) -> Result<Transfer> {
    let sql = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = ?1");
    Ok(conn.query_row(&sql, params![transfer_id], read_transfer)?)
}

/// A user's transfer history, both directions, newest first.
pub fn transfers_for_user(conn: &Connection, user: &str, limit: u32) -> Result<Vec<Transfer>> {
    let sql = format!(
        "SELECT {TRANSFER_COLUMNS} FROM transfers
         WHERE from_user = ?1 OR to_user = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user, limit], read_transfer)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Flagged transfers awaiting review, newest first.
pub fn flagged_transfers(conn: &Connection, limit: u32) -> Result<Vec<Transfer>> {
    let sql = format!(
        "SELECT {TRANSFER_COLUMNS} FROM transfers
         WHERE status = 'flagged'
         ORDER BY created_at DESC, id DESC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], read_transfer)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
