//! Privileged operations. Everything here is human-triggered and
//! audit-logged; authorization happens in the calling layer.

use rusqlite::params;
use tracing::warn;

use quizmaster_types::{
    EntryMeta, EntryStatus, EntryType, LedgerEntry, WithdrawalResolution,
};

use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::store;

/// How a pending withdrawal was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

/// Deactivates an account. The account keeps its wallets and history; it
/// just cannot act anymore.
pub fn flag_user(db: &Database, admin: &str, user: &str, reason: &str, now: u64) -> Result<()> {
    db.write(|tx| {
        let updated = tx.execute(
            "UPDATE accounts SET is_active = 0 WHERE user_id = ?1",
            params![user],
        )?;
        if updated == 0 {
            return Err(LedgerError::AccountNotFound(user.to_string()));
        }
        store::audit(
            tx,
            Some(user),
            Some(admin),
            "flag_user",
            &serde_json::json!({ "reason": reason }),
            now,
        )?;
        warn!(user, admin, reason, "account flagged");
        Ok(())
    })
}

/// Resolves a pending withdrawal entry.
///
/// Approval burns the escrowed amount out of both `balance` and
/// `locked_balance` (the money leaves the platform); rejection releases the
/// escrow back to available. This is the one sanctioned mutation of an
/// existing transaction row: `status` flips and the resolution is merged
/// into the entry's metadata.
pub fn resolve_withdrawal(
    db: &Database,
    admin: &str,
    entry_id: i64,
    decision: WithdrawalDecision,
    reason: Option<&str>,
    now: u64,
) -> Result<LedgerEntry> {
    db.write(|tx| {
        let entry = store::entry(tx, entry_id)?;
        if entry.entry_type != EntryType::Withdrawal || entry.status != EntryStatus::Pending {
            return Err(LedgerError::WithdrawalNotPending(entry_id));
        }
        let wallet = store::wallet_by_id(tx, entry.wallet_id)?;

        let status = match decision {
            WithdrawalDecision::Approve => {
                store::adjust_balance(
                    tx,
                    &wallet.user_id,
                    wallet.currency,
                    -entry.amount,
                    -entry.amount,
                    0,
                )?;
                EntryStatus::Completed
            }
            WithdrawalDecision::Reject => {
                store::adjust_balance(tx, &wallet.user_id, wallet.currency, 0, -entry.amount, 0)?;
                EntryStatus::Rejected
            }
        };

        let resolution = WithdrawalResolution {
            resolved_by: admin.to_string(),
            resolved_at: now,
            reason: reason.map(str::to_string),
        };
        let meta = match entry.meta {
            EntryMeta::Withdrawal { iban, .. } => EntryMeta::Withdrawal {
                iban,
                resolution: Some(resolution),
            },
            // A withdrawal entry always carries withdrawal metadata; if it
            // somehow does not, resolution details still get recorded.
            _ => EntryMeta::Withdrawal {
                iban: None,
                resolution: Some(resolution),
            },
        };
        tx.execute(
            "UPDATE transactions SET status = ?1, meta = ?2 WHERE id = ?3",
            params![status.as_str(), serde_json::to_string(&meta)?, entry_id],
        )?;
        store::audit(
            tx,
            Some(&wallet.user_id),
            Some(admin),
            match decision {
                WithdrawalDecision::Approve => "withdrawal_approved",
                WithdrawalDecision::Reject => "withdrawal_rejected",
            },
            &serde_json::json!({ "entry_id": entry_id, "amount": entry.amount, "reason": reason }),
            now,
        )?;
        store::entry(tx, entry_id)
    })
}

/// Users whose accounts have been deactivated.
pub fn flagged_users(db: &Database) -> Result<Vec<String>> {
    db.read(|conn| {
        let mut stmt =
            conn.prepare("SELECT user_id FROM accounts WHERE is_active = 0 ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
}
