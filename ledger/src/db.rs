use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::warn;

use crate::error::Result;

/// Schema for the ledger database. `transactions` is append-only: nothing in
/// this crate updates or deletes a row there except admin withdrawal
/// resolution, which touches only `status` and `meta`.
const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    user_id TEXT PRIMARY KEY,
    device_fingerprint TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    vouchers INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wallets (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES accounts(user_id),
    currency TEXT NOT NULL,
    balance INTEGER NOT NULL DEFAULT 0,
    locked_balance INTEGER NOT NULL DEFAULT 0,
    non_transferable_balance INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, currency)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    wallet_id INTEGER NOT NULL REFERENCES wallets(id),
    tx_type TEXT NOT NULL,
    amount INTEGER NOT NULL,
    currency TEXT NOT NULL,
    status TEXT NOT NULL,
    meta TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_wallet ON transactions (wallet_id, created_at);

CREATE TABLE IF NOT EXISTS transfers (
    id INTEGER PRIMARY KEY,
    from_user TEXT NOT NULL,
    to_user TEXT NOT NULL,
    amount INTEGER NOT NULL,
    fee INTEGER NOT NULL,
    currency TEXT NOT NULL,
    message TEXT,
    status TEXT NOT NULL,
    suspicion TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers (from_user, created_at);
CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers (to_user, created_at);

CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY,
    host_id TEXT NOT NULL,
    entry_fee INTEGER NOT NULL,
    currency TEXT NOT NULL,
    status TEXT NOT NULL,
    prize_pool INTEGER NOT NULL DEFAULT 0,
    max_players INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    finished_at INTEGER
);

CREATE TABLE IF NOT EXISTS game_players (
    game_id INTEGER NOT NULL REFERENCES games(id),
    user_id TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    position INTEGER,
    prize_amount INTEGER,
    joined_at INTEGER NOT NULL,
    UNIQUE (game_id, user_id)
);

CREATE TABLE IF NOT EXISTS device_flags (
    device_fingerprint TEXT PRIMARY KEY,
    user_count INTEGER NOT NULL DEFAULT 0,
    flagged INTEGER NOT NULL DEFAULT 0,
    last_flagged_at INTEGER
);

CREATE TABLE IF NOT EXISTS ip_logs (
    id INTEGER PRIMARY KEY,
    user_id TEXT,
    ip_address TEXT NOT NULL,
    action TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ip_logs_ip ON ip_logs (ip_address, created_at);
CREATE INDEX IF NOT EXISTS idx_ip_logs_user ON ip_logs (user_id, created_at);

CREATE TABLE IF NOT EXISTS audit_logs (
    id INTEGER PRIMARY KEY,
    user_id TEXT,
    admin_id TEXT,
    action TEXT NOT NULL,
    details TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
";

/// Handle on the ledger database.
///
/// One connection behind a mutex. Writers run inside a BEGIN IMMEDIATE
/// transaction, so the combination of the mutex and SQLite's single-writer
/// lock serializes every money-moving unit: two concurrent debits cannot
/// both observe a stale available balance.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (creating if needed) the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Opens a fresh in-memory database. Test use mostly.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` inside one atomic unit: a BEGIN IMMEDIATE transaction that
    /// commits when `f` returns `Ok` and rolls back when it returns `Err`.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Runs `f` against the connection without opening a write transaction.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("database mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
