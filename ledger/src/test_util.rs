use quizmaster_types::{Amount, Currency, Wallet};

use crate::db::Database;
use crate::store;

/// Fixed base time for tests (unix seconds), aligned to a day boundary so
/// calendar-day arithmetic is predictable.
pub const T0: u64 = 1_700_006_400;

pub fn db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn register(db: &Database, user: &str) {
    register_at(db, user, None, None, T0);
}

pub fn register_at(
    db: &Database,
    user: &str,
    fingerprint: Option<&str>,
    ip: Option<&str>,
    at: u64,
) {
    store::create_account(db, user, fingerprint, ip, at).unwrap();
}

pub fn fund(db: &Database, user: &str, currency: Currency, amount: Amount) {
    store::deposit(db, user, currency, amount, None, T0).unwrap();
}

pub fn wallet(db: &Database, user: &str, currency: Currency) -> Wallet {
    db.read(|conn| store::wallet(conn, user, currency)).unwrap()
}

pub fn available(db: &Database, user: &str, currency: Currency) -> Amount {
    wallet(db, user, currency).available_balance()
}
