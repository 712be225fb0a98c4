use quizmaster_types::{Currency, EntryMeta, EntryStatus, EntryType};

use crate::admin::{self, WithdrawalDecision};
use crate::error::LedgerError;
use crate::fraud;
use crate::store;
use crate::test_util::*;
use crate::Database;

#[test]
fn registration_provisions_one_zero_wallet_per_currency() {
    let db = db();
    register(&db, "alice");
    let wallets = db.read(|conn| store::wallets(conn, "alice")).unwrap();
    assert_eq!(wallets.len(), Currency::ALL.len());
    for w in wallets {
        assert_eq!(w.balance, 0);
        assert_eq!(w.locked_balance, 0);
        assert_eq!(w.non_transferable_balance, 0);
    }
}

#[test]
fn duplicate_registration_is_rejected() {
    let db = db();
    register(&db, "alice");
    let err = store::create_account(&db, "alice", None, None, T0).unwrap_err();
    assert!(matches!(err, LedgerError::AccountExists(user) if user == "alice"));
}

#[test]
fn deposit_credits_balance_and_logs_entry() {
    let db = db();
    register(&db, "alice");
    let entry_id = store::deposit(&db, "alice", Currency::Aoa, 5_000, Some("ref-1"), T0).unwrap();
    assert_eq!(available(&db, "alice", Currency::Aoa), 5_000);

    let entry = db.read(|conn| store::entry(conn, entry_id)).unwrap();
    assert_eq!(entry.entry_type, EntryType::Deposit);
    assert_eq!(entry.status, EntryStatus::Completed);
    assert_eq!(entry.amount, 5_000);
    assert_eq!(
        entry.meta,
        EntryMeta::Deposit {
            reference: Some("ref-1".to_string()),
        }
    );
}

#[test]
fn withdrawal_request_escrows_without_moving_balance() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 5_000);
    store::request_withdrawal(&db, "alice", Currency::Aoa, 3_000, Some("AO06"), T0).unwrap();

    let w = wallet(&db, "alice", Currency::Aoa);
    assert_eq!(w.balance, 5_000);
    assert_eq!(w.locked_balance, 3_000);
    assert_eq!(w.available_balance(), 2_000);
}

#[test]
fn withdrawal_cannot_exceed_available() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 1_000);
    let err = store::request_withdrawal(&db, "alice", Currency::Aoa, 1_500, None, T0).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(available(&db, "alice", Currency::Aoa), 1_000);
}

#[test]
fn approved_withdrawal_burns_balance_and_escrow() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 5_000);
    let entry_id =
        store::request_withdrawal(&db, "alice", Currency::Aoa, 3_000, None, T0).unwrap();

    let entry = admin::resolve_withdrawal(
        &db,
        "admin-1",
        entry_id,
        WithdrawalDecision::Approve,
        None,
        T0 + 60,
    )
    .unwrap();
    assert_eq!(entry.status, EntryStatus::Completed);

    let w = wallet(&db, "alice", Currency::Aoa);
    assert_eq!(w.balance, 2_000);
    assert_eq!(w.locked_balance, 0);
}

#[test]
fn rejected_withdrawal_releases_escrow() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 5_000);
    let entry_id =
        store::request_withdrawal(&db, "alice", Currency::Aoa, 3_000, None, T0).unwrap();

    let entry = admin::resolve_withdrawal(
        &db,
        "admin-1",
        entry_id,
        WithdrawalDecision::Reject,
        Some("document mismatch"),
        T0 + 60,
    )
    .unwrap();
    assert_eq!(entry.status, EntryStatus::Rejected);
    match entry.meta {
        EntryMeta::Withdrawal {
            resolution: Some(resolution),
            ..
        } => {
            assert_eq!(resolution.resolved_by, "admin-1");
            assert_eq!(resolution.reason.as_deref(), Some("document mismatch"));
        }
        other => panic!("unexpected meta: {other:?}"),
    }

    let w = wallet(&db, "alice", Currency::Aoa);
    assert_eq!(w.balance, 5_000);
    assert_eq!(w.locked_balance, 0);
    assert_eq!(w.available_balance(), 5_000);
}

#[test]
fn withdrawal_cannot_resolve_twice() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 5_000);
    let entry_id =
        store::request_withdrawal(&db, "alice", Currency::Aoa, 1_000, None, T0).unwrap();
    admin::resolve_withdrawal(&db, "a", entry_id, WithdrawalDecision::Approve, None, T0).unwrap();

    let err = admin::resolve_withdrawal(&db, "a", entry_id, WithdrawalDecision::Reject, None, T0)
        .unwrap_err();
    assert!(matches!(err, LedgerError::WithdrawalNotPending(id) if id == entry_id));
}

#[test]
fn history_is_newest_first() {
    let db = db();
    register(&db, "alice");
    store::deposit(&db, "alice", Currency::Aoa, 100, None, T0).unwrap();
    store::deposit(&db, "alice", Currency::Aoa, 200, None, T0 + 10).unwrap();
    store::deposit(&db, "alice", Currency::Usd, 300, None, T0 + 20).unwrap();

    let entries = db
        .read(|conn| store::entries_for_user(conn, "alice", 10))
        .unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].amount, 300);
    assert_eq!(entries[2].amount, 100);
}

#[test]
fn third_registration_on_a_device_flags_it_stickily() {
    let db = db();
    register_at(&db, "u1", Some("dev-1"), None, T0);
    register_at(&db, "u2", Some("dev-1"), None, T0 + 1);
    let flagged = db.read(fraud::flagged_devices).unwrap();
    assert!(flagged.is_empty());

    register_at(&db, "u3", Some("dev-1"), None, T0 + 2);
    let flagged = db.read(fraud::flagged_devices).unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].device_fingerprint, "dev-1");
    assert_eq!(flagged[0].user_count, 3);

    // More registrations keep the flag, they never reset it.
    register_at(&db, "u4", Some("dev-1"), None, T0 + 3);
    let flagged = db.read(fraud::flagged_devices).unwrap();
    assert_eq!(flagged.len(), 1);
    assert!(flagged[0].flagged);
    assert_eq!(flagged[0].user_count, 4);
}

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    {
        let db = Database::open(&path).unwrap();
        register(&db, "alice");
        fund(&db, "alice", Currency::Aoa, 7_500);
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(available(&db, "alice", Currency::Aoa), 7_500);
    let entries = db
        .read(|conn| store::entries_for_user(conn, "alice", 10))
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, EntryType::Deposit);
}
