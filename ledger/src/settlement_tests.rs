use proptest::prelude::*;

use quizmaster_types::constants::SECONDS_PER_DAY;
use quizmaster_types::{Currency, SuspicionReason, TransferStatus};

use crate::convert;
use crate::error::LedgerError;
use crate::test_util::*;
use crate::transfer::{self, TransferRequest};
use crate::LedgerConfig;

fn request<'a>(from: &'a str, to: &'a str, amount: i64, now: u64) -> TransferRequest<'a> {
    TransferRequest {
        from_user: from,
        to_user: to,
        amount,
        currency: Currency::Aoa,
        message: None,
        now,
    }
}

#[test]
fn transfer_moves_amount_and_destroys_fee() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");
    register(&db, "bob");
    fund(&db, "alice", Currency::Aoa, 10_000);

    let t = transfer::transfer(&db, &config, &request("alice", "bob", 1_000, T0)).unwrap();
    assert_eq!(t.status, TransferStatus::Completed);
    assert_eq!(t.fee, 200);

    // Sender pays amount plus fee, recipient receives the amount, the fee
    // exists in no wallet afterwards.
    assert_eq!(available(&db, "alice", Currency::Aoa), 8_800);
    assert_eq!(available(&db, "bob", Currency::Aoa), 1_000);
    let total = wallet(&db, "alice", Currency::Aoa).balance + wallet(&db, "bob", Currency::Aoa).balance;
    assert_eq!(total, 10_000 - 200);
}

#[test]
fn self_transfer_is_rejected() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 1_000);
    let err = transfer::transfer(&db, &config, &request("alice", "alice", 500, T0)).unwrap_err();
    assert!(matches!(err, LedgerError::SelfTransfer));
}

#[test]
fn below_minimum_amount_is_rejected() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");
    register(&db, "bob");
    fund(&db, "alice", Currency::Aoa, 1_000);
    let err = transfer::transfer(&db, &config, &request("alice", "bob", 50, T0)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(50)));
}

#[test]
fn insufficient_available_balance_is_rejected() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");
    register(&db, "bob");
    fund(&db, "alice", Currency::Aoa, 1_000);
    let err = transfer::transfer(&db, &config, &request("alice", "bob", 900, T0)).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(available(&db, "alice", Currency::Aoa), 1_000);
    assert_eq!(available(&db, "bob", Currency::Aoa), 0);
}

#[test]
fn missing_recipient_wallet_is_rejected() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 1_000);
    let err = transfer::transfer(&db, &config, &request("alice", "ghost", 500, T0)).unwrap_err();
    assert!(matches!(err, LedgerError::WalletNotFound { user, .. } if user == "ghost"));
}

#[test]
fn daily_limit_counts_completed_transfers_only() {
    let db = db();
    let config = LedgerConfig {
        transfer_fee: Some(0),
        daily_transfer_limit: Some(2_000),
        ..LedgerConfig::default()
    };
    register(&db, "alice");
    register(&db, "bob");
    fund(&db, "alice", Currency::Aoa, 100_000);

    transfer::transfer(&db, &config, &request("alice", "bob", 1_500, T0)).unwrap();
    let err = transfer::transfer(&db, &config, &request("alice", "bob", 600, T0 + 60)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::DailyLimitExceeded {
            limit: 2_000,
            attempted: 2_100,
        }
    ));

    // A fresh calendar day resets the window.
    transfer::transfer(&db, &config, &request("alice", "bob", 600, T0 + SECONDS_PER_DAY)).unwrap();
}

#[test]
fn shared_device_transfer_is_flagged_and_moves_no_money() {
    let db = db();
    let config = LedgerConfig::default();
    register_at(&db, "alice", Some("dev-1"), None, T0);
    register_at(&db, "bob", Some("dev-1"), None, T0);
    fund(&db, "alice", Currency::Aoa, 10_000);

    let err = transfer::transfer(&db, &config, &request("alice", "bob", 1_000, T0)).unwrap_err();
    let transfer_id = match err {
        LedgerError::TransferFlagged {
            transfer_id,
            reason: SuspicionReason::SharedDevice,
        } => transfer_id,
        other => panic!("unexpected error: {other:?}"),
    };

    assert_eq!(available(&db, "alice", Currency::Aoa), 10_000);
    assert_eq!(available(&db, "bob", Currency::Aoa), 0);

    // The flagged row is persisted for review even though nothing settled.
    let flagged = db.read(|conn| transfer::flagged_transfers(conn, 10)).unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].id, transfer_id);
    assert_eq!(flagged[0].status, TransferStatus::Flagged);
    assert_eq!(flagged[0].suspicion, Some(SuspicionReason::SharedDevice));
}

#[test]
fn large_transfer_is_flagged() {
    let db = db();
    let config = LedgerConfig {
        daily_transfer_limit: Some(1_000_000),
        ..LedgerConfig::default()
    };
    register(&db, "alice");
    register(&db, "bob");
    fund(&db, "alice", Currency::Aoa, 500_000);

    let err = transfer::transfer(&db, &config, &request("alice", "bob", 200_000, T0)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TransferFlagged {
            reason: SuspicionReason::LargeAmount { amount: 200_000 },
            ..
        }
    ));
    assert_eq!(available(&db, "alice", Currency::Aoa), 500_000);
}

#[test]
fn rapid_pair_transfers_are_flagged() {
    let db = db();
    let config = LedgerConfig {
        transfer_fee: Some(0),
        daily_transfer_limit: Some(1_000_000),
        ..LedgerConfig::default()
    };
    register(&db, "alice");
    register(&db, "bob");
    fund(&db, "alice", Currency::Aoa, 100_000);

    for i in 0..4 {
        transfer::transfer(&db, &config, &request("alice", "bob", 100, T0 + i)).unwrap();
    }
    let err = transfer::transfer(&db, &config, &request("alice", "bob", 100, T0 + 10)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TransferFlagged {
            reason: SuspicionReason::RapidPairTransfers { count: 4 },
            ..
        }
    ));
}

#[test]
fn conversion_applies_the_fixed_micro_rate() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 10_000);

    let out = convert::convert(&db, "alice", Currency::Aoa, Currency::Usd, 10_000, T0).unwrap();
    assert_eq!(out.converted, 11);
    assert_eq!(available(&db, "alice", Currency::Aoa), 0);
    assert_eq!(available(&db, "alice", Currency::Usd), 11);
}

#[test]
fn conversion_back_to_primary_currency() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Usd, 100);

    let out = convert::convert(&db, "alice", Currency::Usd, Currency::Aoa, 100, T0).unwrap();
    assert_eq!(out.converted, 90_909);
    assert_eq!(available(&db, "alice", Currency::Aoa), 90_909);
}

#[test]
fn conversion_too_small_to_yield_a_cent_is_rejected() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 500);
    let err = convert::convert(&db, "alice", Currency::Aoa, Currency::Usd, 500, T0).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(500)));
    assert_eq!(available(&db, "alice", Currency::Aoa), 500);
}

#[test]
fn conversion_to_same_currency_is_rejected() {
    let db = db();
    register(&db, "alice");
    fund(&db, "alice", Currency::Aoa, 1_000);
    let err = convert::convert(&db, "alice", Currency::Aoa, Currency::Aoa, 500, T0).unwrap_err();
    assert!(matches!(err, LedgerError::SameCurrency(Currency::Aoa)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Money is conserved: across any sequence of transfer attempts, total
    /// balances plus destroyed fees equal the initial total, and no wallet
    /// ever goes negative.
    #[test]
    fn transfers_conserve_money(
        ops in proptest::collection::vec((0usize..3, 0usize..3, 100i64..5_000), 1..25)
    ) {
        let db = db();
        let config = LedgerConfig {
            daily_transfer_limit: Some(1_000_000),
            ..LedgerConfig::default()
        };
        let users = ["u0", "u1", "u2"];
        for user in users {
            register(&db, user);
            fund(&db, user, Currency::Aoa, 50_000);
        }
        let initial: i64 = 3 * 50_000;

        let mut destroyed = 0i64;
        for (i, (from, to, amount)) in ops.iter().enumerate() {
            let req = request(users[*from], users[*to], *amount, T0 + i as u64);
            match transfer::transfer(&db, &config, &req) {
                Ok(t) => destroyed += t.fee,
                Err(LedgerError::SelfTransfer)
                | Err(LedgerError::InsufficientFunds { .. })
                | Err(LedgerError::DailyLimitExceeded { .. })
                | Err(LedgerError::TransferFlagged { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        let mut total = 0i64;
        for user in users {
            let w = wallet(&db, user, Currency::Aoa);
            prop_assert!(w.validate_invariants().is_ok());
            total += w.balance;
        }
        prop_assert_eq!(total + destroyed, initial);
    }
}
