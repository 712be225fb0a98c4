use quizmaster_types::constants::SECONDS_PER_DAY;
use quizmaster_types::{BonusKind, Currency};

use crate::bonus;
use crate::error::LedgerError;
use crate::store;
use crate::test_util::*;
use crate::LedgerConfig;

const DAY: u64 = SECONDS_PER_DAY;

#[test]
fn registration_day_grants_the_welcome_bonus() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");

    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 3_600).unwrap();
    assert_eq!(grant.day_index, 0);
    assert_eq!(grant.bonus, BonusKind::Welcome);
    assert_eq!(grant.aoa, 500);
    assert_eq!(available(&db, "alice", Currency::Aoa), 500);
}

#[test]
fn second_claim_the_same_day_fails() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");

    bonus::claim_daily(&db, &config, "alice", T0 + 3_600).unwrap();
    let err = bonus::claim_daily(&db, &config, "alice", T0 + 7_200).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyClaimed));
    assert_eq!(available(&db, "alice", Currency::Aoa), 500);
}

#[test]
fn day_one_grants_vouchers_and_still_counts_as_a_claim() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");

    let grant = bonus::claim_daily(&db, &config, "alice", T0 + DAY).unwrap();
    assert_eq!(grant.bonus, BonusKind::Vouchers);
    assert_eq!(grant.vouchers, 2);
    assert_eq!(grant.aoa, 0);

    let account = db.read(|conn| store::account(conn, "alice")).unwrap();
    assert_eq!(account.vouchers, 2);
    // No money moved, yet the day is spent.
    assert_eq!(available(&db, "alice", Currency::Aoa), 0);
    let err = bonus::claim_daily(&db, &config, "alice", T0 + DAY + 60).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyClaimed));
}

#[test]
fn day_two_grants_non_transferable_usd() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");

    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 2 * DAY).unwrap();
    assert_eq!(grant.bonus, BonusKind::SecondaryCurrency);
    assert_eq!(grant.usd, 500);

    let w = wallet(&db, "alice", Currency::Usd);
    assert_eq!(w.balance, 500);
    assert_eq!(w.non_transferable_balance, 500);
    // Spendable on games, but not transferable or withdrawable.
    assert_eq!(w.available_balance(), 0);
}

#[test]
fn day_three_grants_both_currencies_atomically() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");

    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 3 * DAY).unwrap();
    assert_eq!(grant.bonus, BonusKind::Mixed);
    assert_eq!(grant.aoa, 700);
    assert_eq!(grant.usd, 100);

    assert_eq!(available(&db, "alice", Currency::Aoa), 700);
    let usd = wallet(&db, "alice", Currency::Usd);
    assert_eq!(usd.balance, 100);
    assert_eq!(usd.non_transferable_balance, 100);
}

#[test]
fn streak_raises_the_recurring_bonus() {
    let db = db();
    let config = LedgerConfig::default();
    register(&db, "alice");

    // First recurring claim: no prior claim days in the window.
    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 4 * DAY).unwrap();
    assert_eq!(grant.bonus, BonusKind::Streak);
    assert_eq!(grant.streak_days, 0);
    assert_eq!(grant.aoa, 200);

    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 5 * DAY).unwrap();
    assert_eq!(grant.streak_days, 1);
    assert_eq!(grant.aoa, 300);

    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 6 * DAY).unwrap();
    assert_eq!(grant.streak_days, 2);
    assert_eq!(grant.aoa, 400);

    assert_eq!(available(&db, "alice", Currency::Aoa), 900);
}

#[test]
fn streak_is_capped() {
    let db = db();
    let config = LedgerConfig {
        bonus_streak_cap_days: Some(2),
        ..LedgerConfig::default()
    };
    register(&db, "alice");

    for day in 4..8 {
        bonus::claim_daily(&db, &config, "alice", T0 + day * DAY).unwrap();
    }
    // Four prior claim days in the window, capped at two.
    let grant = bonus::claim_daily(&db, &config, "alice", T0 + 8 * DAY).unwrap();
    assert_eq!(grant.streak_days, 2);
    assert_eq!(grant.aoa, 400);
}

#[test]
fn unknown_user_cannot_claim() {
    let db = db();
    let config = LedgerConfig::default();
    let err = bonus::claim_daily(&db, &config, "ghost", T0).unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));
}
