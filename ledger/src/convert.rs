//! Fixed-rate conversion between the two platform currencies.

use quizmaster_types::constants::{AOA_TO_USD_RATE_MICROS, RATE_SCALE, USD_TO_AOA_RATE_MICROS};
use quizmaster_types::{Amount, Currency, EntryMeta, EntryStatus, EntryType};

use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::store;

/// Outcome of a conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub from: Currency,
    pub to: Currency,
    pub amount: Amount,
    pub converted: Amount,
    pub rate_micros: i64,
}

/// Micro-rate applied when converting `from` into `to`.
pub fn rate_micros(from: Currency, to: Currency) -> Option<i64> {
    match (from, to) {
        (Currency::Aoa, Currency::Usd) => Some(AOA_TO_USD_RATE_MICROS),
        (Currency::Usd, Currency::Aoa) => Some(USD_TO_AOA_RATE_MICROS),
        _ => None,
    }
}

/// Converts `amount` of the user's available `from` balance into `to`.
///
/// Debits and credits spendable `balance` only; locked and non-transferable
/// funds cannot be converted. An amount too small to yield at least one cent
/// of the target currency is rejected rather than silently destroyed.
pub fn convert(
    db: &Database,
    user: &str,
    from: Currency,
    to: Currency,
    amount: Amount,
    now: u64,
) -> Result<Conversion> {
    if from == to {
        return Err(LedgerError::SameCurrency(from));
    }
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let rate = match rate_micros(from, to) {
        Some(rate) => rate,
        None => return Err(LedgerError::SameCurrency(from)),
    };
    let converted = (i128::from(amount) * i128::from(rate) / i128::from(RATE_SCALE)) as Amount;
    if converted <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }

    db.write(|tx| {
        let source = store::wallet(tx, user, from)?;
        if source.available_balance() < amount {
            return Err(LedgerError::InsufficientFunds {
                user: user.to_string(),
                currency: from,
                available: source.available_balance(),
                required: amount,
            });
        }
        store::adjust_balance(tx, user, from, -amount, 0, 0)?;
        store::append_entry(
            tx,
            source.id,
            EntryType::ConversionOut,
            amount,
            from,
            EntryStatus::Completed,
            &EntryMeta::Conversion {
                counterpart: to,
                rate_micros: rate,
            },
            now,
        )?;
        let target = store::adjust_balance(tx, user, to, converted, 0, 0)?;
        store::append_entry(
            tx,
            target.id,
            EntryType::ConversionIn,
            converted,
            to,
            EntryStatus::Completed,
            &EntryMeta::Conversion {
                counterpart: from,
                rate_micros: rate,
            },
            now,
        )?;
        Ok(Conversion {
            from,
            to,
            amount,
            converted,
            rate_micros: rate,
        })
    })
}
