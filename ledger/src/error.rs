use quizmaster_types::{Amount, Currency, SuspicionReason};
use thiserror::Error;

/// Everything that can go wrong inside the settlement core.
///
/// Validation failures are detected before any write; a failure raised
/// mid-unit rolls the whole unit back. [`LedgerError::Conflict`] is the only
/// retryable variant.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds in {currency} wallet of {user}: available {available}, required {required}")]
    InsufficientFunds {
        user: String,
        currency: Currency,
        available: Amount,
        required: Amount,
    },
    #[error("no {currency} wallet for user {user}")]
    WalletNotFound { user: String, currency: Currency },
    #[error("account {0} not found")]
    AccountNotFound(String),
    #[error("account {0} already exists")]
    AccountExists(String),
    #[error("game {0} not found")]
    GameNotFound(i64),
    #[error("game {0} is not accepting players")]
    GameNotJoinable(i64),
    #[error("game {0} is full")]
    GameFull(i64),
    #[error("already joined game {0}")]
    AlreadyJoined(i64),
    #[error("game {0} is not running")]
    GameNotRunning(i64),
    #[error("game {0} has no players")]
    GameEmpty(i64),
    #[error("user {user} has not joined game {game_id}")]
    NotInGame { game_id: i64, user: String },
    #[error("daily bonus already claimed today")]
    AlreadyClaimed,
    #[error("transfer {transfer_id} held for review: {reason}")]
    TransferFlagged {
        transfer_id: i64,
        reason: SuspicionReason,
    },
    #[error("cannot transfer to self")]
    SelfTransfer,
    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),
    #[error("cannot convert {0} to itself")]
    SameCurrency(Currency),
    #[error("daily transfer limit exceeded: limit {limit}, attempted {attempted}")]
    DailyLimitExceeded { limit: Amount, attempted: Amount },
    #[error("withdrawal entry {0} is not pending")]
    WithdrawalNotPending(i64),
    #[error("concurrent update conflict, retry")]
    Conflict,
    #[error("metadata encoding failed: {0}")]
    Meta(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy)
            | Some(rusqlite::ErrorCode::DatabaseLocked) => LedgerError::Conflict,
            _ => LedgerError::Storage(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
