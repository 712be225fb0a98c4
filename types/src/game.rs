use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Amount, Currency, ParseEnumError};

/// Lifecycle of a game: pending (open for joins) -> running -> finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Pending,
    Running,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "pending",
            GameStatus::Running => "running",
            GameStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GameStatus::Pending),
            "running" => Ok(GameStatus::Running),
            "finished" => Ok(GameStatus::Finished),
            other => Err(ParseEnumError::new("game status", other)),
        }
    }
}

/// One quiz game with an entry-fee pool.
///
/// `prize_pool` is virtual: it tracks the sum of escrowed entry fees but the
/// money stays locked in player wallets until payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub host_id: String,
    pub entry_fee: Amount,
    pub currency: Currency,
    pub status: GameStatus,
    pub prize_pool: Amount,
    pub max_players: u32,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

/// A player's seat in a game. `position` and `prize_amount` are filled at
/// settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub game_id: i64,
    pub user_id: String,
    pub score: i64,
    pub position: Option<u32>,
    pub prize_amount: Option<Amount>,
    pub joined_at: u64,
}
