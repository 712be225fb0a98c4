//! Game entry pools and prize settlement.
//!
//! Joining escrows the entry fee into the player's `locked_balance` and
//! grows the game's virtual prize pool; the money itself stays in player
//! wallets until the game finishes. Settlement ranks players by score
//! (arrival order breaks ties) and pays the top three 70/20/10; a
//! single-player game pays the whole pool to its only player.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use quizmaster_types::constants::{BPS_DENOMINATOR, PRIZE_SPLIT_BPS};
use quizmaster_types::{
    Amount, Currency, EntryMeta, EntryStatus, EntryType, Game, GamePlayer, GameStatus,
};

use crate::config::LedgerConfig;
use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::store;

pub struct GamePool<'a> {
    db: &'a Database,
    config: &'a LedgerConfig,
}

const GAME_COLUMNS: &str = "id, host_id, entry_fee, currency, status, prize_pool, max_players, \
                            created_at, started_at, finished_at";

fn read_game(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        host_id: row.get(1)?,
        entry_fee: row.get(2)?,
        currency: store::parse_text(3, row.get(3)?)?,
        status: store::parse_text(4, row.get(4)?)?,
        prize_pool: row.get(5)?,
        max_players: row.get(6)?,
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
    })
}

fn read_player(row: &Row<'_>) -> rusqlite::Result<GamePlayer> {
    Ok(GamePlayer {
        game_id: row.get(0)?,
        user_id: row.get(1)?,
        score: row.get(2)?,
        position: row.get(3)?,
        prize_amount: row.get(4)?,
        joined_at: row.get(5)?,
    })
}

impl<'a> GamePool<'a> {
    pub fn new(db: &'a Database, config: &'a LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Creates a game open for joins. The host does not get a seat
    /// automatically; they join like anyone else.
    pub fn create(
        &self,
        host_id: &str,
        entry_fee: Amount,
        currency: Currency,
        max_players: Option<u32>,
        now: u64,
    ) -> Result<Game> {
        if entry_fee < 0 {
            return Err(LedgerError::InvalidAmount(entry_fee));
        }
        let max_players = max_players.unwrap_or_else(|| self.config.default_max_players());
        self.db.write(|tx| {
            store::account(tx, host_id)?;
            tx.execute(
                "INSERT INTO games
                 (host_id, entry_fee, currency, status, prize_pool, max_players, created_at)
                 VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?5)",
                params![host_id, entry_fee, currency.code(), max_players, now],
            )?;
            let game_id = tx.last_insert_rowid();
            debug!(game_id, host_id, entry_fee, "game created");
            game_in_tx(tx, game_id)
        })
    }

    /// Takes a seat in a pending game: escrows the entry fee, grows the
    /// pool, and starts the game if this join fills the last seat. At most
    /// one seat per user per game.
    pub fn join(&self, game_id: i64, user_id: &str, now: u64) -> Result<Game> {
        self.db.write(|tx| {
            let game = game_in_tx(tx, game_id)?;
            if game.status != GameStatus::Pending {
                return Err(LedgerError::GameNotJoinable(game_id));
            }
            let seated: u32 = tx.query_row(
                "SELECT COUNT(*) FROM game_players WHERE game_id = ?1",
                params![game_id],
                |row| row.get(0),
            )?;
            if seated >= game.max_players {
                return Err(LedgerError::GameFull(game_id));
            }
            let already: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM game_players WHERE game_id = ?1 AND user_id = ?2",
                    params![game_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            if already.is_some() {
                return Err(LedgerError::AlreadyJoined(game_id));
            }

            let wallet = store::wallet(tx, user_id, game.currency)?;
            if wallet.available_balance() < game.entry_fee {
                return Err(LedgerError::InsufficientFunds {
                    user: user_id.to_string(),
                    currency: game.currency,
                    available: wallet.available_balance(),
                    required: game.entry_fee,
                });
            }
            store::adjust_balance(tx, user_id, game.currency, 0, game.entry_fee, 0)?;
            store::append_entry(
                tx,
                wallet.id,
                EntryType::EntryFee,
                game.entry_fee,
                game.currency,
                EntryStatus::Completed,
                &EntryMeta::EntryFee { game_id },
                now,
            )?;
            tx.execute(
                "INSERT INTO game_players (game_id, user_id, score, joined_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![game_id, user_id, now],
            )?;
            tx.execute(
                "UPDATE games SET prize_pool = prize_pool + ?1 WHERE id = ?2",
                params![game.entry_fee, game_id],
            )?;
            if seated + 1 == game.max_players {
                tx.execute(
                    "UPDATE games SET status = 'running', started_at = ?1 WHERE id = ?2",
                    params![now, game_id],
                )?;
                debug!(game_id, "game filled, starting");
            }
            game_in_tx(tx, game_id)
        })
    }

    /// Starts a pending game before it fills.
    pub fn start(&self, game_id: i64, now: u64) -> Result<Game> {
        self.db.write(|tx| {
            let game = game_in_tx(tx, game_id)?;
            if game.status != GameStatus::Pending {
                return Err(LedgerError::GameNotJoinable(game_id));
            }
            tx.execute(
                "UPDATE games SET status = 'running', started_at = ?1 WHERE id = ?2",
                params![now, game_id],
            )?;
            game_in_tx(tx, game_id)
        })
    }

    /// Adds points to a seated player's score while the game runs. Returns
    /// the new score.
    pub fn record_score(&self, game_id: i64, user_id: &str, points: i64) -> Result<i64> {
        self.db.write(|tx| {
            let game = game_in_tx(tx, game_id)?;
            if game.status != GameStatus::Running {
                return Err(LedgerError::GameNotRunning(game_id));
            }
            let updated = tx.execute(
                "UPDATE game_players SET score = score + ?1
                 WHERE game_id = ?2 AND user_id = ?3",
                params![points, game_id, user_id],
            )?;
            if updated == 0 {
                return Err(LedgerError::NotInGame {
                    game_id,
                    user: user_id.to_string(),
                });
            }
            Ok(tx.query_row(
                "SELECT score FROM game_players WHERE game_id = ?1 AND user_id = ?2",
                params![game_id, user_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Settles a running game: ranks players, pays prizes out of the pool,
    /// and releases escrow. Returns the final standings.
    pub fn finish(&self, game_id: i64, now: u64) -> Result<Vec<GamePlayer>> {
        self.db.write(|tx| {
            let game = game_in_tx(tx, game_id)?;
            if game.status != GameStatus::Running {
                return Err(LedgerError::GameNotRunning(game_id));
            }

            // Arrival order (rowid) breaks score ties.
            let mut stmt = tx.prepare(
                "SELECT game_id, user_id, score, position, prize_amount, joined_at
                 FROM game_players WHERE game_id = ?1
                 ORDER BY score DESC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![game_id], read_player)?;
            let mut standings = Vec::new();
            for row in rows {
                standings.push(row?);
            }
            drop(stmt);
            if standings.is_empty() {
                return Err(LedgerError::GameEmpty(game_id));
            }

            let player_count = standings.len();
            for (index, player) in standings.iter_mut().enumerate() {
                let position = index as u32 + 1;
                // Integer division strands any sub-cent remainder in no
                // wallet; like the transfer fee, it is destroyed.
                let prize = if player_count == 1 {
                    game.prize_pool
                } else {
                    match PRIZE_SPLIT_BPS.get(index) {
                        Some(bps) => game.prize_pool * bps / BPS_DENOMINATOR,
                        None => 0,
                    }
                };
                player.position = Some(position);
                player.prize_amount = Some(prize);

                let wallet = store::wallet(tx, &player.user_id, game.currency)?;
                if prize > 0 {
                    store::adjust_balance(tx, &player.user_id, game.currency, prize, 0, 0)?;
                    store::append_entry(
                        tx,
                        wallet.id,
                        EntryType::Prize,
                        prize,
                        game.currency,
                        EntryStatus::Completed,
                        &EntryMeta::Prize { game_id, position },
                        now,
                    )?;
                }
                // The entry-fee lock is released for every player, winners
                // included, even though the pool already redistributed those
                // fees.
                store::adjust_balance(tx, &player.user_id, game.currency, 0, -game.entry_fee, 0)?;
                tx.execute(
                    "UPDATE game_players SET position = ?1, prize_amount = ?2
                     WHERE game_id = ?3 AND user_id = ?4",
                    params![position, prize, game_id, player.user_id],
                )?;
            }

            tx.execute(
                "UPDATE games SET status = 'finished', finished_at = ?1 WHERE id = ?2",
                params![now, game_id],
            )?;
            debug!(game_id, players = standings.len(), "game settled");
            Ok(standings)
        })
    }

    pub fn game(&self, game_id: i64) -> Result<Game> {
        self.db.read(|conn| {
            let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1");
            conn.query_row(&sql, params![game_id], read_game)
                .optional()?
                .ok_or(LedgerError::GameNotFound(game_id))
        })
    }

    /// Seated players in arrival order.
    pub fn players(&self, game_id: i64) -> Result<Vec<GamePlayer>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT game_id, user_id, score, position, prize_amount, joined_at
                 FROM game_players WHERE game_id = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![game_id], read_player)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}

fn game_in_tx(tx: &rusqlite::Transaction<'_>, game_id: i64) -> Result<Game> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1");
    tx.query_row(&sql, params![game_id], read_game)
        .optional()?
        .ok_or(LedgerError::GameNotFound(game_id))
}
