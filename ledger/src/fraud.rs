//! Heuristic fraud signals.
//!
//! Four independent sub-checks feed a verdict. Each sub-check is fault
//! tolerant: a query failure is logged and degraded to that check's safe
//! default (no signal), never surfaced to the caller. Blocking requires
//! corroboration: high risk alone is not enough, at least two flags must
//! agree.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use quizmaster_types::constants::{
    BEHAVIOR_ACTIONS_PER_HOUR, BEHAVIOR_FAILED_LOGINS_PER_HOUR, DEVICE_USER_COUNT_SUSPICIOUS,
    IP_DISTINCT_USERS_SUSPICIOUS, RAPID_ACCOUNTS_PER_DEVICE_24H, RAPID_ACCOUNTS_PER_IP_24H,
    SECONDS_PER_DAY, SECONDS_PER_HOUR,
};
use quizmaster_types::{Amount, DeviceFlag, FraudFlag, FraudVerdict, RiskLevel, SuspicionReason};

use crate::config::LedgerConfig;
use crate::db::Database;
use crate::error::Result;
use crate::store;

/// Placeholder for a real VPN/proxy classifier.
fn is_vpn(_ip: &str) -> bool {
    false
}

pub struct FraudEvaluator<'a> {
    db: &'a Database,
    config: &'a LedgerConfig,
}

impl<'a> FraudEvaluator<'a> {
    pub fn new(db: &'a Database, config: &'a LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Evaluates all fraud signals for one action.
    ///
    /// The only side effect is an IP-log insert recording the probe; the
    /// caller decides what to do with the verdict. Never fails: degraded
    /// checks contribute their safe default.
    pub fn evaluate(
        &self,
        user_id: Option<&str>,
        device_fingerprint: Option<&str>,
        ip: Option<&str>,
        action: &str,
        now: u64,
    ) -> FraudVerdict {
        if let (Some(user), Some(ip)) = (user_id, ip) {
            if let Err(err) = self
                .db
                .write(|tx| store::log_ip(tx, Some(user), ip, action, now))
            {
                warn!(%err, user, "failed to record ip log");
            }
        }

        let mut verdict = FraudVerdict::clear();
        let raise = |verdict: &mut FraudVerdict, flag: FraudFlag, risk: RiskLevel| {
            verdict.risk = verdict.risk.escalate(risk);
            verdict.flags.push(flag);
        };

        match self.device_suspicious(device_fingerprint) {
            Ok(true) => raise(&mut verdict, FraudFlag::SuspiciousDevice, RiskLevel::High),
            Ok(false) => {}
            Err(err) => warn!(%err, "device check failed, assuming clean"),
        }
        match self.ip_suspicious(ip, now) {
            Ok(true) => raise(&mut verdict, FraudFlag::SuspiciousIp, RiskLevel::Medium),
            Ok(false) => {}
            Err(err) => warn!(%err, "ip check failed, assuming clean"),
        }
        match self.behavior_suspicious(user_id, now) {
            Ok(true) => raise(&mut verdict, FraudFlag::SuspiciousBehavior, RiskLevel::High),
            Ok(false) => {}
            Err(err) => warn!(%err, "behavior check failed, assuming clean"),
        }
        match self.creation_suspicious(device_fingerprint, ip, now) {
            Ok(true) => raise(
                &mut verdict,
                FraudFlag::RapidAccountCreation,
                RiskLevel::High,
            ),
            Ok(false) => {}
            Err(err) => warn!(%err, "account creation check failed, assuming clean"),
        }

        verdict.should_block = verdict.risk == RiskLevel::High && verdict.flags.len() >= 2;
        verdict
    }

    fn device_suspicious(&self, fingerprint: Option<&str>) -> Result<bool> {
        let Some(fingerprint) = fingerprint else {
            return Ok(false);
        };
        self.db.read(|conn| {
            let row: Option<(u32, bool)> = conn
                .query_row(
                    "SELECT user_count, flagged FROM device_flags WHERE device_fingerprint = ?1",
                    params![fingerprint],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(match row {
                Some((count, flagged)) => flagged || count > DEVICE_USER_COUNT_SUSPICIOUS,
                None => false,
            })
        })
    }

    fn ip_suspicious(&self, ip: Option<&str>, now: u64) -> Result<bool> {
        let Some(ip) = ip else {
            return Ok(false);
        };
        if is_vpn(ip) {
            return Ok(true);
        }
        self.db.read(|conn| {
            let since = now.saturating_sub(SECONDS_PER_DAY);
            let users: u32 = conn.query_row(
                "SELECT COUNT(DISTINCT user_id) FROM ip_logs
                 WHERE ip_address = ?1 AND user_id IS NOT NULL AND created_at >= ?2",
                params![ip, since],
                |row| row.get(0),
            )?;
            Ok(users > IP_DISTINCT_USERS_SUSPICIOUS)
        })
    }

    fn behavior_suspicious(&self, user: Option<&str>, now: u64) -> Result<bool> {
        let Some(user) = user else {
            return Ok(false);
        };
        self.db.read(|conn| {
            let since = now.saturating_sub(SECONDS_PER_HOUR);
            let actions: u32 = conn.query_row(
                "SELECT COUNT(*) FROM ip_logs WHERE user_id = ?1 AND created_at >= ?2",
                params![user, since],
                |row| row.get(0),
            )?;
            if actions > BEHAVIOR_ACTIONS_PER_HOUR {
                return Ok(true);
            }
            let failed_logins: u32 = conn.query_row(
                "SELECT COUNT(*) FROM ip_logs
                 WHERE user_id = ?1 AND action = 'failed_login' AND created_at >= ?2",
                params![user, since],
                |row| row.get(0),
            )?;
            Ok(failed_logins > BEHAVIOR_FAILED_LOGINS_PER_HOUR)
        })
    }

    fn creation_suspicious(
        &self,
        fingerprint: Option<&str>,
        ip: Option<&str>,
        now: u64,
    ) -> Result<bool> {
        self.db.read(|conn| {
            let since = now.saturating_sub(SECONDS_PER_DAY);
            if let Some(ip) = ip {
                let registrations: u32 = conn.query_row(
                    "SELECT COUNT(*) FROM ip_logs
                     WHERE ip_address = ?1 AND action = 'register' AND created_at >= ?2",
                    params![ip, since],
                    |row| row.get(0),
                )?;
                if registrations > RAPID_ACCOUNTS_PER_IP_24H {
                    return Ok(true);
                }
            }
            if let Some(fingerprint) = fingerprint {
                let accounts: u32 = conn.query_row(
                    "SELECT COUNT(*) FROM accounts
                     WHERE device_fingerprint = ?1 AND created_at >= ?2",
                    params![fingerprint, since],
                    |row| row.get(0),
                )?;
                if accounts > RAPID_ACCOUNTS_PER_DEVICE_24H {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }

    /// Decides whether a transfer should be held for review instead of
    /// settling. Checks run in order of severity; query failures degrade to
    /// "not suspicious".
    pub fn transfer_suspicion(
        &self,
        from_user: &str,
        to_user: &str,
        amount: Amount,
        now: u64,
    ) -> Option<SuspicionReason> {
        match self.shared_device(from_user, to_user) {
            Ok(true) => return Some(SuspicionReason::SharedDevice),
            Ok(false) => {}
            Err(err) => warn!(%err, "shared-device check failed, assuming clean"),
        }
        match self.pair_transfer_count(from_user, to_user, now) {
            Ok(count) if count > self.config.pair_transfer_hourly_limit() => {
                return Some(SuspicionReason::RapidPairTransfers { count });
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "pair-transfer check failed, assuming clean"),
        }
        if amount > self.config.large_transfer_threshold() {
            return Some(SuspicionReason::LargeAmount { amount });
        }
        None
    }

    fn shared_device(&self, from_user: &str, to_user: &str) -> Result<bool> {
        self.db.read(|conn| {
            let fingerprint_of = |user: &str| -> Result<Option<String>> {
                Ok(conn
                    .query_row(
                        "SELECT device_fingerprint FROM accounts WHERE user_id = ?1",
                        params![user],
                        |row| row.get(0),
                    )
                    .optional()?
                    .flatten())
            };
            let from = fingerprint_of(from_user)?;
            let to = fingerprint_of(to_user)?;
            Ok(matches!((from, to), (Some(a), Some(b)) if a == b))
        })
    }

    /// Transfers between the pair in the last hour, both directions.
    fn pair_transfer_count(&self, from_user: &str, to_user: &str, now: u64) -> Result<u32> {
        self.db.read(|conn| {
            let since = now.saturating_sub(SECONDS_PER_HOUR);
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM transfers
                 WHERE ((from_user = ?1 AND to_user = ?2) OR (from_user = ?2 AND to_user = ?1))
                 AND created_at >= ?3",
                params![from_user, to_user, since],
                |row| row.get(0),
            )?)
        })
    }

    /// Stickily flags a device fingerprint. Audit-logged; the flag never
    /// clears.
    pub fn flag_device(&self, admin: &str, fingerprint: &str, reason: &str, now: u64) -> Result<()> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO device_flags (device_fingerprint, user_count, flagged, last_flagged_at)
                 VALUES (?1, 0, 1, ?2)
                 ON CONFLICT (device_fingerprint)
                 DO UPDATE SET flagged = 1, last_flagged_at = ?2",
                params![fingerprint, now],
            )?;
            store::audit(
                tx,
                None,
                Some(admin),
                "flag_device",
                &serde_json::json!({ "fingerprint": fingerprint, "reason": reason }),
                now,
            )
        })
    }
}

/// All currently flagged devices, most recently flagged first.
pub fn flagged_devices(conn: &Connection) -> Result<Vec<DeviceFlag>> {
    let mut stmt = conn.prepare(
        "SELECT device_fingerprint, user_count, flagged, last_flagged_at
         FROM device_flags WHERE flagged = 1
         ORDER BY last_flagged_at DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(DeviceFlag {
            device_fingerprint: row.get(0)?,
            user_count: row.get(1)?,
            flagged: row.get(2)?,
            last_flagged_at: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
