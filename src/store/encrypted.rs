//! SQLite-backed log store with AES-GCM encryption of the raw event text.
//! Key derived from a configured secret. Tier, score, time and user stay in
//! plain columns so they can be filtered and counted.

use super::{LogFilter, LogRecord, NewRecord, Statistics};
use crate::classifier::Tier;
use crate::error::StoreError;
use crate::normalize::Sequence;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngCore;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, StoreError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| StoreError::Encryption)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|_| StoreError::Encryption)?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<String, StoreError> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| StoreError::Decryption(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(StoreError::Decryption("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| StoreError::Decryption(format!("{:?}", e)))?;
    let plain = cipher
        .decrypt(nonce.into(), ct)
        .map_err(|_| StoreError::Decryption("authentication failed".into()))?;
    String::from_utf8(plain).map_err(|e| StoreError::Decryption(e.to_string()))
}

fn ts_from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

pub struct SecureStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl SecureStore {
    /// Open or create DB at path and verify it answers queries.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_enc TEXT NOT NULL,
                sequence TEXT NOT NULL,
                prediction TEXT NOT NULL,
                score REAL NOT NULL,
                ts INTEGER NOT NULL,
                user_email TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_logs_ts ON logs(ts);
            CREATE INDEX IF NOT EXISTS idx_logs_prediction ON logs(prediction);
            CREATE INDEX IF NOT EXISTS idx_logs_user ON logs(user_email);
            "#,
        )?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert one record in a single statement; returns the durable id.
    pub fn insert(&self, record: &NewRecord, ts: DateTime<Utc>) -> Result<i64, StoreError> {
        let enc = encrypt(&self.key, record.event.as_bytes())?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO logs (event_enc, sequence, prediction, score, ts, user_email) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                enc,
                record.sequence.as_str(),
                record.tier.as_str(),
                record.score,
                ts.timestamp_millis(),
                record.user_email
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest first, decrypting event text. Rows with an unreadable event or
    /// an unknown tier are skipped, so fewer than `limit` may come back.
    pub fn list(&self, limit: usize, filter: &LogFilter) -> Result<Vec<LogRecord>, StoreError> {
        let mut sql = String::from(
            "SELECT id, event_enc, sequence, prediction, score, ts, user_email FROM logs",
        );
        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(tier) = filter.tier {
            clauses.push("prediction = ?");
            args.push(Value::Text(tier.as_str().to_string()));
        }
        if let Some(ref email) = filter.user_email {
            clauses.push("user_email = ?");
            args.push(Value::Text(email.clone()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ts DESC, id DESC LIMIT ?");
        args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, enc, sequence, prediction, score, ts, user_email) = row?;
            let tier = match prediction.parse::<Tier>() {
                Ok(t) => t,
                Err(e) => {
                    warn!(id, error = %e, "skipping record with unknown tier");
                    continue;
                }
            };
            let event = match decrypt(&self.key, &enc) {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(id, error = %e, "skipping record that does not decrypt");
                    continue;
                }
            };
            out.push(LogRecord {
                id: id.to_string(),
                event,
                sequence: Sequence::from_normalized(sequence),
                tier,
                score,
                timestamp: ts_from_millis(ts),
                user_email,
            });
        }
        Ok(out)
    }

    /// Per-tier counts over all records, or one user's records.
    pub fn statistics(&self, user_email: Option<&str>) -> Result<Statistics, StoreError> {
        let conn = self.conn();
        let mut stats = Statistics::default();
        let mut tally = |prediction: String, n: i64| {
            if let Ok(tier) = prediction.parse::<Tier>() {
                stats.add(tier, n.max(0) as u64);
            }
        };
        match user_email {
            Some(email) => {
                let mut stmt = conn.prepare(
                    "SELECT prediction, COUNT(*) FROM logs WHERE user_email = ?1 GROUP BY prediction",
                )?;
                let rows = stmt.query_map(params![email], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
                for row in rows {
                    let (p, n) = row?;
                    tally(p, n);
                }
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT prediction, COUNT(*) FROM logs GROUP BY prediction")?;
                let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
                for row in rows {
                    let (p, n) = row?;
                    tally(p, n);
                }
            }
        }
        Ok(stats)
    }

    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let n = self.conn().execute("DELETE FROM logs WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    pub fn clear(&self) -> Result<u64, StoreError> {
        let n = self.conn().execute("DELETE FROM logs", [])?;
        Ok(n as u64)
    }
}
