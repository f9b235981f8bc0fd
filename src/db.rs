//! Database module for the intake service
//!
//! Persists one conversation record per phone number.

mod schema;

pub use schema::*;

use crate::state_machine::{CollectedField, ConversationRecord, IntakeState};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Conversation {phone} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        phone: String,
        expected: u64,
        found: u64,
    },
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        // Fails once the column exists
        let _ = conn.execute(MIGRATION_OPTED_OUT, []);
        Ok(())
    }

    // ==================== Conversation Operations ====================

    /// Get the record for a phone number, `None` if it was never written
    pub fn get_record(&self, phone: &str) -> DbResult<Option<ConversationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT phone, conversation_state, plz, kwh, photo_received, version, updated_at, opted_out
             FROM conversations WHERE phone = ?1",
        )?;

        let record = stmt
            .query_row(params![phone], |row| {
                let raw_state: String = row.get(1)?;
                let version: i64 = row.get(5)?;
                Ok(ConversationRecord {
                    phone: row.get(0)?,
                    state: parse_state(phone, &raw_state),
                    postal_code: row.get(2)?,
                    energy_kwh: row.get(3)?,
                    photo_received: row.get(4)?,
                    opted_out: row.get(7)?,
                    version: from_db_version(version),
                    updated_at: Some(parse_datetime(&row.get::<_, String>(6)?)),
                })
            })
            .optional()?;

        Ok(record)
    }

    /// Write a state change for one phone number.
    ///
    /// Only `conversation_state`, the column of `field`, and the bookkeeping
    /// columns are touched, except that entering `awaiting_plz` clears all
    /// answers. Fails with [`DbError::VersionConflict`] if the row no longer
    /// has `expected_version`. Returns the new version.
    pub fn commit_transition(
        &self,
        phone: &str,
        expected_version: u64,
        next_state: IntakeState,
        field: Option<&CollectedField>,
    ) -> DbResult<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        check_version(&tx, phone, expected_version)?;

        let new_version = expected_version + 1;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO conversations (phone, conversation_state, version, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(phone) DO UPDATE SET
                conversation_state = excluded.conversation_state,
                version = excluded.version,
                updated_at = excluded.updated_at",
            params![phone, next_state.as_wire_str(), to_db_version(new_version), now],
        )?;

        // A restart must not inherit answers from an unreadable state
        if next_state == IntakeState::AwaitingPlz {
            tx.execute(
                "UPDATE conversations SET plz = NULL, kwh = NULL, photo_received = NULL
                 WHERE phone = ?1",
                params![phone],
            )?;
        }

        match field {
            Some(CollectedField::PostalCode(plz)) => {
                tx.execute(
                    "UPDATE conversations SET plz = ?2 WHERE phone = ?1",
                    params![phone, plz],
                )?;
            }
            Some(CollectedField::EnergyKwh(kwh)) => {
                tx.execute(
                    "UPDATE conversations SET kwh = ?2 WHERE phone = ?1",
                    params![phone, kwh],
                )?;
            }
            Some(CollectedField::PhotoReceived) => {
                tx.execute(
                    "UPDATE conversations SET photo_received = 1 WHERE phone = ?1",
                    params![phone],
                )?;
            }
            None => {}
        }

        tx.commit()?;
        Ok(new_version)
    }

    /// Mark a phone as opted out, creating its row if needed.
    ///
    /// Same version check as [`Self::commit_transition`]; the state column is
    /// left as it was. Returns the new version.
    pub fn opt_out(&self, phone: &str, expected_version: u64) -> DbResult<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        check_version(&tx, phone, expected_version)?;

        let new_version = expected_version + 1;
        tx.execute(
            "INSERT INTO conversations (phone, conversation_state, opted_out, version, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4)
             ON CONFLICT(phone) DO UPDATE SET
                opted_out = 1,
                version = excluded.version,
                updated_at = excluded.updated_at",
            params![
                phone,
                IntakeState::Initial.as_wire_str(),
                to_db_version(new_version),
                Utc::now().to_rfc3339()
            ],
        )?;

        tx.commit()?;
        Ok(new_version)
    }

    /// Overwrite the raw state column (for tests exercising bad data)
    #[cfg(test)]
    pub fn set_raw_state(&self, phone: &str, raw_state: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversations (phone, conversation_state, version, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(phone) DO UPDATE SET conversation_state = excluded.conversation_state",
            params![phone, raw_state, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn check_version(tx: &Transaction<'_>, phone: &str, expected: u64) -> DbResult<()> {
    let found = tx
        .query_row(
            "SELECT version FROM conversations WHERE phone = ?1",
            params![phone],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map_or(0, from_db_version);

    if found == expected {
        Ok(())
    } else {
        Err(DbError::VersionConflict {
            phone: phone.to_string(),
            expected,
            found,
        })
    }
}

/// Unknown stored states restart the conversation instead of failing it.
fn parse_state(phone: &str, raw: &str) -> IntakeState {
    IntakeState::from_wire(raw).unwrap_or_else(|| {
        tracing::warn!(phone = %phone, stored = %raw, "Unrecognized conversation state, treating as initial");
        IntakeState::Initial
    })
}

fn to_db_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn from_db_version(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
