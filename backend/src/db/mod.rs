//! SQLite storage for rule sets.
//!
//! A single connection is opened at startup and shared behind a mutex, so
//! `:memory:` databases behave the same as files.

mod rule_sets;

use crate::error::ApiError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rule_sets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS rules (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_set_id          INTEGER NOT NULL REFERENCES rule_sets(id),
    rule_number          TEXT NOT NULL,
    rule_title           TEXT NOT NULL,
    rule_text            TEXT NOT NULL,
    category             TEXT,
    keywords             TEXT NOT NULL DEFAULT '[]',
    effective_start_date TEXT,
    effective_end_date   TEXT
);
CREATE INDEX IF NOT EXISTS idx_rules_rule_set ON rules(rule_set_id);
";

#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Ok(Db {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates any missing tables. Safe to run on every start.
    pub fn migrate(&self) -> Result<(), ApiError> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Internal("database mutex poisoned".to_string()))
    }
}

#[cfg(test)]
pub(crate) fn test_db() -> Db {
    let db = Db::open(":memory:").expect("open in-memory db");
    db.migrate().expect("migrate");
    db
}
