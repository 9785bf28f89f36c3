//! SQLite storage for the date index, per-source aggregates and processed markers.
//!
//! Tables:
//! - `date_index(id, date UNIQUE)` - shared date identity, insert-ignore
//! - `nyc_crashes`, `chicago_crashes` - one row per date, insert-replace
//! - `nyc_weather`, `chicago_weather` - one row per date, insert-replace
//! - `processed_markers(date_index_id, source)` - ledger of committed pairs, insert-ignore

pub mod joined;
pub mod ledger;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub use joined::{JoinMode, JoinedDay};
pub use ledger::{DateId, DateLedger};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS date_index (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS nyc_crashes (
        date_index_id INTEGER PRIMARY KEY REFERENCES date_index(id),
        total_crashes INTEGER NOT NULL,
        total_injuries INTEGER NOT NULL,
        total_fatalities INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chicago_crashes (
        date_index_id INTEGER PRIMARY KEY REFERENCES date_index(id),
        total_crashes INTEGER NOT NULL,
        total_injuries INTEGER NOT NULL,
        total_fatalities INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS nyc_weather (
        date_index_id INTEGER PRIMARY KEY REFERENCES date_index(id),
        observations INTEGER NOT NULL,
        precip_mm REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chicago_weather (
        date_index_id INTEGER PRIMARY KEY REFERENCES date_index(id),
        observations INTEGER NOT NULL,
        precip_mm REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS processed_markers (
        date_index_id INTEGER NOT NULL REFERENCES date_index(id),
        source TEXT NOT NULL,
        committed_at TEXT NOT NULL,
        PRIMARY KEY (date_index_id, source)
    );
"#;

const TABLES: [&str; 6] = [
    "processed_markers",
    "nyc_crashes",
    "chicago_crashes",
    "nyc_weather",
    "chicago_weather",
    "date_index",
];

/// Owns the one connection the pipeline writes through.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)
            .context("failed to create schema")?;

        Ok(Store { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Drops every table and recreates an empty schema.
    pub fn reset(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in TABLES {
            tx.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
        }
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
