// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations, and the
//! timestamp encoding shared by every query module.
//!
//! All statements run on tokio-rusqlite's single background thread, so the
//! [`Database`] handle is the only writer. Do not open extra connections.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use peerwarden_core::PeerwardenError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Timestamps are stored as UTC text in SQLite's own `datetime()` format so
/// SQL comparisons against `datetime('now')` work lexically.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a tokio-rusqlite error into `PeerwardenError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> PeerwardenError {
    PeerwardenError::Storage {
        source: Box::new(e),
    }
}

pub(crate) fn to_sql_ts(dt: DateTime<Utc>) -> String {
    dt.format(TS_FORMAT).to_string()
}

pub(crate) fn from_sql_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn opt_from_sql_ts(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| from_sql_ts(idx, &s)).transpose()
}

/// Handle to the migrated SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, PeerwardenError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(PeerwardenError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(PeerwardenError::storage)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path, "database opened");
        Ok(db)
    }

    /// A private in-memory database with the full schema. Used by tests.
    pub async fn open_in_memory() -> Result<Self, PeerwardenError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(PeerwardenError::storage)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), PeerwardenError> {
        let applied = self
            .conn
            .call(move |conn| {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                // Migration errors travel in the Ok value: the closure's error
                // type is fixed to rusqlite::Error.
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)??;
        debug!(applied, "migrations complete");
        Ok(())
    }

    /// The underlying connection, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use peerwarden_core::TOMBSTONE;

    #[test]
    fn timestamps_use_sqlite_datetime_format() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(to_sql_ts(dt), "2026-03-09 14:05:07");
        assert_eq!(from_sql_ts(0, "2026-03-09 14:05:07").unwrap(), dt);
        assert_eq!(to_sql_ts(TOMBSTONE), "1970-01-01 00:00:00");
    }

    #[test]
    fn malformed_timestamp_is_a_conversion_error() {
        assert!(matches!(
            from_sql_ts(3, "yesterday"),
            Err(rusqlite::Error::FromSqlConversionFailure(3, _, _))
        ));
    }

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("peerwarden.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                     AND name != 'refinery_schema_history' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["event_log", "feedback", "settings", "users"]);
    }

    #[tokio::test]
    async fn reopening_does_not_reapply_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path, false).await.unwrap());
        assert!(Database::open(path, false).await.is_ok());
    }
}
