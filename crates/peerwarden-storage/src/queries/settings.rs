// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings key/value table.

use chrono::Utc;
use peerwarden_core::PeerwardenError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, to_sql_ts};

pub async fn get(db: &Database, key: &str) -> Result<Option<String>, PeerwardenError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set(db: &Database, key: &str, value: &str) -> Result<(), PeerwardenError> {
    let key = key.to_string();
    let value = value.to_string();
    let now = to_sql_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list(db: &Database) -> Result<Vec<(String, String)>, PeerwardenError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_overwrites_and_list_is_sorted() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get(&db, "max_clients").await.unwrap().is_none());

        set(&db, "max_clients", "10").await.unwrap();
        set(&db, "max_clients", "20").await.unwrap();
        set(&db, "restrict_new_users", "true").await.unwrap();

        assert_eq!(get(&db, "max_clients").await.unwrap().as_deref(), Some("20"));
        assert_eq!(
            list(&db).await.unwrap(),
            vec![
                ("max_clients".to_string(), "20".to_string()),
                ("restrict_new_users".to_string(), "true".to_string()),
            ]
        );
    }
}
