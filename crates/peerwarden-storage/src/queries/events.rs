// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business event log.

use chrono::{DateTime, Utc};
use peerwarden_core::{LogEvent, PeerwardenError};
use rusqlite::{Row, params};

use crate::database::{Database, from_sql_ts, map_tr_err, to_sql_ts};
use crate::queries::accounts::level_from_sql;

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<LogEvent> {
    let timestamp: String = row.get(0)?;
    let level: Option<String> = row.get(9)?;
    Ok(LogEvent {
        timestamp: from_sql_ts(0, &timestamp)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        client_name: row.get(3)?,
        command: row.get(4)?,
        exit_code: row.get(5)?,
        output: row.get(6)?,
        error: row.get(7)?,
        is_premium: row.get(8)?,
        user_level: level.map(|l| level_from_sql(9, &l)).transpose()?,
    })
}

pub async fn append(db: &Database, event: &LogEvent) -> Result<(), PeerwardenError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO event_log (timestamp, user_id, username, client_name, command, \
                 exit_code, output, error, is_premium, user_level) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    to_sql_ts(event.timestamp),
                    event.user_id,
                    event.username,
                    event.client_name,
                    event.command,
                    event.exit_code,
                    event.output,
                    event.error,
                    event.is_premium,
                    event.user_level.map(|l| l.to_string()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// `user_filter` matches a numeric user id or a username (with or without `@`).
pub async fn recent(
    db: &Database,
    limit: usize,
    user_filter: Option<&str>,
) -> Result<Vec<LogEvent>, PeerwardenError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let filter = user_filter.map(|f| f.trim().trim_start_matches('@').to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, user_id, username, client_name, command, exit_code, output, \
                 error, is_premium, user_level FROM event_log \
                 WHERE ?1 IS NULL OR CAST(user_id AS TEXT) = ?1 OR LOWER(username) = LOWER(?1) \
                 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![filter, limit], event_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_older_than(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<u64, PeerwardenError> {
    let cutoff = to_sql_ts(cutoff);
    let deleted = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM event_log WHERE timestamp < ?1", params![cutoff]))
        .await
        .map_err(map_tr_err)?;
    Ok(deleted as u64)
}
