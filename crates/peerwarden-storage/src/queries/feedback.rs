// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback queries. The author's username is joined in from `users`.

use chrono::Utc;
use peerwarden_core::{Feedback, FeedbackCounts, PeerwardenError};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, from_sql_ts, map_tr_err, opt_from_sql_ts, to_sql_ts};

const SELECT: &str = "SELECT f.id, f.user_id, u.username, f.message, f.response, \
                      f.responded_at, f.responded_by, f.created_at \
                      FROM feedback f LEFT JOIN users u ON u.user_id = f.user_id";

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    let created: String = row.get(7)?;
    Ok(Feedback {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        message: row.get(3)?,
        response: row.get(4)?,
        responded_at: opt_from_sql_ts(5, row.get(5)?)?,
        responded_by: row.get(6)?,
        created_at: from_sql_ts(7, &created)?,
    })
}

pub async fn save(db: &Database, user_id: i64, message: &str) -> Result<i64, PeerwardenError> {
    let message = message.to_string();
    let now = to_sql_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO feedback (user_id, message, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, message, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<Feedback>, PeerwardenError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(&format!("{SELECT} WHERE f.id = ?1"), params![id], feedback_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn latest_for_user(
    db: &Database,
    user_id: i64,
) -> Result<Option<Feedback>, PeerwardenError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT} WHERE f.user_id = ?1 ORDER BY f.id DESC LIMIT 1"),
                params![user_id],
                feedback_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list(db: &Database, limit: usize) -> Result<Vec<Feedback>, PeerwardenError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY f.id DESC LIMIT ?1"))?;
            let rows = stmt.query_map(params![limit], feedback_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn respond(
    db: &Database,
    id: i64,
    response: &str,
    responded_by: i64,
) -> Result<(), PeerwardenError> {
    let response = response.to_string();
    let now = to_sql_ts(Utc::now());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE feedback SET response = ?1, responded_at = ?2, responded_by = ?3, \
                 processed = 1 WHERE id = ?4",
                params![response, now, responded_by, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(PeerwardenError::NotFound(format!("feedback {id}")));
    }
    Ok(())
}

pub async fn counts(db: &Database) -> Result<FeedbackCounts, PeerwardenError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(processed = 0), 0) FROM feedback",
                [],
                |row| {
                    let total: i64 = row.get(0)?;
                    let pending: i64 = row.get(1)?;
                    Ok(FeedbackCounts {
                        total: total.max(0) as u64,
                        pending: pending.max(0) as u64,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}
