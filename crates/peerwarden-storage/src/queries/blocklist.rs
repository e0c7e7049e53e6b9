// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bans, stored as `user_level = 'ban'` on the account row.

use chrono::Utc;
use peerwarden_core::PeerwardenError;
use rusqlite::params;

use crate::database::{Database, map_tr_err, to_sql_ts};

/// Active when the ban has no expiry or it lies in the future. Accounts
/// without a user id are matched by username.
pub async fn is_blocked(
    db: &Database,
    user_id: i64,
    username: Option<&str>,
) -> Result<bool, PeerwardenError> {
    let username = username.map(str::to_string);
    let now = to_sql_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM users \
                 WHERE user_level = 'ban' \
                   AND (premium_expires_at IS NULL OR premium_expires_at > ?3) \
                   AND (user_id = ?1 \
                        OR (user_id IS NULL AND ?2 IS NOT NULL AND LOWER(username) = LOWER(?2))))",
                params![user_id, username, now],
                |row| row.get::<_, bool>(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Bans indefinitely, creating the account row if needed.
pub async fn block(db: &Database, user_id: i64, reason: &str) -> Result<(), PeerwardenError> {
    let reason = reason.to_string();
    let now = to_sql_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, user_level, premium_reason, created_at, updated_at) \
                 VALUES (?1, 'ban', ?2, ?3, ?3) \
                 ON CONFLICT(user_id) DO UPDATE SET \
                    user_level = 'ban', premium_expires_at = NULL, premium_reason = excluded.premium_reason",
                params![user_id, reason, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn unblock(db: &Database, user_id: i64) -> Result<bool, PeerwardenError> {
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET user_level = 'basic', premium_expires_at = NULL, premium_reason = NULL \
                 WHERE user_id = ?1 AND user_level = 'ban'",
                params![user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}
