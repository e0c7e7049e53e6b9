// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account queries.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use peerwarden_core::{Account, PeerwardenError, TOMBSTONE, UserLevel};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, from_sql_ts, map_tr_err, opt_from_sql_ts, to_sql_ts};

const COLUMNS: &str =
    "id, user_id, username, user_level, premium_expires_at, premium_reason, created_at, updated_at";

pub(crate) fn level_from_sql(idx: usize, raw: &str) -> rusqlite::Result<UserLevel> {
    UserLevel::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let level: String = row.get(3)?;
    let created: String = row.get(6)?;
    let updated: String = row.get(7)?;
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        level: level_from_sql(3, &level)?,
        premium_expires_at: opt_from_sql_ts(4, row.get(4)?)?,
        premium_reason: row.get(5)?,
        created_at: from_sql_ts(6, &created)?,
        updated_at: from_sql_ts(7, &updated)?,
    })
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

pub async fn get_by_user_id(db: &Database, user_id: i64) -> Result<Option<Account>, PeerwardenError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Case-insensitive; a chat-registered row wins over an orphan one.
pub async fn get_by_username(
    db: &Database,
    username: &str,
) -> Result<Option<Account>, PeerwardenError> {
    let username = username.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM users WHERE LOWER(username) = LOWER(?1) \
                     ORDER BY user_id IS NULL, id LIMIT 1"
                ),
                params![username],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn search(db: &Database, query: &str) -> Result<Vec<Account>, PeerwardenError> {
    let pattern = format!("%{}%", query.to_lowercase());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM users \
                 WHERE LOWER(username) LIKE ?1 \
                    OR (user_id IS NOT NULL AND CAST(user_id AS TEXT) LIKE ?1) \
                 ORDER BY user_id"
            ))?;
            let rows = stmt.query_map(params![pattern], account_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn register(
    db: &Database,
    user_id: Option<i64>,
    username: Option<&str>,
) -> Result<(), PeerwardenError> {
    let username = username.map(str::to_string);
    let now = to_sql_ts(Utc::now());
    db.connection()
        .call(move |conn| {
            match user_id {
                Some(id) => conn.execute(
                    "INSERT INTO users (user_id, username, user_level, created_at, updated_at) \
                     VALUES (?1, ?2, 'basic', ?3, ?3) \
                     ON CONFLICT(user_id) DO UPDATE SET \
                        username = excluded.username, updated_at = excluded.updated_at \
                     WHERE users.username IS NOT excluded.username",
                    params![id, username, now],
                )?,
                None => conn.execute(
                    "INSERT OR IGNORE INTO users (user_id, username, user_level, created_at, updated_at) \
                     VALUES (NULL, ?1, 'basic', ?2, ?2)",
                    params![username, now],
                )?,
            };
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

async fn set_updated_at(db: &Database, id: i64, at: DateTime<Utc>) -> Result<(), PeerwardenError> {
    let at = to_sql_ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET updated_at = ?1 WHERE id = ?2",
                params![at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_activity(db: &Database, id: i64) -> Result<(), PeerwardenError> {
    set_updated_at(db, id, Utc::now()).await
}

pub async fn mark_tombstoned(db: &Database, id: i64) -> Result<(), PeerwardenError> {
    set_updated_at(db, id, TOMBSTONE).await
}

pub async fn list_all(db: &Database) -> Result<Vec<Account>, PeerwardenError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM users ORDER BY id"))?;
            let rows = stmt.query_map([], account_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_by_level(
    db: &Database,
    level: UserLevel,
    limit: usize,
) -> Result<Vec<Account>, PeerwardenError> {
    let level = level.to_string();
    let limit = limit_param(limit);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM users WHERE user_level = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![level, limit], account_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_by_level(db: &Database) -> Result<Vec<(UserLevel, u64)>, PeerwardenError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_level, COUNT(*) FROM users GROUP BY user_level ORDER BY user_level",
            )?;
            let rows = stmt.query_map([], |row| {
                let level: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((level_from_sql(0, &level)?, count.max(0) as u64))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Errors with `NotFound` when no account has this user id.
pub async fn set_level(db: &Database, user_id: i64, level: UserLevel) -> Result<(), PeerwardenError> {
    let level = level.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET user_level = ?1 WHERE user_id = ?2",
                params![level, user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(PeerwardenError::NotFound(format!("user {user_id}")));
    }
    Ok(())
}

pub async fn set_premium(
    db: &Database,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
    reason: &str,
) -> Result<(), PeerwardenError> {
    let expires_at = expires_at.map(to_sql_ts);
    let reason = (!reason.is_empty()).then(|| reason.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET premium_expires_at = ?1, premium_reason = ?2 WHERE user_id = ?3",
                params![expires_at, reason, user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(PeerwardenError::NotFound(format!("user {user_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn register_with_id_refreshes_username() {
        let db = db().await;
        register(&db, Some(42), Some("alice")).await.unwrap();
        register(&db, Some(42), Some("alice_new")).await.unwrap();

        let acc = get_by_user_id(&db, 42).await.unwrap().unwrap();
        assert_eq!(acc.username.as_deref(), Some("alice_new"));
        assert_eq!(acc.level, UserLevel::Basic);
        assert_eq!(list_all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn register_without_id_is_idempotent() {
        let db = db().await;
        register(&db, None, Some("manual")).await.unwrap();
        register(&db, None, Some("Manual")).await.unwrap();

        let all = list_all(&db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, None);
    }

    #[tokio::test]
    async fn username_lookup_prefers_chat_account() {
        let db = db().await;
        register(&db, None, Some("bob")).await.unwrap();
        register(&db, Some(7), Some("Bob")).await.unwrap();

        let acc = get_by_username(&db, "bob").await.unwrap().unwrap();
        assert_eq!(acc.user_id, Some(7));
        assert!(get_by_username(&db, "carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_username_and_id() {
        let db = db().await;
        register(&db, Some(1001), Some("alice")).await.unwrap();
        register(&db, Some(2002), Some("malice")).await.unwrap();
        register(&db, Some(3003), Some("bob")).await.unwrap();

        let hits = search(&db, "ALIC").await.unwrap();
        assert_eq!(
            hits.iter().map(|a| a.user_id).collect::<Vec<_>>(),
            vec![Some(1001), Some(2002)]
        );
        assert_eq!(search(&db, "300").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tombstone_and_activity_use_row_id() {
        let db = db().await;
        register(&db, None, Some("orphan")).await.unwrap();
        let acc = get_by_username(&db, "orphan").await.unwrap().unwrap();

        mark_tombstoned(&db, acc.id).await.unwrap();
        let acc = get_by_username(&db, "orphan").await.unwrap().unwrap();
        assert!(acc.is_tombstoned());

        update_activity(&db, acc.id).await.unwrap();
        let acc = get_by_username(&db, "orphan").await.unwrap().unwrap();
        assert!(!acc.is_tombstoned());
    }

    #[tokio::test]
    async fn level_and_premium_are_independent() {
        let db = db().await;
        register(&db, Some(5), Some("eve")).await.unwrap();
        set_level(&db, 5, UserLevel::Ban).await.unwrap();
        let until = Utc::now() + Duration::days(3);
        set_premium(&db, 5, Some(until), "spam").await.unwrap();

        let acc = get_by_user_id(&db, 5).await.unwrap().unwrap();
        assert_eq!(acc.level, UserLevel::Ban);
        assert_eq!(acc.premium_reason.as_deref(), Some("spam"));
        assert_eq!(acc.premium_expires_at.map(|t| t.timestamp()), Some(until.timestamp()));

        assert!(set_level(&db, 99, UserLevel::Admin).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn counts_and_listing_by_level() {
        let db = db().await;
        for id in 1..=3 {
            register(&db, Some(id), Some(&format!("u{id}"))).await.unwrap();
        }
        set_level(&db, 2, UserLevel::Moderator).await.unwrap();

        let counts = count_by_level(&db).await.unwrap();
        assert!(counts.contains(&(UserLevel::Basic, 2)));
        assert!(counts.contains(&(UserLevel::Moderator, 1)));
        assert_eq!(list_by_level(&db, UserLevel::Basic, 1).await.unwrap().len(), 1);
        assert_eq!(list_by_level(&db, UserLevel::Moderator, usize::MAX).await.unwrap()[0].user_id, Some(2));
    }
}
