// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits.
//!
//! Lookups return `Ok(None)` for missing rows; `Err` is reserved for
//! backend failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PeerwardenError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Account, Feedback, LogEvent, UserLevel};

/// Lifecycle of a storage backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), PeerwardenError>;

    /// Closes the backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), PeerwardenError>;
}

/// Accounts keyed by chat user id, username, and storage row id.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Account>, PeerwardenError>;

    /// Case-insensitive exact match.
    async fn get_by_username(&self, username: &str) -> Result<Option<Account>, PeerwardenError>;

    /// Substring match on username or numeric id, ordered by user id.
    async fn search(&self, query: &str) -> Result<Vec<Account>, PeerwardenError>;

    /// Creates the account if missing. With a user id, an existing row gets
    /// its username refreshed. Without one, the username must be new.
    async fn register(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
    ) -> Result<(), PeerwardenError>;

    /// Sets `updated_at` to now. `id` is the storage row id.
    async fn update_activity(&self, id: i64) -> Result<(), PeerwardenError>;

    /// Sets `updated_at` to [`crate::TOMBSTONE`].
    async fn mark_tombstoned(&self, id: i64) -> Result<(), PeerwardenError>;

    async fn list_all(&self) -> Result<Vec<Account>, PeerwardenError>;

    async fn list_by_level(
        &self,
        level: UserLevel,
        limit: usize,
    ) -> Result<Vec<Account>, PeerwardenError>;

    async fn count_by_level(&self) -> Result<Vec<(UserLevel, u64)>, PeerwardenError>;

    async fn set_level(&self, user_id: i64, level: UserLevel) -> Result<(), PeerwardenError>;

    /// Updates expiry and reason without touching the level.
    async fn set_premium(
        &self,
        user_id: i64,
        expires_at: Option<DateTime<Utc>>,
        reason: &str,
    ) -> Result<(), PeerwardenError>;

    /// Unknown users hold no privilege.
    async fn has_privilege(
        &self,
        user_id: i64,
        required: UserLevel,
    ) -> Result<bool, PeerwardenError> {
        Ok(self
            .get_by_user_id(user_id)
            .await?
            .is_some_and(|acc| acc.has_privilege(required, Utc::now())))
    }

    async fn is_premium(&self, user_id: i64) -> Result<bool, PeerwardenError> {
        Ok(self
            .get_by_user_id(user_id)
            .await?
            .is_some_and(|acc| acc.is_premium_at(Utc::now())))
    }

    /// Moderators and admins, for feedback notifications.
    async fn list_staff(&self) -> Result<Vec<Account>, PeerwardenError> {
        let mut staff = self.list_by_level(UserLevel::Admin, usize::MAX).await?;
        staff.extend(self.list_by_level(UserLevel::Moderator, usize::MAX).await?);
        Ok(staff)
    }
}

/// Totals shown by the admin `/stats` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub total: u64,
    pub pending: u64,
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Stores a new entry and returns its id.
    async fn save(&self, user_id: i64, message: &str) -> Result<i64, PeerwardenError>;

    async fn get(&self, id: i64) -> Result<Option<Feedback>, PeerwardenError>;

    async fn latest_for_user(&self, user_id: i64) -> Result<Option<Feedback>, PeerwardenError>;

    /// Newest first.
    async fn list(&self, limit: usize) -> Result<Vec<Feedback>, PeerwardenError>;

    /// Records the staff response and marks the entry processed.
    async fn respond(
        &self,
        id: i64,
        response: &str,
        responded_by: i64,
    ) -> Result<(), PeerwardenError>;

    async fn counts(&self) -> Result<FeedbackCounts, PeerwardenError>;
}

/// Bans are stored as the `ban` level with an optional expiry.
#[async_trait]
pub trait BlocklistRepository: Send + Sync {
    /// Matches by user id, or by username for accounts without one.
    async fn is_blocked(
        &self,
        user_id: i64,
        username: Option<&str>,
    ) -> Result<bool, PeerwardenError>;

    async fn block(&self, user_id: i64, reason: &str) -> Result<(), PeerwardenError>;

    /// Returns `false` when the user was not banned.
    async fn unblock(&self, user_id: i64) -> Result<bool, PeerwardenError>;
}

#[async_trait]
pub trait EventLogRepository: Send + Sync {
    async fn append(&self, event: &LogEvent) -> Result<(), PeerwardenError>;

    /// Newest first, optionally filtered by user id or username.
    async fn recent(
        &self,
        limit: usize,
        user_filter: Option<&str>,
    ) -> Result<Vec<LogEvent>, PeerwardenError>;

    /// Returns the number of deleted events.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, PeerwardenError>;
}

/// Runtime key/value settings.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PeerwardenError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), PeerwardenError>;

    async fn list(&self) -> Result<Vec<(String, String)>, PeerwardenError>;

    /// `None` when missing or not an integer.
    async fn get_int(&self, key: &str) -> Result<Option<i64>, PeerwardenError> {
        Ok(self.get(key).await?.and_then(|v| v.trim().parse().ok()))
    }

    /// Accepts `true/false`, `1/0`, `yes/no`.
    async fn get_bool(&self, key: &str) -> Result<Option<bool>, PeerwardenError> {
        Ok(self
            .get(key)
            .await?
            .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            }))
    }
}
