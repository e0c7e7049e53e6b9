// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the persistence traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use peerwarden_config::model::StorageConfig;
use peerwarden_core::{
    Account, AccountRepository, AdapterType, BlocklistRepository, ConfigSource,
    EventLogRepository, Feedback, FeedbackCounts, FeedbackRepository, HealthStatus, LogEvent,
    PeerwardenError, PluginAdapter, StorageAdapter, UserLevel,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed store for accounts, feedback, bans, events and settings.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// call fails until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// The connection is not opened until [`StorageAdapter::initialize`].
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::from(db),
        }
    }

    fn db(&self) -> Result<&Database, PeerwardenError> {
        self.db.get().ok_or_else(|| PeerwardenError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), PeerwardenError> {
        if !self.config.wal_mode {
            return Ok(());
        }
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PeerwardenError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PeerwardenError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), PeerwardenError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| PeerwardenError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerwardenError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl AccountRepository for SqliteStore {
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Account>, PeerwardenError> {
        queries::accounts::get_by_user_id(self.db()?, user_id).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>, PeerwardenError> {
        queries::accounts::get_by_username(self.db()?, username).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Account>, PeerwardenError> {
        queries::accounts::search(self.db()?, query).await
    }

    async fn register(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
    ) -> Result<(), PeerwardenError> {
        queries::accounts::register(self.db()?, user_id, username).await
    }

    async fn update_activity(&self, id: i64) -> Result<(), PeerwardenError> {
        queries::accounts::update_activity(self.db()?, id).await
    }

    async fn mark_tombstoned(&self, id: i64) -> Result<(), PeerwardenError> {
        queries::accounts::mark_tombstoned(self.db()?, id).await
    }

    async fn list_all(&self) -> Result<Vec<Account>, PeerwardenError> {
        queries::accounts::list_all(self.db()?).await
    }

    async fn list_by_level(
        &self,
        level: UserLevel,
        limit: usize,
    ) -> Result<Vec<Account>, PeerwardenError> {
        queries::accounts::list_by_level(self.db()?, level, limit).await
    }

    async fn count_by_level(&self) -> Result<Vec<(UserLevel, u64)>, PeerwardenError> {
        queries::accounts::count_by_level(self.db()?).await
    }

    async fn set_level(&self, user_id: i64, level: UserLevel) -> Result<(), PeerwardenError> {
        queries::accounts::set_level(self.db()?, user_id, level).await
    }

    async fn set_premium(
        &self,
        user_id: i64,
        expires_at: Option<DateTime<Utc>>,
        reason: &str,
    ) -> Result<(), PeerwardenError> {
        queries::accounts::set_premium(self.db()?, user_id, expires_at, reason).await
    }
}

#[async_trait]
impl FeedbackRepository for SqliteStore {
    async fn save(&self, user_id: i64, message: &str) -> Result<i64, PeerwardenError> {
        queries::feedback::save(self.db()?, user_id, message).await
    }

    async fn get(&self, id: i64) -> Result<Option<Feedback>, PeerwardenError> {
        queries::feedback::get(self.db()?, id).await
    }

    async fn latest_for_user(&self, user_id: i64) -> Result<Option<Feedback>, PeerwardenError> {
        queries::feedback::latest_for_user(self.db()?, user_id).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<Feedback>, PeerwardenError> {
        queries::feedback::list(self.db()?, limit).await
    }

    async fn respond(
        &self,
        id: i64,
        response: &str,
        responded_by: i64,
    ) -> Result<(), PeerwardenError> {
        queries::feedback::respond(self.db()?, id, response, responded_by).await
    }

    async fn counts(&self) -> Result<FeedbackCounts, PeerwardenError> {
        queries::feedback::counts(self.db()?).await
    }
}

#[async_trait]
impl BlocklistRepository for SqliteStore {
    async fn is_blocked(
        &self,
        user_id: i64,
        username: Option<&str>,
    ) -> Result<bool, PeerwardenError> {
        queries::blocklist::is_blocked(self.db()?, user_id, username).await
    }

    async fn block(&self, user_id: i64, reason: &str) -> Result<(), PeerwardenError> {
        queries::blocklist::block(self.db()?, user_id, reason).await
    }

    async fn unblock(&self, user_id: i64) -> Result<bool, PeerwardenError> {
        queries::blocklist::unblock(self.db()?, user_id).await
    }
}

#[async_trait]
impl EventLogRepository for SqliteStore {
    async fn append(&self, event: &LogEvent) -> Result<(), PeerwardenError> {
        queries::events::append(self.db()?, event).await
    }

    async fn recent(
        &self,
        limit: usize,
        user_filter: Option<&str>,
    ) -> Result<Vec<LogEvent>, PeerwardenError> {
        queries::events::recent(self.db()?, limit, user_filter).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, PeerwardenError> {
        queries::events::delete_older_than(self.db()?, cutoff).await
    }
}

#[async_trait]
impl ConfigSource for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PeerwardenError> {
        queries::settings::get(self.db()?, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PeerwardenError> {
        queries::settings::set(self.db()?, key, value).await
    }

    async fn list(&self) -> Result<Vec<(String, String)>, PeerwardenError> {
        queries::settings::list(self.db()?).await
    }
}
