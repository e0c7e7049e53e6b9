// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory repositories.
//!
//! Each mock follows the SQLite adapter's observable behavior closely
//! enough for handler and watchdog tests, and can be switched into a
//! failing mode to exercise the degraded paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use peerwarden_core::{
    Account, AccountRepository, BlocklistRepository, ConfigSource, EventLogRepository, Feedback,
    FeedbackCounts, FeedbackRepository, LogEvent, PeerwardenError, TOMBSTONE, UserLevel,
};

fn unavailable(what: &str) -> PeerwardenError {
    PeerwardenError::storage(std::io::Error::other(format!("{what} unavailable")))
}

// --- accounts ---

#[derive(Default)]
pub struct MockAccounts {
    rows: Mutex<Vec<Account>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    failing_registrations: Mutex<HashSet<String>>,
    register_calls: AtomicUsize,
}

impl MockAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly and return its row id.
    pub async fn insert(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        level: UserLevel,
    ) -> i64 {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.lock().await.push(Account {
            id,
            user_id,
            username: username.map(str::to_string),
            level,
            premium_expires_at: None,
            premium_reason: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Apply `f` to the row with this row id.
    pub async fn update(&self, id: i64, f: impl FnOnce(&mut Account)) {
        if let Some(acc) = self.rows.lock().await.iter_mut().find(|a| a.id == id) {
            f(acc);
        }
    }

    pub async fn get(&self, id: i64) -> Option<Account> {
        self.rows.lock().await.iter().find(|a| a.id == id).cloned()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Fail every call.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail `register` for this username only.
    pub async fn fail_registration_of(&self, username: &str) {
        self.failing_registrations
            .lock()
            .await
            .insert(username.to_lowercase());
    }

    fn check(&self) -> Result<(), PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("accounts"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for MockAccounts {
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Account>, PeerwardenError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|a| a.user_id == Some(user_id))
            .cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>, PeerwardenError> {
        self.check()?;
        let rows = self.rows.lock().await;
        let mut matches: Vec<&Account> = rows
            .iter()
            .filter(|a| {
                a.username
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(username))
            })
            .collect();
        matches.sort_by_key(|a| (a.user_id.is_none(), a.id));
        Ok(matches.first().map(|a| (*a).clone()))
    }

    async fn search(&self, query: &str) -> Result<Vec<Account>, PeerwardenError> {
        self.check()?;
        let needle = query.to_lowercase();
        let mut found: Vec<Account> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|a| {
                a.username
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
                    || a.user_id.is_some_and(|id| id.to_string().contains(&needle))
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.user_id);
        Ok(found)
    }

    async fn register(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
    ) -> Result<(), PeerwardenError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if let Some(name) = username {
            if self
                .failing_registrations
                .lock()
                .await
                .contains(&name.to_lowercase())
            {
                return Err(unavailable("registration"));
            }
        }

        let mut rows = self.rows.lock().await;
        let now = Utc::now();
        match user_id {
            Some(id) => {
                if let Some(acc) = rows.iter_mut().find(|a| a.user_id == Some(id)) {
                    if acc.username.as_deref() != username {
                        acc.username = username.map(str::to_string);
                        acc.updated_at = now;
                    }
                    return Ok(());
                }
            }
            None => {
                if rows
                    .iter()
                    .any(|a| a.user_id.is_none() && a.username.as_deref() == username)
                {
                    return Ok(());
                }
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        rows.push(Account {
            id,
            user_id,
            username: username.map(str::to_string),
            level: UserLevel::Basic,
            premium_expires_at: None,
            premium_reason: None,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn update_activity(&self, id: i64) -> Result<(), PeerwardenError> {
        self.check()?;
        self.update(id, |a| a.updated_at = Utc::now()).await;
        Ok(())
    }

    async fn mark_tombstoned(&self, id: i64) -> Result<(), PeerwardenError> {
        self.check()?;
        self.update(id, |a| a.updated_at = TOMBSTONE).await;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Account>, PeerwardenError> {
        self.check()?;
        Ok(self.rows.lock().await.clone())
    }

    async fn list_by_level(
        &self,
        level: UserLevel,
        limit: usize,
    ) -> Result<Vec<Account>, PeerwardenError> {
        self.check()?;
        let mut found: Vec<Account> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|a| a.level == level)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }

    async fn count_by_level(&self) -> Result<Vec<(UserLevel, u64)>, PeerwardenError> {
        self.check()?;
        let mut counts: BTreeMap<String, (UserLevel, u64)> = BTreeMap::new();
        for acc in self.rows.lock().await.iter() {
            counts
                .entry(acc.level.to_string())
                .or_insert((acc.level, 0))
                .1 += 1;
        }
        Ok(counts.into_values().collect())
    }

    async fn set_level(&self, user_id: i64, level: UserLevel) -> Result<(), PeerwardenError> {
        self.check()?;
        let mut rows = self.rows.lock().await;
        let acc = rows
            .iter_mut()
            .find(|a| a.user_id == Some(user_id))
            .ok_or_else(|| PeerwardenError::NotFound(format!("user {user_id}")))?;
        acc.level = level;
        Ok(())
    }

    async fn set_premium(
        &self,
        user_id: i64,
        expires_at: Option<DateTime<Utc>>,
        reason: &str,
    ) -> Result<(), PeerwardenError> {
        self.check()?;
        let mut rows = self.rows.lock().await;
        let acc = rows
            .iter_mut()
            .find(|a| a.user_id == Some(user_id))
            .ok_or_else(|| PeerwardenError::NotFound(format!("user {user_id}")))?;
        acc.premium_expires_at = expires_at;
        acc.premium_reason = Some(reason.to_string());
        Ok(())
    }
}

// --- feedback ---

#[derive(Default)]
pub struct MockFeedback {
    rows: Mutex<Vec<Feedback>>,
    next_id: AtomicI64,
}

impl MockFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert feedback with a known author username.
    pub async fn insert(&self, user_id: i64, username: Option<&str>, message: &str) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.lock().await.push(Feedback {
            id,
            user_id,
            username: username.map(str::to_string),
            message: message.to_string(),
            response: None,
            responded_at: None,
            responded_by: None,
            created_at: Utc::now(),
        });
        id
    }

    pub async fn all(&self) -> Vec<Feedback> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl FeedbackRepository for MockFeedback {
    async fn save(&self, user_id: i64, message: &str) -> Result<i64, PeerwardenError> {
        Ok(self.insert(user_id, None, message).await)
    }

    async fn get(&self, id: i64) -> Result<Option<Feedback>, PeerwardenError> {
        Ok(self.rows.lock().await.iter().find(|f| f.id == id).cloned())
    }

    async fn latest_for_user(&self, user_id: i64) -> Result<Option<Feedback>, PeerwardenError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .rev()
            .find(|f| f.user_id == user_id)
            .cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Feedback>, PeerwardenError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn respond(
        &self,
        id: i64,
        response: &str,
        responded_by: i64,
    ) -> Result<(), PeerwardenError> {
        let mut rows = self.rows.lock().await;
        let fb = rows
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| PeerwardenError::NotFound(format!("feedback {id}")))?;
        fb.response = Some(response.to_string());
        fb.responded_at = Some(Utc::now());
        fb.responded_by = Some(responded_by);
        Ok(())
    }

    async fn counts(&self) -> Result<FeedbackCounts, PeerwardenError> {
        let rows = self.rows.lock().await;
        Ok(FeedbackCounts {
            total: rows.len() as u64,
            pending: rows.iter().filter(|f| !f.is_processed()).count() as u64,
        })
    }
}

// --- blocklist ---

#[derive(Default)]
pub struct MockBlocklist {
    blocked: Mutex<HashMap<i64, String>>,
    failing: AtomicBool,
}

impl MockBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn reason(&self, user_id: i64) -> Option<String> {
        self.blocked.lock().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl BlocklistRepository for MockBlocklist {
    async fn is_blocked(
        &self,
        user_id: i64,
        _username: Option<&str>,
    ) -> Result<bool, PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("blocklist"));
        }
        Ok(self.blocked.lock().await.contains_key(&user_id))
    }

    async fn block(&self, user_id: i64, reason: &str) -> Result<(), PeerwardenError> {
        self.blocked.lock().await.insert(user_id, reason.to_string());
        Ok(())
    }

    async fn unblock(&self, user_id: i64) -> Result<bool, PeerwardenError> {
        Ok(self.blocked.lock().await.remove(&user_id).is_some())
    }
}

// --- event log ---

#[derive(Default)]
pub struct MockEvents {
    events: Mutex<Vec<LogEvent>>,
    failing: AtomicBool,
    append_calls: AtomicUsize,
}

impl MockEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    pub async fn stored(&self) -> Vec<LogEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventLogRepository for MockEvents {
    async fn append(&self, event: &LogEvent) -> Result<(), PeerwardenError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("event log"));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn recent(
        &self,
        limit: usize,
        user_filter: Option<&str>,
    ) -> Result<Vec<LogEvent>, PeerwardenError> {
        let filter = user_filter.map(|f| f.trim_start_matches('@').to_lowercase());
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .rev()
            .filter(|e| match &filter {
                None => true,
                Some(f) => {
                    e.username.as_deref().is_some_and(|n| n.to_lowercase() == *f)
                        || e.user_id.is_some_and(|id| id.to_string() == *f)
                }
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, PeerwardenError> {
        let mut events = self.events.lock().await;
        let before = events.len();
        events.retain(|e| e.timestamp >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

// --- runtime settings ---

#[derive(Default)]
pub struct MockConfigSource {
    values: Mutex<BTreeMap<String, String>>,
    failing: AtomicBool,
}

impl MockConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with(pairs: &[(&str, &str)]) -> Self {
        let source = Self::new();
        for (k, v) in pairs {
            source.values.lock().await.insert(k.to_string(), v.to_string());
        }
        source
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigSource for MockConfigSource {
    async fn get(&self, key: &str) -> Result<Option<String>, PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("settings"));
        }
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("settings"));
        }
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, String)>, PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("settings"));
        }
        Ok(self
            .values
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
