// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user, per-command cooldowns.
//!
//! The limited command set and the cooldown are read from the current
//! settings snapshot on every check, so runtime changes apply immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use peerwarden_config::SettingsHandle;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

fn sweep_age() -> TimeDelta {
    TimeDelta::hours(24)
}

#[derive(Debug, Default)]
struct UserLimits {
    last_command: HashMap<String, DateTime<Utc>>,
    /// Read by the sweep. Nothing assigns it, so every entry looks stale.
    last_create_time: Option<DateTime<Utc>>,
}

/// Tracks the last allowed invocation of each limited command per user.
///
/// The map lock only guards entry creation. Checking and stamping a
/// timestamp happens under the user's own lock.
pub struct RateLimiter {
    settings: SettingsHandle,
    users: RwLock<HashMap<i64, Arc<Mutex<UserLimits>>>>,
}

impl RateLimiter {
    pub fn new(settings: SettingsHandle) -> Self {
        Self {
            settings,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `user_id` may run `command` now. An allowed check stamps the
    /// time; a denied one changes nothing.
    pub async fn can_execute(&self, user_id: i64, command: &str) -> bool {
        self.can_execute_at(user_id, command, Utc::now()).await
    }

    /// [`can_execute`](Self::can_execute) evaluated at `now`.
    pub async fn can_execute_at(&self, user_id: i64, command: &str, now: DateTime<Utc>) -> bool {
        let settings = self.settings.load();
        if !settings.is_rate_limited(command) {
            return true;
        }
        let cooldown = TimeDelta::from_std(settings.rate_limit_interval).unwrap_or(TimeDelta::MAX);
        let key = command.trim_start_matches('/').to_ascii_lowercase();

        let entry = self.entry(user_id).await;
        let mut limits = entry.lock().await;
        if let Some(last) = limits.last_command.get(&key) {
            if now.signed_duration_since(*last) < cooldown {
                debug!(user_id, command = %key, "rate limited");
                return false;
            }
        }
        limits.last_command.insert(key, now);
        true
    }

    async fn entry(&self, user_id: i64) -> Arc<Mutex<UserLimits>> {
        if let Some(entry) = self.users.read().await.get(&user_id) {
            return Arc::clone(entry);
        }
        Arc::clone(self.users.write().await.entry(user_id).or_default())
    }

    /// Drop entries whose last create time is older than a day.
    ///
    /// An entry without a create time is treated as created at the epoch,
    /// which makes every current entry eligible.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut stale = Vec::new();
        for (user_id, entry) in self.users.read().await.iter() {
            let last = entry
                .lock()
                .await
                .last_create_time
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            if now.signed_duration_since(last) > sweep_age() {
                stale.push(*user_id);
            }
        }

        let mut users = self.users.write().await;
        for user_id in &stale {
            users.remove(user_id);
        }
        stale.len()
    }

    /// Number of users with an entry.
    pub async fn tracked_users(&self) -> usize {
        self.users.read().await.len()
    }

    /// Run the daily sweep until cancelled.
    pub async fn run_sweeper(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        // Skip the immediate first tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = self.sweep_at(Utc::now()).await;
                    info!(removed, "rate limit entries swept");
                }
                _ = cancel.cancelled() => {
                    debug!("rate limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerwarden_config::{PeerwardenConfig, RuntimeSettings};
    use proptest::prelude::*;

    fn limiter(minutes: u64, commands: &[&str]) -> RateLimiter {
        let mut settings = RuntimeSettings::from_config(&PeerwardenConfig::default());
        settings.rate_limit_interval = Duration::from_secs(minutes * 60);
        settings.rate_limited_commands = commands.iter().map(|c| c.to_string()).collect();
        RateLimiter::new(settings.into_handle())
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn cooldown_denies_then_allows() {
        let limiter = limiter(1, &["create"]);
        assert!(limiter.can_execute_at(1, "create", at(0)).await);
        assert!(!limiter.can_execute_at(1, "create", at(30)).await);
        assert!(limiter.can_execute_at(1, "create", at(61)).await);
    }

    #[tokio::test]
    async fn denied_check_does_not_reset_clock() {
        let limiter = limiter(1, &["create"]);
        assert!(limiter.can_execute_at(1, "create", at(0)).await);
        assert!(!limiter.can_execute_at(1, "create", at(59)).await);
        assert!(limiter.can_execute_at(1, "create", at(60)).await);
    }

    #[tokio::test]
    async fn unlimited_commands_and_other_users_are_independent() {
        let limiter = limiter(1, &["create"]);
        assert!(limiter.can_execute_at(1, "create", at(0)).await);
        assert!(limiter.can_execute_at(2, "create", at(1)).await);
        assert!(limiter.can_execute_at(1, "stat", at(2)).await);
        assert!(limiter.can_execute_at(1, "stat", at(3)).await);
        // Unlimited commands leave no entry behind.
        assert_eq!(limiter.tracked_users().await, 2);
    }

    #[tokio::test]
    async fn settings_are_read_on_every_call() {
        let limiter = limiter(1, &["create"]);
        assert!(limiter.can_execute_at(1, "create", at(0)).await);

        let mut next = (**limiter.settings.load()).clone();
        next.rate_limit_interval = Duration::from_secs(120);
        limiter.settings.store(Arc::new(next));
        assert!(!limiter.can_execute_at(1, "create", at(61)).await);

        let mut next = (**limiter.settings.load()).clone();
        next.rate_limited_commands.clear();
        limiter.settings.store(Arc::new(next));
        assert!(limiter.can_execute_at(1, "create", at(62)).await);
    }

    #[tokio::test]
    async fn command_names_are_normalized() {
        let limiter = limiter(1, &["create"]);
        assert!(limiter.can_execute_at(1, "/create", at(0)).await);
        assert!(!limiter.can_execute_at(1, "CREATE", at(1)).await);
    }

    #[tokio::test]
    async fn sweep_removes_every_entry() {
        let limiter = limiter(1, &["create"]);
        let now = Utc::now();
        assert!(limiter.can_execute_at(1, "create", now).await);
        assert!(limiter.can_execute_at(2, "create", now).await);

        // Entries touched a moment ago still go: the create time is never set.
        assert_eq!(limiter.sweep_at(now).await, 2);
        assert_eq!(limiter.tracked_users().await, 0);
        assert!(limiter.can_execute_at(1, "create", now).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_cancel() {
        let limiter = Arc::new(limiter(1, &["create"]));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&limiter).run_sweeper(cancel.clone()));
        cancel.cancel();
        task.await.unwrap();
    }

    proptest! {
        #[test]
        fn gap_below_cooldown_yields_one_allow(cooldown_min in 1u64..60, gap in 0i64..3600) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let limiter = limiter(cooldown_min, &["create"]);
            let cooldown = (cooldown_min * 60) as i64;
            let (first, second) = rt.block_on(async {
                (
                    limiter.can_execute_at(9, "create", at(0)).await,
                    limiter.can_execute_at(9, "create", at(gap)).await,
                )
            });
            prop_assert!(first);
            prop_assert_eq!(second, gap >= cooldown);
        }
    }
}
