// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The runtime settings snapshot.
//!
//! [`RuntimeSettings`] is immutable. Readers take a cheap snapshot with
//! `handle.load()`; the reloader builds a fresh value and swaps it in, so a
//! reader never sees a half-updated snapshot.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use peerwarden_core::{ConfigSource, PeerwardenError};
use tracing::warn;

use crate::model::PeerwardenConfig;

/// Shared pointer to the current snapshot.
pub type SettingsHandle = Arc<ArcSwap<RuntimeSettings>>;

/// Keys of the runtime settings table.
pub mod keys {
    pub const SCRIPT_TIMEOUT_SECONDS: &str = "script_timeout_seconds";
    pub const WATCHDOG_ENABLED: &str = "watchdog_enabled";
    pub const WATCHDOG_CHECK_INTERVAL_MINUTES: &str = "watchdog_check_interval_minutes";
    pub const WATCHDOG_INACTIVE_THRESHOLD_MINUTES: &str = "watchdog_inactive_threshold_minutes";
    pub const MAX_TEST_DURATION_MINUTES: &str = "max_test_duration_minutes";
    pub const RESTRICT_NEW_USERS: &str = "restrict_new_users";
    pub const MAX_CLIENTS: &str = "max_clients";
    pub const RATE_LIMIT_INTERVAL_MINUTES: &str = "rate_limit_interval_minutes";
    pub const RATE_LIMITED_COMMANDS: &str = "rate_limited_commands";
    pub const CONFIG_RELOAD_INTERVAL_MINUTES: &str = "config_reload_interval_minutes";

    pub const ALL: &[&str] = &[
        SCRIPT_TIMEOUT_SECONDS,
        WATCHDOG_ENABLED,
        WATCHDOG_CHECK_INTERVAL_MINUTES,
        WATCHDOG_INACTIVE_THRESHOLD_MINUTES,
        MAX_TEST_DURATION_MINUTES,
        RESTRICT_NEW_USERS,
        MAX_CLIENTS,
        RATE_LIMIT_INTERVAL_MINUTES,
        RATE_LIMITED_COMMANDS,
        CONFIG_RELOAD_INTERVAL_MINUTES,
    ];
}

const MINUTE: u64 = 60;

/// Settings the bot reads while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub script_timeout: Duration,
    pub watchdog_enabled: bool,
    pub watchdog_interval: Duration,
    pub inactive_threshold: Duration,
    /// `Duration::ZERO` disables the hard lifetime.
    pub max_test_duration: Duration,
    pub restrict_new_users: bool,
    /// `0` means unlimited.
    pub max_clients: u32,
    pub rate_limit_interval: Duration,
    /// Lowercase command names without the leading slash.
    pub rate_limited_commands: Vec<String>,
    pub reload_interval: Duration,
}

impl RuntimeSettings {
    pub fn from_config(config: &PeerwardenConfig) -> Self {
        Self {
            script_timeout: Duration::from_secs(config.provisioning.script_timeout_secs),
            watchdog_enabled: config.watchdog.enabled,
            watchdog_interval: minutes(config.watchdog.check_interval_minutes),
            inactive_threshold: minutes(config.watchdog.inactive_threshold_minutes),
            max_test_duration: minutes(config.watchdog.max_test_duration_minutes),
            restrict_new_users: config.limits.restrict_new_users,
            max_clients: config.limits.max_clients,
            rate_limit_interval: minutes(config.limits.rate_limit_interval_minutes),
            rate_limited_commands: normalize_commands(
                config.limits.rate_limited_commands.iter().map(String::as_str),
            ),
            reload_interval: minutes(config.reload.interval_minutes),
        }
    }

    /// Returns a copy with every parsable override from `source` applied.
    ///
    /// Missing keys and values that do not parse (or would yield a zero
    /// interval) keep the current value.
    pub async fn with_overrides(
        &self,
        source: &dyn ConfigSource,
    ) -> Result<Self, PeerwardenError> {
        let mut next = self.clone();

        if let Some(secs) = positive(source, keys::SCRIPT_TIMEOUT_SECONDS).await? {
            next.script_timeout = Duration::from_secs(secs);
        }
        if let Some(enabled) = source.get_bool(keys::WATCHDOG_ENABLED).await? {
            next.watchdog_enabled = enabled;
        }
        if let Some(m) = positive(source, keys::WATCHDOG_CHECK_INTERVAL_MINUTES).await? {
            next.watchdog_interval = minutes(m);
        }
        if let Some(m) = positive(source, keys::WATCHDOG_INACTIVE_THRESHOLD_MINUTES).await? {
            next.inactive_threshold = minutes(m);
        }
        if let Some(m) = non_negative(source, keys::MAX_TEST_DURATION_MINUTES).await? {
            next.max_test_duration = minutes(m);
        }
        if let Some(restrict) = source.get_bool(keys::RESTRICT_NEW_USERS).await? {
            next.restrict_new_users = restrict;
        }
        if let Some(max) = non_negative(source, keys::MAX_CLIENTS).await? {
            next.max_clients = u32::try_from(max).unwrap_or(u32::MAX);
        }
        if let Some(m) = positive(source, keys::RATE_LIMIT_INTERVAL_MINUTES).await? {
            next.rate_limit_interval = minutes(m);
        }
        if let Some(list) = source.get(keys::RATE_LIMITED_COMMANDS).await? {
            next.rate_limited_commands = normalize_commands(list.split(','));
        }
        if let Some(m) = positive(source, keys::CONFIG_RELOAD_INTERVAL_MINUTES).await? {
            next.reload_interval = minutes(m);
        }

        Ok(next)
    }

    pub fn is_rate_limited(&self, command: &str) -> bool {
        let command = command.trim_start_matches('/');
        self.rate_limited_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(command))
    }

    /// Wraps this snapshot in a new shared handle.
    pub fn into_handle(self) -> SettingsHandle {
        Arc::new(ArcSwap::from_pointee(self))
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(MINUTE))
}

fn normalize_commands<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    raw.map(|c| c.trim().trim_start_matches('/').to_ascii_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

async fn non_negative(
    source: &dyn ConfigSource,
    key: &str,
) -> Result<Option<u64>, PeerwardenError> {
    let raw = source.get_int(key).await?;
    Ok(raw.and_then(|v| match u64::try_from(v) {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = v, "ignoring negative runtime setting");
            None
        }
    }))
}

async fn positive(source: &dyn ConfigSource, key: &str) -> Result<Option<u64>, PeerwardenError> {
    Ok(non_negative(source, key).await?.filter(|v| *v > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    #[derive(Default)]
    struct MapSource(Mutex<HashMap<String, String>>);

    impl MapSource {
        fn with(pairs: &[(&str, &str)]) -> Self {
            let map = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Self(Mutex::new(map))
        }
    }

    #[async_trait]
    impl ConfigSource for MapSource {
        async fn get(&self, key: &str) -> Result<Option<String>, PeerwardenError> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), PeerwardenError> {
            self.0.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }

        async fn list(&self) -> Result<Vec<(String, String)>, PeerwardenError> {
            Ok(self.0.lock().unwrap().clone().into_iter().collect())
        }
    }

    #[test]
    fn defaults_translate_to_durations() {
        let settings = RuntimeSettings::from_config(&PeerwardenConfig::default());
        assert_eq!(settings.script_timeout, Duration::from_secs(120));
        assert_eq!(settings.watchdog_interval, Duration::from_secs(300));
        assert_eq!(settings.inactive_threshold, Duration::from_secs(3600));
        assert_eq!(settings.max_test_duration, Duration::from_secs(86_400));
        assert_eq!(settings.rate_limited_commands, vec!["create", "stat"]);
        assert!(settings.is_rate_limited("/create"));
        assert!(!settings.is_rate_limited("delete"));
    }

    #[tokio::test]
    async fn overrides_apply_and_bad_values_are_ignored() {
        let base = RuntimeSettings::from_config(&PeerwardenConfig::default());
        let source = MapSource::with(&[
            (keys::MAX_CLIENTS, "5"),
            (keys::RESTRICT_NEW_USERS, "yes"),
            (keys::RATE_LIMITED_COMMANDS, " Create , ,feedback"),
            (keys::WATCHDOG_CHECK_INTERVAL_MINUTES, "0"),
            (keys::RATE_LIMIT_INTERVAL_MINUTES, "soon"),
            (keys::MAX_TEST_DURATION_MINUTES, "0"),
        ]);

        let next = base.with_overrides(&source).await.unwrap();
        assert_eq!(next.max_clients, 5);
        assert!(next.restrict_new_users);
        assert_eq!(next.rate_limited_commands, vec!["create", "feedback"]);
        assert_eq!(next.watchdog_interval, base.watchdog_interval);
        assert_eq!(next.rate_limit_interval, base.rate_limit_interval);
        assert_eq!(next.max_test_duration, Duration::ZERO);
    }

    #[tokio::test]
    async fn empty_source_is_identity() {
        let base = RuntimeSettings::from_config(&PeerwardenConfig::default());
        let next = base.with_overrides(&MapSource::default()).await.unwrap();
        assert_eq!(next, base);
    }

    #[test]
    fn handle_swaps_whole_snapshot() {
        let base = RuntimeSettings::from_config(&PeerwardenConfig::default());
        let handle = base.clone().into_handle();
        let before = handle.load_full();

        let mut next = base;
        next.max_clients = 1;
        handle.store(Arc::new(next));

        assert_eq!(before.max_clients, 100);
        assert_eq!(handle.load().max_clients, 1);
    }

    #[test]
    fn every_key_is_listed_once() {
        let mut all = keys::ALL.to_vec();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), keys::ALL.len());
    }
}
