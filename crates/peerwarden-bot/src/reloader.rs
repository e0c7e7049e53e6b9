// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic reload of runtime settings from the settings table.

use std::sync::Arc;

use peerwarden_config::{RuntimeSettings, SettingsHandle};
use peerwarden_core::{ConfigSource, PeerwardenError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Rebuilds the settings snapshot from the static config plus stored
/// overrides and swaps it in when it changed.
///
/// The reload period is itself a setting. When a reload changes it, the
/// pending sleep is reset so the new period applies right away.
pub struct ConfigReloader {
    base: RuntimeSettings,
    source: Arc<dyn ConfigSource>,
    settings: SettingsHandle,
    reset: Notify,
}

impl ConfigReloader {
    /// `base` is the snapshot built from the static config alone.
    pub fn new(
        base: RuntimeSettings,
        source: Arc<dyn ConfigSource>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            base,
            source,
            settings,
            reset: Notify::new(),
        }
    }

    /// Reload once. Returns whether a new snapshot was swapped in.
    pub async fn reload_once(&self) -> Result<bool, PeerwardenError> {
        let next = self.base.with_overrides(self.source.as_ref()).await?;
        let current = self.settings.load_full();
        if *current == next {
            debug!("runtime settings unchanged");
            return Ok(false);
        }

        let interval_changed = current.reload_interval != next.reload_interval;
        info!(?next, "runtime settings reloaded");
        self.settings.store(Arc::new(next));
        if interval_changed {
            self.reset.notify_one();
        }
        Ok(true)
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("config reloader started");
        loop {
            let period = self.settings.load().reload_interval;
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    if let Err(e) = self.reload_once().await {
                        warn!(error = %e, "reloading runtime settings failed");
                    }
                }
                _ = self.reset.notified() => {
                    debug!(
                        interval_secs = self.settings.load().reload_interval.as_secs(),
                        "reload interval changed, ticker reset"
                    );
                }
                _ = cancel.cancelled() => {
                    info!("config reloader stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use peerwarden_config::{PeerwardenConfig, keys};
    use peerwarden_test_utils::MockConfigSource;

    fn base() -> RuntimeSettings {
        let mut base = RuntimeSettings::from_config(&PeerwardenConfig::default());
        base.reload_interval = Duration::from_secs(300);
        base
    }

    #[tokio::test]
    async fn swaps_only_on_change() {
        let source = Arc::new(MockConfigSource::with(&[(keys::MAX_CLIENTS, "7")]).await);
        let settings = base().into_handle();
        let reloader = ConfigReloader::new(base(), source.clone(), settings.clone());

        assert!(reloader.reload_once().await.unwrap());
        assert_eq!(settings.load().max_clients, 7);
        assert!(!reloader.reload_once().await.unwrap());

        source.set(keys::MAX_CLIENTS, "9").await.unwrap();
        assert!(reloader.reload_once().await.unwrap());
        assert_eq!(settings.load().max_clients, 9);
    }

    #[tokio::test]
    async fn removed_override_falls_back_to_static_value() {
        let source = Arc::new(MockConfigSource::with(&[(keys::RESTRICT_NEW_USERS, "true")]).await);
        let settings = base().into_handle();
        let reloader = ConfigReloader::new(base(), source, settings.clone());
        reloader.reload_once().await.unwrap();
        assert!(settings.load().restrict_new_users);

        let empty = Arc::new(MockConfigSource::new());
        let reloader = ConfigReloader::new(base(), empty, settings.clone());
        assert!(reloader.reload_once().await.unwrap());
        assert!(!settings.load().restrict_new_users);
    }

    #[tokio::test]
    async fn failing_source_keeps_snapshot() {
        let source = Arc::new(MockConfigSource::with(&[(keys::MAX_CLIENTS, "7")]).await);
        source.set_failing(true);
        let settings = base().into_handle();
        let before = settings.load_full();
        let reloader = ConfigReloader::new(base(), source, settings.clone());

        assert!(reloader.reload_once().await.is_err());
        assert!(Arc::ptr_eq(&before, &settings.load_full()));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_resets_the_ticker() {
        let source = Arc::new(
            MockConfigSource::with(&[(keys::CONFIG_RELOAD_INTERVAL_MINUTES, "1")]).await,
        );
        let settings = base().into_handle();
        let reloader = Arc::new(ConfigReloader::new(base(), source.clone(), settings.clone()));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&reloader).run(cancel.clone()));

        // First reload after the static 5 minutes picks up the 1 minute period.
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(settings.load().reload_interval, Duration::from_secs(60));

        // The next reload now happens within a minute, not five.
        source.set(keys::MAX_CLIENTS, "3").await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(settings.load().max_clients, 3);

        cancel.cancel();
        task.await.unwrap();
    }
}
