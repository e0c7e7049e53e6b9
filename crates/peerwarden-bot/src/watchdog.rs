// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client lifecycle watchdog.
//!
//! Each cycle reconciles the client directories on disk with the account
//! table and evicts clients that outlived the test period or went idle.
//! Evicted accounts get the tombstone marker in `updated_at`; a client
//! directory that reappears later resets it.
//!
//! Accounts are matched on the lowercased directory name. Stats lookups,
//! existence checks and removal use the directory name as found on disk.
//!
//! The cycle cadence is read once when [`Watchdog::run`] starts. A settings
//! reload that changes the interval takes effect on the next process start.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use peerwarden_config::SettingsHandle;
use peerwarden_core::{
    AccountRepository, ClientInventory, LogEvent, LogSink, ProvisioningAction, StatsProvider,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::resolve::{Fallback, resolve_account};

/// Deadline for one eviction.
const REMOVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Totals of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Client directories examined.
    pub processed: usize,
    /// Clients queued for eviction.
    pub queued: usize,
    /// Queued clients whose remove action succeeded.
    pub evicted: usize,
    /// Wall-clock time of the cycle.
    pub duration: Duration,
}

/// Periodic reconciliation of client directories against accounts.
///
/// Premium, moderator and admin accounts are never evicted.
pub struct Watchdog {
    accounts: Arc<dyn AccountRepository>,
    stats: Arc<dyn StatsProvider>,
    actions: Arc<dyn ProvisioningAction>,
    inventory: Arc<dyn ClientInventory>,
    settings: SettingsHandle,
    log: Arc<dyn LogSink>,
}

/// A client directory: its name on disk and the lowercased account key.
struct ClientDir {
    on_disk: String,
    name: String,
}

impl ClientDir {
    fn new(on_disk: String) -> Self {
        let name = on_disk.to_lowercase();
        Self { on_disk, name }
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

impl Watchdog {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        stats: Arc<dyn StatsProvider>,
        actions: Arc<dyn ProvisioningAction>,
        inventory: Arc<dyn ClientInventory>,
        settings: SettingsHandle,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            accounts,
            stats,
            actions,
            inventory,
            settings,
            log,
        }
    }

    /// Run cycles until cancelled. A cycle in progress when `cancel` fires
    /// runs to completion.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.settings.load().watchdog_interval;
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the immediate first tick.
        interval.tick().await;
        info!(interval_secs = period.as_secs(), "watchdog started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !self.settings.load().watchdog_enabled {
                        debug!("watchdog disabled, skipping cycle");
                        continue;
                    }
                    self.run_cycle().await;
                }
                _ = cancel.cancelled() => {
                    info!("watchdog stopping");
                    break;
                }
            }
        }
    }

    /// One reconciliation pass at the current time.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// One reconciliation pass evaluated at wall-clock `now`.
    ///
    /// Returns `None` when the client listing failed and nothing was done.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Option<CycleReport> {
        let started = Instant::now();
        let settings = self.settings.load_full();

        let clients: Vec<ClientDir> = match self.inventory.list_clients().await {
            Ok(dirs) => dirs.into_iter().map(ClientDir::new).collect(),
            Err(e) => {
                warn!(error = %e, "watchdog could not list clients, skipping cycle");
                self.log
                    .emit(LogEvent::new("watchdog_list_clients_error").error(&e));
                return None;
            }
        };

        let stats = match self.stats.all_peer_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "watchdog could not read peer stats, continuing without");
                self.log.emit(LogEvent::new("watchdog_stats_error").error(&e));
                Default::default()
            }
        };

        let max_lifetime = to_delta(settings.max_test_duration);
        let inactive_threshold = to_delta(settings.inactive_threshold);
        let mut queue = Vec::new();

        for dir in &clients {
            let client = &dir.name;
            let account = match resolve_account(self.accounts.as_ref(), client, Fallback::Register)
                .await
            {
                Ok(resolution) => match resolution.into_account() {
                    Some(acc) => acc,
                    None => {
                        debug!(client = %client, "no account for client, skipping");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(client = %client, error = %e, "watchdog could not resolve client");
                    self.log.emit(
                        LogEvent::new("watchdog_resolve_error")
                            .client(client.as_str())
                            .error(&e),
                    );
                    continue;
                }
            };

            let mut last_activity = account.updated_at;
            if account.is_tombstoned() {
                match self.inventory.exists(&dir.on_disk).await {
                    Ok(true) => match self.accounts.update_activity(account.id).await {
                        Ok(()) => {
                            info!(client = %client, "client reappeared, tombstone cleared");
                            self.log.emit(
                                LogEvent::new("watchdog_marker_reset").client(client.as_str()),
                            );
                            last_activity = now;
                        }
                        Err(e) => {
                            warn!(client = %client, error = %e, "clearing tombstone failed");
                            self.log.emit(
                                LogEvent::new("watchdog_marker_reset_error")
                                    .client(client.as_str())
                                    .error(&e),
                            );
                        }
                    },
                    _ => continue,
                }
            }

            let protected = account.is_protected();

            if max_lifetime > TimeDelta::zero()
                && now.signed_duration_since(account.created_at) >= max_lifetime
            {
                if !protected {
                    debug!(client = %client, "test period over, queued");
                    queue.push(dir);
                }
                continue;
            }

            let active = stats
                .get(&dir.on_disk)
                .or_else(|| stats.get(client))
                .is_some_and(|s| s.is_active());
            if active {
                if let Err(e) = self.accounts.update_activity(account.id).await {
                    warn!(client = %client, error = %e, "activity update failed");
                    self.log.emit(
                        LogEvent::new("watchdog_user_activity_update_error")
                            .client(client.as_str())
                            .error(&e),
                    );
                }
                continue;
            }

            if !protected && now.signed_duration_since(last_activity) >= inactive_threshold {
                debug!(client = %client, "client idle, queued");
                queue.push(dir);
            }
        }

        let mut evicted = 0;
        for dir in &queue {
            if self.evict(dir).await {
                evicted += 1;
            }
        }

        let report = CycleReport {
            processed: clients.len(),
            queued: queue.len(),
            evicted,
            duration: started.elapsed(),
        };
        info!(
            processed = report.processed,
            queued = report.queued,
            evicted = report.evicted,
            "watchdog cycle completed"
        );
        self.log.emit(LogEvent::new("watchdog_cycle_completed").output(format!(
            "Processed {} clients, removed {} clients in {:?}",
            report.processed, report.evicted, report.duration
        )));
        Some(report)
    }

    /// Remove one client and tombstone its account. Returns whether the
    /// remove action succeeded.
    async fn evict(&self, dir: &ClientDir) -> bool {
        let client = dir.on_disk.as_str();
        let out = match self.actions.remove(client, REMOVE_TIMEOUT).await {
            Ok(out) if out.success() => out,
            Ok(out) => {
                warn!(client, exit_code = out.exit_code, "watchdog remove failed");
                self.log.emit(
                    LogEvent::new("watchdog_remove_failed")
                        .client(client)
                        .action(&out),
                );
                return false;
            }
            Err(e) => {
                warn!(client, error = %e, "watchdog remove failed");
                self.log.emit(
                    LogEvent::new("watchdog_remove_failed")
                        .client(client)
                        .error(&e),
                );
                return false;
            }
        };

        match resolve_account(self.accounts.as_ref(), &dir.name, Fallback::NumericId).await {
            Ok(resolution) => match resolution.account() {
                Some(acc) => {
                    if let Err(e) = self.accounts.mark_tombstoned(acc.id).await {
                        warn!(client, error = %e, "tombstoning failed");
                        self.log.emit(
                            LogEvent::new("watchdog_mark_deleted_error")
                                .client(client)
                                .error(&e),
                        );
                    }
                }
                None => {
                    self.log.emit(
                        LogEvent::new("watchdog_user_not_found_for_marking")
                            .client(client)
                            .error(format!("Could not find user for marking: {client}")),
                    );
                }
            },
            Err(e) => {
                warn!(client, error = %e, "lookup for tombstoning failed");
                self.log.emit(
                    LogEvent::new("watchdog_user_not_found_for_marking")
                        .client(client)
                        .error(&e),
                );
            }
        }

        info!(client, "client evicted");
        self.log
            .emit(LogEvent::new("watchdog_removed").client(client).action(&out));
        true
    }
}
