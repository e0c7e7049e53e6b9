// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level peerwarden configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PeerwardenConfig {
    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Client scripts and directories.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// Per-user restrictions for non-premium users.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Polling of runtime overrides stored in the database.
    #[serde(default)]
    pub reload: ReloadConfig,
}

/// Chat bot process settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Telegram Bot API token. Required by `serve`.
    #[serde(default)]
    pub token: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum number of events handled concurrently.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Capacity of the event-log queue before events are dropped.
    #[serde(default = "default_log_queue_capacity")]
    pub log_queue_capacity: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            log_level: default_log_level(),
            worker_pool_size: default_worker_pool_size(),
            log_queue_capacity: default_log_queue_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_worker_pool_size() -> usize {
    10
}

fn default_log_queue_capacity() -> usize {
    1024
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("peerwarden").join("peerwarden.db"))
        .unwrap_or_else(|| PathBuf::from("peerwarden.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Where the client scripts and generated client configs live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisioningConfig {
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Script invoked as `<add_script> <client>`.
    #[serde(default = "default_add_script")]
    pub add_script: String,

    /// Script invoked as `<remove_script> <client>`.
    #[serde(default = "default_remove_script")]
    pub remove_script: String,

    /// Script invoked as `<link_script> <client> <ttl_seconds>`.
    #[serde(default = "default_link_script")]
    pub link_script: String,

    /// One sub-directory per provisioned client.
    #[serde(default = "default_clients_dir")]
    pub clients_dir: String,

    #[serde(default = "default_wg_interface")]
    pub wg_interface: String,

    #[serde(default = "default_script_timeout_secs")]
    pub script_timeout_secs: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            add_script: default_add_script(),
            remove_script: default_remove_script(),
            link_script: default_link_script(),
            clients_dir: default_clients_dir(),
            wg_interface: default_wg_interface(),
            script_timeout_secs: default_script_timeout_secs(),
        }
    }
}

impl ProvisioningConfig {
    /// Full path of a script inside `scripts_dir`.
    pub fn script_path(&self, script: &str) -> PathBuf {
        PathBuf::from(&self.scripts_dir).join(script)
    }
}

fn default_scripts_dir() -> String {
    "/opt/peerwarden/scripts".to_string()
}

fn default_add_script() -> String {
    "vps-client-add.sh".to_string()
}

fn default_remove_script() -> String {
    "vps-client-remove.sh".to_string()
}

fn default_link_script() -> String {
    "vps-generate-install-command.sh".to_string()
}

fn default_clients_dir() -> String {
    "/opt/peerwarden/clients".to_string()
}

fn default_wg_interface() -> String {
    "wg0".to_string()
}

fn default_script_timeout_secs() -> u64 {
    120
}

/// Client lifecycle watchdog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatchdogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: u64,

    /// Unprotected clients idle this long are removed.
    #[serde(default = "default_inactive_threshold_minutes")]
    pub inactive_threshold_minutes: u64,

    /// Hard lifetime of an unprotected client. `0` disables the limit.
    #[serde(default = "default_max_test_duration_minutes")]
    pub max_test_duration_minutes: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: default_check_interval_minutes(),
            inactive_threshold_minutes: default_inactive_threshold_minutes(),
            max_test_duration_minutes: default_max_test_duration_minutes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_check_interval_minutes() -> u64 {
    5
}

fn default_inactive_threshold_minutes() -> u64 {
    60
}

fn default_max_test_duration_minutes() -> u64 {
    1440
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Refuse to provision clients that do not exist yet.
    #[serde(default)]
    pub restrict_new_users: bool,

    /// Upper bound on unprotected clients. `0` means unlimited.
    #[serde(default = "default_max_clients")]
    pub max_clients: u32,

    #[serde(default = "default_rate_limit_interval_minutes")]
    pub rate_limit_interval_minutes: u64,

    /// Commands subject to the per-user cooldown.
    #[serde(default = "default_rate_limited_commands")]
    pub rate_limited_commands: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            restrict_new_users: false,
            max_clients: default_max_clients(),
            rate_limit_interval_minutes: default_rate_limit_interval_minutes(),
            rate_limited_commands: default_rate_limited_commands(),
        }
    }
}

fn default_max_clients() -> u32 {
    100
}

fn default_rate_limit_interval_minutes() -> u64 {
    1
}

fn default_rate_limited_commands() -> Vec<String> {
    vec!["create".to_string(), "stat".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReloadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reload_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: default_reload_interval_minutes(),
        }
    }
}

fn default_reload_interval_minutes() -> u64 {
    5
}
