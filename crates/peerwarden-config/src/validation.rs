// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive intervals and non-empty paths.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::PeerwardenConfig;

/// Log levels accepted by `bot.log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PeerwardenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.bot.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "bot.log_level `{}` is not one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.bot.worker_pool_size < 1 {
        fail("bot.worker_pool_size must be at least 1".to_string());
    }
    if config.bot.log_queue_capacity < 1 {
        fail("bot.log_queue_capacity must be at least 1".to_string());
    }

    for (key, value) in [
        ("storage.database_path", &config.storage.database_path),
        ("provisioning.scripts_dir", &config.provisioning.scripts_dir),
        ("provisioning.add_script", &config.provisioning.add_script),
        ("provisioning.remove_script", &config.provisioning.remove_script),
        ("provisioning.link_script", &config.provisioning.link_script),
        ("provisioning.clients_dir", &config.provisioning.clients_dir),
        ("provisioning.wg_interface", &config.provisioning.wg_interface),
    ] {
        if value.trim().is_empty() {
            fail(format!("{key} must not be empty"));
        }
    }

    for (key, value) in [
        ("provisioning.script_timeout_secs", config.provisioning.script_timeout_secs),
        ("watchdog.check_interval_minutes", config.watchdog.check_interval_minutes),
        ("watchdog.inactive_threshold_minutes", config.watchdog.inactive_threshold_minutes),
        ("limits.rate_limit_interval_minutes", config.limits.rate_limit_interval_minutes),
        ("reload.interval_minutes", config.reload.interval_minutes),
    ] {
        if value == 0 {
            fail(format!("{key} must be positive"));
        }
    }

    let mut seen = HashSet::new();
    for command in &config.limits.rate_limited_commands {
        let normalized = command.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            fail("limits.rate_limited_commands must not contain empty entries".to_string());
        } else if !seen.insert(normalized) {
            fail(format!(
                "duplicate command `{command}` in limits.rate_limited_commands"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
