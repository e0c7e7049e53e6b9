// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./peerwarden.toml` >
//! `~/.config/peerwarden/peerwarden.toml` > `/etc/peerwarden/peerwarden.toml`
//! with environment variable overrides via the `PEERWARDEN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PeerwardenConfig;

pub(crate) const LOCAL_FILE: &str = "peerwarden.toml";
pub(crate) const SYSTEM_FILE: &str = "/etc/peerwarden/peerwarden.toml";
pub(crate) const USER_FILE: &str = "peerwarden/peerwarden.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/peerwarden/peerwarden.toml` (system-wide)
/// 3. `~/.config/peerwarden/peerwarden.toml` (user XDG config)
/// 4. `./peerwarden.toml` (local directory)
/// 5. `PEERWARDEN_*` environment variables
pub fn load_config() -> Result<PeerwardenConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PeerwardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PeerwardenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PeerwardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PeerwardenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PeerwardenConfig::default()))
        .merge(Toml::file(SYSTEM_FILE))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join(USER_FILE))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_FILE))
        .merge(env_provider())
}

/// Environment provider with an explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `PEERWARDEN_WATCHDOG_CHECK_INTERVAL_MINUTES` must map to
/// `watchdog.check_interval_minutes`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("PEERWARDEN_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["bot", "storage", "provisioning", "watchdog", "limits", "reload"]
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
