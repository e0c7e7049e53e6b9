// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `peerwarden check-config`: a human-readable summary of a valid config.

use std::fmt::Write as _;

use peerwarden_config::PeerwardenConfig;

fn on_off(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

/// Render the effective configuration. The bot token is never printed.
pub fn summary(config: &PeerwardenConfig) -> String {
    let mut out = String::from("peerwarden: configuration is valid\n");
    let token = if config.bot.token.as_deref().is_some_and(|t| !t.trim().is_empty()) {
        "set"
    } else {
        "missing (required by serve)"
    };
    let p = &config.provisioning;
    let w = &config.watchdog;
    let l = &config.limits;

    // Writing to a String cannot fail.
    let _ = writeln!(out, "  bot.token:        {token}");
    let _ = writeln!(out, "  bot.log_level:    {}", config.bot.log_level);
    let _ = writeln!(out, "  workers:          {}", config.bot.worker_pool_size);
    let _ = writeln!(out, "  database:         {}", config.storage.database_path);
    let _ = writeln!(out, "  add script:       {}", p.script_path(&p.add_script).display());
    let _ = writeln!(out, "  remove script:    {}", p.script_path(&p.remove_script).display());
    let _ = writeln!(out, "  link script:      {}", p.script_path(&p.link_script).display());
    let _ = writeln!(out, "  clients dir:      {}", p.clients_dir);
    let _ = writeln!(out, "  wg interface:     {}", p.wg_interface);
    let _ = writeln!(
        out,
        "  watchdog:         {} (every {} min, idle {} min, test {} min)",
        on_off(w.enabled),
        w.check_interval_minutes,
        w.inactive_threshold_minutes,
        w.max_test_duration_minutes
    );
    let max_clients = match l.max_clients {
        0 => "unlimited".to_string(),
        n => n.to_string(),
    };
    let _ = writeln!(out, "  max clients:      {max_clients}");
    let _ = writeln!(out, "  restrict new:     {}", l.restrict_new_users);
    let _ = writeln!(
        out,
        "  rate limit:       {} min for {}",
        l.rate_limit_interval_minutes,
        l.rate_limited_commands.join(", ")
    );
    let _ = writeln!(
        out,
        "  reload:           {} (every {} min)",
        on_off(config.reload.enabled),
        config.reload.interval_minutes
    );
    out
}

/// The effective configuration as TOML, with the token redacted.
pub fn dump(config: &PeerwardenConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.bot.token.is_some() {
        shown.bot.token = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&shown)
}
