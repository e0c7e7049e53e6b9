// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff commands.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{TimeDelta, Utc};
use peerwarden_config::runtime::keys;
use peerwarden_core::{PeerwardenError, UserLevel};
use tracing::{info, warn};

use super::{Caller, Handler};
use crate::texts::{self, escape_html};

const USERS_DEFAULT: usize = 20;
const USERS_MAX: usize = 100;
const FEEDBACK_DEFAULT: usize = 10;
const FEEDBACK_MAX: usize = 50;
const LOGS_DEFAULT: usize = 20;
const LOGS_MAX: usize = 100;
const PREVIEW_CHARS: usize = 100;

/// Levels an admin may assign with `/setlevel`.
const ASSIGNABLE: &[UserLevel] = &[
    UserLevel::Basic,
    UserLevel::Premium,
    UserLevel::Moderator,
    UserLevel::Admin,
];

fn parse_limit(raw: &str, max: usize) -> Option<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n.min(max))
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

/// Normalized value for a runtime setting, or why it was rejected.
fn validate_setting(key: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    match key {
        keys::WATCHDOG_ENABLED | keys::RESTRICT_NEW_USERS => {
            match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok("true".into()),
                "false" | "0" | "no" => Ok("false".into()),
                _ => Err(format!("{key} expects true or false")),
            }
        }
        keys::MAX_CLIENTS | keys::MAX_TEST_DURATION_MINUTES => value
            .parse::<u64>()
            .map(|v| v.to_string())
            .map_err(|_| format!("{key} expects a non-negative integer")),
        keys::RATE_LIMITED_COMMANDS => Ok(value
            .split(',')
            .map(|c| c.trim().trim_start_matches('/').to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(",")),
        _ => value
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .map(|v| v.to_string())
            .ok_or_else(|| format!("{key} expects a positive integer")),
    }
}

impl Handler {
    pub(super) async fn cmd_admin(&self, caller: &Caller) {
        if !self.require(caller, UserLevel::Moderator).await {
            return;
        }
        let text = if caller.has_privilege(UserLevel::Admin) {
            format!("{}\n\n{}", texts::ADMIN_COMMANDS_MODERATOR, texts::ADMIN_COMMANDS_ADMIN)
        } else {
            texts::ADMIN_COMMANDS_MODERATOR.to_string()
        };
        self.reply(caller.chat_id, text).await;
    }

    pub(super) async fn cmd_users(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Moderator).await {
            return;
        }

        let mut level = None;
        let mut limit = USERS_DEFAULT;
        for arg in args {
            if let Ok(parsed) = UserLevel::from_str(&arg.to_ascii_lowercase()) {
                level = Some(parsed);
            } else if let Some(n) = parse_limit(arg, USERS_MAX) {
                limit = n;
            } else {
                self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                return;
            }
        }

        let accounts = match level {
            Some(level) => self.svc.accounts.list_by_level(level, limit).await,
            None => self
                .svc
                .accounts
                .list_all()
                .await
                .map(|all| all.into_iter().take(limit).collect()),
        };
        let accounts = match accounts {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(error = %e, "listing users failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
                return;
            }
        };

        if accounts.is_empty() {
            self.reply(caller.chat_id, "No users found.").await;
            return;
        }
        let mut text = format!("<b>Users</b> ({})\n", accounts.len());
        for acc in &accounts {
            let id = acc
                .user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "—".to_string());
            let _ = write!(
                text,
                "\n<code>{id}</code> {} [{}]",
                escape_html(&acc.display_name()),
                acc.level
            );
            if let Some(until) = acc.premium_expires_at {
                let _ = write!(text, " until {}", texts::format_local(until));
            }
        }
        self.reply(caller.chat_id, text).await;
    }

    pub(super) async fn cmd_feedback_list(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Moderator).await {
            return;
        }
        let limit = match args {
            [] => FEEDBACK_DEFAULT,
            [raw] => match parse_limit(raw, FEEDBACK_MAX) {
                Some(n) => n,
                None => {
                    self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                    return;
                }
            },
            _ => {
                self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                return;
            }
        };

        let entries = match self.svc.feedback.list(limit).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "listing feedback failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
                return;
            }
        };
        if entries.is_empty() {
            self.reply(caller.chat_id, "No feedback yet.").await;
            return;
        }

        let mut text = String::from("<b>Feedback</b>\n");
        for fb in &entries {
            let author = fb
                .username
                .as_deref()
                .map(|u| format!("@{u}"))
                .unwrap_or_else(|| fb.user_id.to_string());
            let status = if fb.is_processed() { "✅" } else { "🕓" };
            let _ = write!(
                text,
                "\n{status} #{} {} ({}): {}",
                fb.id,
                escape_html(&author),
                texts::format_local(fb.created_at),
                escape_html(&preview(&fb.message))
            );
        }
        self.reply(caller.chat_id, text).await;
    }

    pub(super) async fn cmd_logs(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Moderator).await {
            return;
        }
        let (filter, limit) = match args {
            [] => (None, LOGS_DEFAULT),
            [one] => match one.parse::<usize>() {
                Ok(_) => match parse_limit(one, LOGS_MAX) {
                    Some(n) => (None, n),
                    None => {
                        self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                        return;
                    }
                },
                Err(_) => (Some(*one), LOGS_DEFAULT),
            },
            [user, raw] => match parse_limit(raw, LOGS_MAX) {
                Some(n) => (Some(*user), n),
                None => {
                    self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                    return;
                }
            },
            _ => {
                self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                return;
            }
        };

        let events = match self.svc.events.recent(limit, filter).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "reading event log failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
                return;
            }
        };
        if events.is_empty() {
            self.reply(caller.chat_id, "No events found.").await;
            return;
        }

        let mut text = String::from("<b>Recent events</b>\n");
        for ev in &events {
            let who = match (&ev.username, ev.user_id) {
                (Some(name), _) => format!("@{name}"),
                (None, Some(id)) => id.to_string(),
                (None, None) => "system".to_string(),
            };
            let _ = write!(
                text,
                "\n{} {} <b>{}</b>",
                texts::format_local(ev.timestamp),
                escape_html(&who),
                escape_html(&ev.command)
            );
            if let Some(code) = ev.exit_code {
                let _ = write!(text, " exit={code}");
            }
            if let Some(err) = &ev.error {
                let _ = write!(text, " ⚠️ {}", escape_html(&preview(err)));
            }
        }
        self.reply(caller.chat_id, text).await;
    }

    pub(super) async fn cmd_set_level(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        let parsed = match args {
            [id, level] => id.parse::<i64>().ok().zip(
                UserLevel::from_str(&level.to_ascii_lowercase())
                    .ok()
                    .filter(|l| ASSIGNABLE.contains(l)),
            ),
            _ => None,
        };
        let Some((user_id, level)) = parsed else {
            self.reply(
                caller.chat_id,
                "❌ Usage: /setlevel &lt;id&gt; &lt;basic|premium|moderator|admin&gt;",
            )
            .await;
            return;
        };

        match self.svc.accounts.set_level(user_id, level).await {
            Ok(()) => {
                info!(user_id, level = %level, by = caller.user.id, "level changed");
                self.reply(
                    caller.chat_id,
                    format!("✅ User <code>{user_id}</code> is now {level}."),
                )
                .await;
            }
            Err(e) if e.is_not_found() => {
                self.reply(caller.chat_id, texts::USER_NOT_FOUND).await;
            }
            Err(e) => {
                warn!(user_id, error = %e, "set level failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    pub(super) async fn cmd_set_premium(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        let [id, span, reason @ ..] = args else {
            self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
            return;
        };
        let Ok(user_id) = id.parse::<i64>() else {
            self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
            return;
        };
        let expires_at = if span.eq_ignore_ascii_case("permanent") {
            None
        } else {
            match span.parse::<i64>().ok().filter(|d| *d > 0) {
                Some(days) => Some(Utc::now() + TimeDelta::days(days)),
                None => {
                    self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
                    return;
                }
            }
        };
        let reason = if reason.is_empty() {
            format!("Set by admin {}", caller.user.display_name())
        } else {
            reason.join(" ")
        };

        let result = async {
            self.svc.accounts.set_level(user_id, UserLevel::Premium).await?;
            self.svc
                .accounts
                .set_premium(user_id, expires_at, &reason)
                .await
        }
        .await;
        match result {
            Ok(()) => {
                let until = expires_at
                    .map(texts::format_local)
                    .unwrap_or_else(|| "forever".to_string());
                info!(user_id, until = %until, by = caller.user.id, "premium granted");
                self.reply(
                    caller.chat_id,
                    format!("✅ Premium granted to <code>{user_id}</code> until {until}."),
                )
                .await;
            }
            Err(e) if e.is_not_found() => {
                self.reply(caller.chat_id, texts::USER_NOT_FOUND).await;
            }
            Err(e) => {
                warn!(user_id, error = %e, "set premium failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    pub(super) async fn cmd_block(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        let [id, reason @ ..] = args else {
            self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
            return;
        };
        let (Ok(user_id), false) = (id.parse::<i64>(), reason.is_empty()) else {
            self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
            return;
        };
        let reason = reason.join(" ");

        match self.svc.blocklist.block(user_id, &reason).await {
            Ok(()) => {
                info!(user_id, by = caller.user.id, "user blocked");
                self.reply(
                    caller.chat_id,
                    format!(
                        "⛔ User <code>{user_id}</code> blocked: {}",
                        escape_html(&reason)
                    ),
                )
                .await;
            }
            Err(e) => {
                warn!(user_id, error = %e, "block failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    pub(super) async fn cmd_unblock(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        let Some(user_id) = (match args {
            [id] => id.parse::<i64>().ok(),
            _ => None,
        }) else {
            self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
            return;
        };

        match self.svc.blocklist.unblock(user_id).await {
            Ok(true) => {
                info!(user_id, by = caller.user.id, "user unblocked");
                self.reply(
                    caller.chat_id,
                    format!("✅ User <code>{user_id}</code> unblocked."),
                )
                .await;
            }
            Ok(false) => {
                self.reply(
                    caller.chat_id,
                    format!("ℹ️ User <code>{user_id}</code> is not blocked."),
                )
                .await;
            }
            Err(e) => {
                warn!(user_id, error = %e, "unblock failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    pub(super) async fn cmd_config(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        match args {
            [] => self.config_list(caller).await,
            [key] => self.config_get(caller, key).await,
            [key, value @ ..] => self.config_set(caller, key, &value.join(" ")).await,
        }
    }

    async fn config_list(&self, caller: &Caller) {
        let stored = match self.svc.config.list().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "listing settings failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
                return;
            }
        };
        let mut text = String::from("<b>Runtime settings</b>\n");
        for key in keys::ALL {
            let value = stored
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| escape_html(v))
                .unwrap_or_else(|| "(default)".to_string());
            let _ = write!(text, "\n<code>{key}</code> = {value}");
        }
        self.reply(caller.chat_id, text).await;
    }

    async fn config_get(&self, caller: &Caller, key: &str) {
        if !keys::ALL.contains(&key) {
            self.reply(caller.chat_id, unknown_key(key)).await;
            return;
        }
        match self.svc.config.get(key).await {
            Ok(Some(value)) => {
                self.reply(
                    caller.chat_id,
                    format!("<code>{key}</code> = {}", escape_html(&value)),
                )
                .await;
            }
            Ok(None) => {
                self.reply(caller.chat_id, format!("<code>{key}</code> is not set."))
                    .await;
            }
            Err(e) => {
                warn!(key, error = %e, "reading setting failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    async fn config_set(&self, caller: &Caller, key: &str, value: &str) {
        if !keys::ALL.contains(&key) {
            self.reply(caller.chat_id, unknown_key(key)).await;
            return;
        }
        let value = match validate_setting(key, value) {
            Ok(value) => value,
            Err(msg) => {
                self.reply(caller.chat_id, format!("❌ {}", escape_html(&msg)))
                    .await;
                return;
            }
        };
        match self.svc.config.set(key, &value).await {
            Ok(()) => {
                info!(key, value = %value, by = caller.user.id, "runtime setting stored");
                self.reply(
                    caller.chat_id,
                    format!(
                        "✅ <code>{key}</code> = {}. Applies at the next reload.",
                        escape_html(&value)
                    ),
                )
                .await;
            }
            Err(e) => {
                warn!(key, error = %e, "storing setting failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    pub(super) async fn cmd_stats(&self, caller: &Caller) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        let result: Result<String, PeerwardenError> = async {
            let by_level = self.svc.accounts.count_by_level().await?;
            let clients = self.svc.inventory.list_clients().await?.len();
            let feedback = self.svc.feedback.counts().await?;

            let total: u64 = by_level.iter().map(|(_, n)| n).sum();
            let mut text = format!("<b>Statistics</b>\n\nUsers: {total}");
            for (level, n) in &by_level {
                let _ = write!(text, "\n  {level}: {n}");
            }
            let _ = write!(
                text,
                "\nClients: {clients}\nFeedback: {} ({} pending)",
                feedback.total, feedback.pending
            );
            Ok(text)
        }
        .await;

        match result {
            Ok(text) => {
                self.reply(caller.chat_id, text).await;
            }
            Err(e) => {
                warn!(error = %e, "collecting statistics failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }

    pub(super) async fn cmd_cleanup_logs(&self, caller: &Caller, args: &[&str]) {
        if !self.require(caller, UserLevel::Admin).await {
            return;
        }
        let days = match args {
            [raw] => raw.parse::<i64>().ok().filter(|d| *d > 0),
            _ => None,
        };
        let Some(days) = days else {
            self.reply(caller.chat_id, texts::INVALID_FORMAT).await;
            return;
        };

        let cutoff = Utc::now() - TimeDelta::days(days);
        match self.svc.events.delete_older_than(cutoff).await {
            Ok(deleted) => {
                info!(deleted, days, "event log cleaned up");
                self.reply(
                    caller.chat_id,
                    format!("🧹 Deleted {deleted} events older than {days} days."),
                )
                .await;
            }
            Err(e) => {
                warn!(error = %e, "event log cleanup failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
        }
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "❌ Unknown setting <code>{}</code>. Known: {}",
        escape_html(key),
        keys::ALL.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(parse_limit("500", USERS_MAX), Some(USERS_MAX));
        assert_eq!(parse_limit("5", USERS_MAX), Some(5));
        assert_eq!(parse_limit("0", USERS_MAX), None);
        assert_eq!(parse_limit("x", USERS_MAX), None);
    }

    #[test]
    fn settings_are_validated_by_type() {
        assert_eq!(validate_setting(keys::WATCHDOG_ENABLED, "YES").unwrap(), "true");
        assert!(validate_setting(keys::WATCHDOG_ENABLED, "maybe").is_err());
        assert_eq!(validate_setting(keys::MAX_CLIENTS, "0").unwrap(), "0");
        assert!(validate_setting(keys::MAX_CLIENTS, "-1").is_err());
        assert!(validate_setting(keys::WATCHDOG_CHECK_INTERVAL_MINUTES, "0").is_err());
        assert_eq!(
            validate_setting(keys::RATE_LIMITED_COMMANDS, " /Create, stat ,").unwrap(),
            "create,stat"
        );
    }

    #[test]
    fn long_text_is_shortened() {
        let long = "x".repeat(150);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 1);
        assert_eq!(preview("short"), "short");
    }
}
