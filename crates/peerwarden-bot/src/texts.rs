// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing message texts. All texts are HTML.

use chrono::{DateTime, Local, Utc};
use peerwarden_core::{Feedback, PeerStats, PeerStatus, UserLevel};

pub const BLOCKED: &str = "⛔ You are blocked and cannot use this bot.";
pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Send /help for the list of commands.";
pub const INSUFFICIENT_PERMISSIONS: &str = "⛔ You do not have permission to do that.";
pub const GENERIC_ERROR: &str = "❌ Something went wrong. Please try again later.";
pub const USER_LOOKUP_FAILED: &str = "❌ Could not load your account. Please try again later.";

pub const HELP: &str = "<b>Commands</b>\n\
/start - welcome and free slots\n\
/create - create your VPN configuration\n\
/stat - connection statistics\n\
/delete - delete your configuration\n\
/premium - premium status\n\
/feedback - write to the administrators\n\
/info - how it works\n\
/selfhost - run your own server\n\
/help - this message";

pub const INFO: &str = "ℹ️ This bot issues WireGuard configurations with traffic obfuscation.\n\n\
Test configurations are removed after a period of inactivity and once the test period ends. \
Premium accounts keep their configuration.";

pub const SELFHOST: &str = "🛠 The server side is open source. Install it on your own VPS \
and manage clients with the same scripts this bot uses.";

pub const CREATE_RATE_LIMITED: &str = "⏳ You are doing that too often. Please wait a minute and try again.";
pub const TEST_LIMIT_EXCEEDED: &str = "⌛ Your test period is over. Ask for premium with /feedback.";
pub const RESTRICTED_NEW_USERS: &str = "🚫 New configurations are not available right now. Try again later.";
pub const CREATE_ERROR: &str = "❌ Failed to create the configuration. Please try again later.";
pub const CREATE_NO_LINK: &str = "⚠️ The configuration was created, but no download link was produced. \
Contact the administrators with /feedback.";
pub const CREATE_CANCELLED: &str = "❌ Cancelled.";
pub const LINK_ERROR: &str = "❌ Failed to generate a link.";

pub const DELETE_NO_CONFIG: &str = "ℹ️ You do not have a configuration.";
pub const DELETE_SUCCESS: &str = "✅ Your configuration was deleted.";
pub const DELETE_ERROR: &str = "❌ Failed to delete the configuration.";
pub const DELETE_CANCELLED: &str = "❌ Deletion cancelled.";

pub const STAT_NO_CONFIG: &str = "ℹ️ You do not have a configuration yet. Create one with /create.";
pub const STAT_ERROR: &str = "❌ Could not read statistics.";
pub const STAT_RATE_LIMITED: &str = "⏳ Statistics can be requested once a minute.";

pub const PREMIUM_NONE: &str = "You do not have premium.";

pub const FEEDBACK_REQUEST: &str = "✍️ Write your message for the administrators in one message.";
pub const FEEDBACK_RECEIVED: &str = "✅ Thank you! Your message was sent to the administrators.";
pub const FEEDBACK_CANCELLED: &str = "❌ Feedback cancelled.";
pub const FEEDBACK_ERROR: &str = "❌ Could not save your message. Please try again later.";
pub const FEEDBACK_NOT_FOUND: &str = "❌ Feedback not found.";
pub const FEEDBACK_USER_NOT_FOUND: &str = "❌ The author of this feedback was not found.";
pub const FEEDBACK_REQUEST_RESPONSE: &str = "✍️ Type your reply to the user.";
pub const FEEDBACK_RESPONSE_SENT: &str = "✅ Reply sent.";
pub const FEEDBACK_RESPONSE_FAILED: &str = "❌ Could not deliver the reply.";
pub const FEEDBACK_SELECT_LEVEL: &str = "Select the new level:";
pub const FEEDBACK_ACTION_CANCELLED: &str = "❌ Action cancelled.";
pub const FEEDBACK_SAVE_FAILED: &str = "❌ Could not save the response.";
pub const FEEDBACK_INVALID_DATE: &str = "❌ Invalid date. Use the format DD-MM-YYYY HH:MM, for example 31-12-2026 23:59.";

pub const INVALID_FORMAT: &str = "❌ Invalid command format.";
pub const USER_NOT_FOUND: &str = "❌ User not found.";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Human rendering of a timestamp in server-local time.
pub fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn welcome(max_clients: u32, available: u32, inactive_hours: u64, test_hours: u64) -> String {
    format!(
        "👋 <b>Welcome!</b>\n\n\
         This bot creates personal WireGuard configurations.\n\n\
         Slots: {available} of {max_clients} available.\n\
         Inactive configurations are removed after {inactive_hours} h.\n\
         The test period lasts {test_hours} h.\n\n\
         Send /create to get started or /help for all commands."
    )
}

pub fn status_label(status: PeerStatus) -> &'static str {
    match status {
        PeerStatus::Active => "🟢 active",
        PeerStatus::Inactive => "🟡 inactive",
        PeerStatus::NeverConnected => "⚪ never connected",
    }
}

/// Status lines shared by /stat, /delete and the "already exists" prompt.
/// Missing stats render as dashes.
pub fn stats_block(stats: Option<&PeerStats>) -> String {
    match stats {
        Some(s) => format!(
            "Status: {}\nLast handshake: {}\nTransfer: {}",
            status_label(s.status),
            s.handshake_age(),
            s.transfer()
        ),
        None => "Status: —\nLast handshake: —\nTransfer: —".to_string(),
    }
}

pub fn create_exists(stats: Option<&PeerStats>) -> String {
    format!(
        "⚠️ You already have a configuration.\n\n{}\n\nWhat would you like to do?",
        stats_block(stats)
    )
}

pub fn create_success(command: &str, expiry: Option<&str>) -> String {
    let mut text = format!(
        "✅ Your configuration is ready.\n\nRun on your router:\n<code>{}</code>",
        escape_html(command)
    );
    if let Some(expiry) = expiry {
        text.push_str("\n\n");
        text.push_str(&escape_html(expiry));
    }
    text
}

pub fn link_generated(command: &str) -> String {
    format!(
        "🔗 A new install link was generated:\n\n<code>{}</code>\n\nThe link is valid for 10 minutes.",
        escape_html(command)
    )
}

pub fn delete_confirmation(stats: Option<&PeerStats>) -> String {
    format!(
        "🗑 Delete your configuration?\n\n{}",
        stats_block(stats)
    )
}

pub fn stat(client: &str, stats: &PeerStats, remaining_hours: Option<i64>) -> String {
    let mut text = format!(
        "📊 <b>{}</b>\n\n{}",
        escape_html(client),
        stats_block(Some(stats))
    );
    if let Some(hours) = remaining_hours {
        text.push_str(&format!("\nTest time remaining: {} h", hours.max(0)));
    }
    text
}

pub fn premium_active(until: &str) -> String {
    format!("⭐ Premium is active until: {}", escape_html(until))
}

pub fn premium_expired(at: DateTime<Utc>) -> String {
    format!("⌛ Your premium expired on {}.", format_local(at))
}

pub fn feedback_notification(author: &str, author_id: i64, feedback_id: i64, message: &str) -> String {
    format!(
        "📩 <b>Feedback #{feedback_id}</b> from {} (ID: <code>{author_id}</code>)\n\n{}",
        escape_html(author),
        escape_html(message)
    )
}

pub fn feedback_already_processed(fb: &Feedback, moderator: &str) -> String {
    let action = fb.response.as_deref().unwrap_or("read");
    let at = fb
        .responded_at
        .map(format_local)
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "ℹ️ This feedback was already handled by {} (ID: {}) at {at}.\nAction: {}",
        escape_html(moderator),
        fb.responded_by.unwrap_or_default(),
        escape_html(action)
    )
}

pub fn support_response(reply: &str) -> String {
    format!("💬 <b>Reply from support:</b>\n\n{}", escape_html(reply))
}

pub fn request_date(level: UserLevel) -> String {
    format!(
        "Level <b>{level}</b>: choose the duration, or type an expiry date as DD-MM-YYYY HH:MM."
    )
}

pub fn level_changed(level: UserLevel, until: &str) -> String {
    format!("User level changed to {level} until {until}")
}

pub fn config_deleted(author: &str, user_id: i64, exit_code: i32) -> String {
    format!(
        "🗑 Configuration of {} (ID: {user_id}) deleted (exit code: {exit_code}).",
        escape_html(author)
    )
}

pub const ADMIN_COMMANDS_ADMIN: &str = "<b>Admin commands</b>\n\
/users [level] [limit] - list users\n\
/feedbacklist [limit] - recent feedback\n\
/logs [user] [limit] - recent events\n\
/setlevel &lt;id&gt; &lt;level&gt; - change level\n\
/setpremium &lt;id&gt; &lt;days|permanent&gt; [reason] - grant premium\n\
/block &lt;id&gt; &lt;reason&gt; - block a user\n\
/unblock &lt;id&gt; - unblock a user\n\
/config &lt;key&gt; [value] - runtime settings\n\
/stats - totals\n\
/cleanuplogs &lt;days&gt; - delete old events";

pub const ADMIN_COMMANDS_MODERATOR: &str = "<b>Moderator commands</b>\n\
/users [level] [limit] - list users\n\
/feedbacklist [limit] - recent feedback\n\
/logs [user] [limit] - recent events";
