// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the collaborator traits and the bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::callback::CallbackAction;

/// Activity marker meaning "deprovisioned, pending possible recreation".
///
/// Normal activity updates always write the current wall-clock time, which
/// can never equal this value.
pub const TOMBSTONE: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Handshake age (in seconds) below which a peer counts as active.
pub const ACTIVE_HANDSHAKE_SECS: u64 = 180;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
    Stats,
    Provisioning,
}

/// Privilege level of an account. `Ban` is stored in the same column.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    #[default]
    Basic,
    Premium,
    Moderator,
    Admin,
    Ban,
}

impl UserLevel {
    /// Levels exempt from every eviction path.
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Premium | Self::Moderator | Self::Admin)
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    /// Levels whose assignment carries an expiry and a reason.
    pub fn carries_expiry(self) -> bool {
        matches!(self, Self::Premium | Self::Ban)
    }
}

/// A persisted account.
///
/// `user_id` is `None` for clients provisioned by hand, outside of chat.
/// `updated_at` doubles as the last-activity time and, when equal to
/// [`TOMBSTONE`], as the "deprovisioned" marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Storage row id. Stable even when `user_id` is absent.
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub level: UserLevel,
    pub premium_expires_at: Option<DateTime<Utc>>,
    pub premium_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_tombstoned(&self) -> bool {
        self.updated_at == TOMBSTONE
    }

    pub fn is_protected(&self) -> bool {
        self.level.is_protected()
    }

    pub fn is_staff(&self) -> bool {
        self.level.is_staff()
    }

    fn expiry_open_at(&self, now: DateTime<Utc>) -> bool {
        self.premium_expires_at.is_none_or(|expires| expires > now)
    }

    /// Whether this account satisfies `required` at `now`.
    pub fn has_privilege(&self, required: UserLevel, now: DateTime<Utc>) -> bool {
        match required {
            UserLevel::Basic => true,
            UserLevel::Premium => self.level == UserLevel::Premium && self.expiry_open_at(now),
            UserLevel::Moderator => self.level.is_staff(),
            UserLevel::Admin => self.level == UserLevel::Admin,
            UserLevel::Ban => false,
        }
    }

    /// Staff always count as premium; premium counts while unexpired.
    pub fn is_premium_at(&self, now: DateTime<Utc>) -> bool {
        match self.level {
            UserLevel::Admin | UserLevel::Moderator => true,
            UserLevel::Premium => self.expiry_open_at(now),
            _ => false,
        }
    }

    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.level == UserLevel::Ban && self.expiry_open_at(now)
    }

    /// `@username` when known, otherwise the numeric id or row id.
    pub fn display_name(&self) -> String {
        match (&self.username, self.user_id) {
            (Some(name), _) if !name.is_empty() => format!("@{name}"),
            (_, Some(id)) => id.to_string(),
            _ => format!("#{}", self.id),
        }
    }

    /// Client name provisioned for this account.
    pub fn client_name(&self) -> Option<String> {
        match (&self.username, self.user_id) {
            (Some(name), _) if !name.is_empty() => Some(name.to_lowercase()),
            (_, Some(id)) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Classification of a peer's most recent handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PeerStatus {
    Active,
    Inactive,
    NeverConnected,
}

/// Connection statistics for one provisioned client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStats {
    pub status: PeerStatus,
    pub last_handshake_secs: Option<u64>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl PeerStats {
    /// Builds stats from a handshake age, classifying the status.
    pub fn from_handshake(last_handshake_secs: Option<u64>, rx_bytes: u64, tx_bytes: u64) -> Self {
        let status = match last_handshake_secs {
            None => PeerStatus::NeverConnected,
            Some(age) if age < ACTIVE_HANDSHAKE_SECS => PeerStatus::Active,
            Some(_) => PeerStatus::Inactive,
        };
        Self {
            status,
            last_handshake_secs,
            rx_bytes,
            tx_bytes,
        }
    }

    pub fn never_connected() -> Self {
        Self::from_handshake(None, 0, 0)
    }

    pub fn is_active(&self) -> bool {
        self.status == PeerStatus::Active
    }

    /// "N sec/min/h/days ago", or "—" when the peer never connected.
    pub fn handshake_age(&self) -> String {
        let Some(secs) = self.last_handshake_secs else {
            return "—".to_string();
        };
        match secs {
            0..60 => format!("{secs} sec ago"),
            60..3600 => format!("{} min ago", secs / 60),
            3600..86400 => format!("{} h ago", secs / 3600),
            _ => format!("{} days ago", secs / 86400),
        }
    }

    /// "↓ rx / ↑ tx", or "—" when nothing was transferred.
    pub fn transfer(&self) -> String {
        if self.rx_bytes == 0 && self.tx_bytes == 0 {
            return "—".to_string();
        }
        format!("↓ {} / ↑ {}", format_bytes(self.rx_bytes), format_bytes(self.tx_bytes))
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    match bytes {
        0..1024 => format!("{bytes} B"),
        1024..1_048_576 => format!("{:.2} KB", value / KIB),
        1_048_576..1_073_741_824 => format!("{:.2} MB", value / (KIB * KIB)),
        _ => format!("{:.2} GB", value / (KIB * KIB * KIB)),
    }
}

/// Combined output and exit status of an external action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutput {
    pub output: String,
    /// `-1` when the process did not report an exit status.
    pub exit_code: i32,
}

impl ActionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A feedback message left by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub message: String,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    /// User id of the staff member who handled it.
    pub responded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn is_processed(&self) -> bool {
        self.responded_by.is_some_and(|id| id != 0)
    }
}

/// One business event written to the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub client_name: Option<String>,
    pub command: String,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub is_premium: bool,
    pub user_level: Option<UserLevel>,
}

impl LogEvent {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn user(mut self, user: &ChatUser) -> Self {
        self.user_id = Some(user.id);
        self.username = user.username.clone();
        self
    }

    pub fn client(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn action(mut self, out: &ActionOutput) -> Self {
        self.exit_code = Some(out.exit_code);
        self.output = Some(out.output.clone());
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn error(mut self, err: impl ToString) -> Self {
        self.error = Some(err.to_string());
        self
    }

    pub fn premium(mut self, is_premium: bool) -> Self {
        self.is_premium = is_premium;
        self
    }

    pub fn level(mut self, level: UserLevel) -> Self {
        self.user_level = Some(level);
        self
    }
}

/// The sender of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: i64,
    pub username: Option<String>,
}

impl ChatUser {
    /// Lowercased username, or the numeric id when there is none.
    pub fn client_name(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => name.to_lowercase(),
            _ => self.id.to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => format!("@{name}"),
            _ => self.id.to_string(),
        }
    }
}

/// A text message from a user.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub user: ChatUser,
    pub chat_id: i64,
    pub message_id: i32,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A parsed `/command@bot arg1 arg2` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub name: String,
    pub args: Vec<String>,
}

impl InboundMessage {
    /// Parses the text as a bot command, if it is one.
    pub fn command(&self) -> Option<CommandInvocation> {
        let rest = self.text.trim().strip_prefix('/')?;
        let mut words = rest.split_whitespace();
        let head = words.next()?;
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        if name.is_empty() {
            return None;
        }
        Some(CommandInvocation {
            name,
            args: words.map(str::to_string).collect(),
        })
    }
}

/// A button press.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub user: ChatUser,
    pub chat_id: i64,
    /// Message carrying the pressed button, when the platform reports it.
    pub message_id: Option<i32>,
    pub callback_id: String,
    pub action: CallbackAction,
    pub timestamp: DateTime<Utc>,
}

/// Everything the gateway can deliver.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    Callback(CallbackEvent),
}

impl InboundEvent {
    pub fn user(&self) -> &ChatUser {
        match self {
            Self::Message(m) => &m.user,
            Self::Callback(c) => &c.user,
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.chat_id,
            Self::Callback(c) => c.chat_id,
        }
    }
}

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    /// Render `text` as HTML.
    pub html: bool,
    pub keyboard: Vec<Vec<Button>>,
}

impl OutboundMessage {
    /// An HTML message without buttons.
    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            html: true,
            keyboard: Vec::new(),
        }
    }

    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            html: false,
            ..Self::html(chat_id, text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: Vec<Vec<Button>>) -> Self {
        self.keyboard = keyboard;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn account(level: UserLevel, expires: Option<DateTime<Utc>>) -> Account {
        let now = Utc::now();
        Account {
            id: 1,
            user_id: Some(42),
            username: Some("Alice".into()),
            level,
            premium_expires_at: expires,
            premium_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_level_parses_lowercase() {
        assert_eq!(UserLevel::from_str("moderator").unwrap(), UserLevel::Moderator);
        assert_eq!(UserLevel::Ban.to_string(), "ban");
        assert!(UserLevel::from_str("root").is_err());
    }

    #[test]
    fn premium_privilege_respects_expiry() {
        let now = Utc::now();
        let active = account(UserLevel::Premium, Some(now + Duration::days(1)));
        let expired = account(UserLevel::Premium, Some(now - Duration::days(1)));
        let forever = account(UserLevel::Premium, None);

        assert!(active.has_privilege(UserLevel::Premium, now));
        assert!(!expired.has_privilege(UserLevel::Premium, now));
        assert!(forever.has_privilege(UserLevel::Premium, now));
        assert!(!expired.is_premium_at(now));
        // Protection depends on the level alone.
        assert!(expired.is_protected());
    }

    #[test]
    fn staff_privileges() {
        let now = Utc::now();
        let moderator = account(UserLevel::Moderator, None);
        let admin = account(UserLevel::Admin, None);
        let basic = account(UserLevel::Basic, None);

        assert!(moderator.has_privilege(UserLevel::Moderator, now));
        assert!(!moderator.has_privilege(UserLevel::Admin, now));
        assert!(admin.has_privilege(UserLevel::Moderator, now));
        assert!(moderator.is_premium_at(now));
        assert!(basic.has_privilege(UserLevel::Basic, now));
        assert!(!basic.is_premium_at(now));
        assert!(!basic.is_protected());
    }

    #[test]
    fn ban_expires() {
        let now = Utc::now();
        assert!(account(UserLevel::Ban, None).is_banned_at(now));
        assert!(!account(UserLevel::Ban, Some(now - Duration::hours(1))).is_banned_at(now));
        assert!(!account(UserLevel::Basic, None).is_banned_at(now));
    }

    #[test]
    fn tombstone_is_epoch_zero() {
        let mut acc = account(UserLevel::Basic, None);
        assert!(!acc.is_tombstoned());
        acc.updated_at = TOMBSTONE;
        assert!(acc.is_tombstoned());
        assert_eq!(TOMBSTONE.timestamp(), 0);
    }

    #[test]
    fn client_name_prefers_lowercase_username() {
        let acc = account(UserLevel::Basic, None);
        assert_eq!(acc.client_name().as_deref(), Some("alice"));
        let user = ChatUser {
            id: 7,
            username: None,
        };
        assert_eq!(user.client_name(), "7");
    }

    #[test]
    fn peer_status_classification() {
        assert_eq!(PeerStats::from_handshake(Some(179), 0, 0).status, PeerStatus::Active);
        assert_eq!(PeerStats::from_handshake(Some(180), 0, 0).status, PeerStatus::Inactive);
        assert_eq!(PeerStats::never_connected().status, PeerStatus::NeverConnected);
        assert_eq!(PeerStatus::NeverConnected.to_string(), "never_connected");
    }

    #[test]
    fn peer_stats_rendering() {
        let stats = PeerStats::from_handshake(Some(7200), 512, 1536);
        assert_eq!(stats.handshake_age(), "2 h ago");
        assert_eq!(stats.transfer(), "↓ 512 B / ↑ 1.50 KB");
        assert_eq!(PeerStats::from_handshake(Some(45), 0, 0).handshake_age(), "45 sec ago");
        assert_eq!(PeerStats::from_handshake(Some(200_000), 0, 0).handshake_age(), "2 days ago");
        assert_eq!(PeerStats::never_connected().transfer(), "—");
    }

    #[test]
    fn command_parsing() {
        let msg = |text: &str| InboundMessage {
            user: ChatUser {
                id: 1,
                username: None,
            },
            chat_id: 1,
            message_id: 1,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        let cmd = msg("/SetLevel@peerbot 42 premium").command().unwrap();
        assert_eq!(cmd.name, "setlevel");
        assert_eq!(cmd.args, vec!["42", "premium"]);
        assert!(msg("hello").command().is_none());
        assert!(msg("/").command().is_none());
    }

    #[test]
    fn feedback_processed_when_responder_set() {
        let mut fb = Feedback {
            id: 1,
            user_id: 2,
            username: None,
            message: "hi".into(),
            response: None,
            responded_at: None,
            responded_by: None,
            created_at: Utc::now(),
        };
        assert!(!fb.is_processed());
        fb.responded_by = Some(9);
        assert!(fb.is_processed());
    }
}
