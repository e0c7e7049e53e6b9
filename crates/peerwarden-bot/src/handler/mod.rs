// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-event handling.
//!
//! [`Handler::handle`] runs ingress (auto-registration and the blocklist)
//! for every event and then routes it: commands, text steps of an active
//! conversation, or button presses. Every failure ends here in a
//! user-facing message and/or a log entry.

mod admin;
mod callbacks;
mod commands;
mod feedback;

use std::sync::Arc;

use chrono::Utc;
use peerwarden_config::SettingsHandle;
use peerwarden_core::{
    Account, AccountRepository, BlocklistRepository, Button, ChatUser, ClientInventory,
    ConfigSource, EventLogRepository, FeedbackRepository, InboundEvent, InboundMessage, LogEvent,
    LogSink, MessagingGateway, OutboundMessage, ProvisioningAction, StatsProvider, UserLevel,
};
use tracing::{debug, warn};

use crate::rate_limit::RateLimiter;
use crate::state::{ConversationStore, Flow};
use crate::texts;

/// Every collaborator the handler talks to.
#[derive(Clone)]
pub struct Services {
    pub gateway: Arc<dyn MessagingGateway>,
    pub accounts: Arc<dyn AccountRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub blocklist: Arc<dyn BlocklistRepository>,
    pub events: Arc<dyn EventLogRepository>,
    pub config: Arc<dyn ConfigSource>,
    pub actions: Arc<dyn ProvisioningAction>,
    pub stats: Arc<dyn StatsProvider>,
    pub inventory: Arc<dyn ClientInventory>,
    pub log: Arc<dyn LogSink>,
}

pub struct Handler {
    svc: Services,
    settings: SettingsHandle,
    conversations: ConversationStore,
    limiter: Arc<RateLimiter>,
}

/// The sender of an event together with their account, loaded once.
pub(crate) struct Caller {
    pub user: ChatUser,
    pub chat_id: i64,
    pub account: Option<Account>,
}

impl Caller {
    /// Premium at this instant. Staff count as premium.
    fn is_premium(&self) -> bool {
        self.account
            .as_ref()
            .is_some_and(|a| a.is_premium_at(Utc::now()))
    }

    fn has_privilege(&self, level: UserLevel) -> bool {
        self.account
            .as_ref()
            .is_some_and(|a| a.has_privilege(level, Utc::now()))
    }

    fn event(&self, command: &str) -> LogEvent {
        let event = LogEvent::new(command)
            .user(&self.user)
            .client(self.user.client_name())
            .premium(self.is_premium());
        match &self.account {
            Some(acc) => event.level(acc.level),
            None => event,
        }
    }
}

impl Handler {
    pub fn new(svc: Services, settings: SettingsHandle, limiter: Arc<RateLimiter>) -> Self {
        Self {
            svc,
            settings,
            conversations: ConversationStore::new(),
            limiter,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Handle one inbound event to completion.
    pub async fn handle(&self, event: InboundEvent) {
        let user = event.user().clone();
        let chat_id = event.chat_id();

        if let Err(e) = self
            .svc
            .accounts
            .register(Some(user.id), user.username.as_deref())
            .await
        {
            warn!(user_id = user.id, error = %e, "auto-registration failed");
            self.emit(LogEvent::new("user_registration_error").user(&user).error(&e));
        }

        if self.is_blocked(&user).await {
            if let InboundEvent::Callback(cb) = &event {
                self.answer(&cb.callback_id).await;
            }
            self.reply(chat_id, texts::BLOCKED).await;
            let command = match &event {
                InboundEvent::Message(_) => "blocked_attempt",
                InboundEvent::Callback(_) => "blocked_callback_attempt",
            };
            self.emit(LogEvent::new(command).user(&user));
            return;
        }

        match event {
            InboundEvent::Message(msg) => self.on_message(msg).await,
            InboundEvent::Callback(cb) => self.on_callback(cb).await,
        }
    }

    /// A failing blocklist counts as "not blocked".
    async fn is_blocked(&self, user: &ChatUser) -> bool {
        match self
            .svc
            .blocklist
            .is_blocked(user.id, user.username.as_deref())
            .await
        {
            Ok(blocked) => blocked,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "blocklist check failed, allowing");
                self.emit(LogEvent::new("blocklist_check_error").user(user).error(&e));
                false
            }
        }
    }

    async fn on_message(&self, msg: InboundMessage) {
        if let Some(cmd) = msg.command() {
            self.on_command(&msg, cmd).await;
            return;
        }

        let caller = self.caller(&msg.user, msg.chat_id).await;
        match self.conversations.current(msg.user.id).await {
            Some(Flow::FeedbackText) => self.submit_feedback(&caller, &msg.text).await,
            Some(Flow::FeedbackModeratorReply {
                feedback_id,
                target_user_id,
            }) => {
                self.send_moderator_reply(&caller, feedback_id, target_user_id, &msg.text)
                    .await
            }
            Some(Flow::FeedbackLevelDate {
                feedback_id,
                target_user_id,
                level,
            }) => {
                self.apply_entered_date(&caller, &msg, feedback_id, target_user_id, level)
                    .await
            }
            _ => debug!(user_id = msg.user.id, "ignoring free text outside a flow"),
        }
    }

    async fn caller(&self, user: &ChatUser, chat_id: i64) -> Caller {
        let account = match self.svc.accounts.get_by_user_id(user.id).await {
            Ok(acc) => acc,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "account lookup failed");
                None
            }
        };
        Caller {
            user: user.clone(),
            chat_id,
            account,
        }
    }

    /// Sends the permission error when the caller lacks `level`.
    async fn require(&self, caller: &Caller, level: UserLevel) -> bool {
        if caller.has_privilege(level) {
            return true;
        }
        self.reply(caller.chat_id, texts::INSUFFICIENT_PERMISSIONS).await;
        false
    }

    fn emit(&self, event: LogEvent) {
        self.svc.log.emit(event);
    }

    async fn send(&self, msg: OutboundMessage) -> Option<i32> {
        let chat_id = msg.chat_id;
        match self.svc.gateway.send(msg).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(chat_id, error = %e, "failed to send message");
                None
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: impl Into<String>) -> Option<i32> {
        self.send(OutboundMessage::html(chat_id, text)).await
    }

    async fn reply_with_keyboard(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        keyboard: Vec<Vec<Button>>,
    ) -> Option<i32> {
        self.send(OutboundMessage::html(chat_id, text).with_keyboard(keyboard))
            .await
    }

    /// Send and remember the message so the next command removes it.
    async fn reply_tracked(&self, caller: &Caller, msg: OutboundMessage) {
        if let Some(id) = self.send(msg).await {
            self.conversations.track_bot_message(caller.user.id, id).await;
        }
    }

    async fn delete(&self, chat_id: i64, message_id: i32) {
        if let Err(e) = self.svc.gateway.delete_message(chat_id, message_id).await {
            debug!(chat_id, message_id, error = %e, "delete failed");
        }
    }

    async fn answer(&self, callback_id: &str) {
        if let Err(e) = self.svc.gateway.answer_callback(callback_id).await {
            debug!(callback_id, error = %e, "answering callback failed");
        }
    }
}
