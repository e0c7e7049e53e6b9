// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback submission and the moderation buttons that follow it.

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use peerwarden_core::{
    Button, CallbackAction, CallbackEvent, ExpirySpan, Feedback, InboundMessage, OutboundMessage,
    UserLevel,
};
use tracing::{debug, info, warn};

use super::callbacks::feedback_event;
use super::{Caller, Handler};
use crate::dates::parse_local_datetime;
use crate::state::Flow;
use crate::texts;

/// Length of a "month" granted from the level buttons.
const MONTH_DAYS: i64 = 32;

/// Timeout for removing a feedback author's client.
const REMOVE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

fn moderation_keyboard(feedback_id: i64, from_staff: bool) -> Vec<Vec<Button>> {
    let read = Button::new("✅ Read", CallbackAction::FeedbackRead(feedback_id));
    if from_staff {
        return vec![vec![read]];
    }
    vec![
        vec![
            Button::new("💬 Reply", CallbackAction::FeedbackReply(feedback_id)),
            Button::new("🎚 Level", CallbackAction::FeedbackLevel(feedback_id)),
        ],
        vec![
            Button::new("🗑 Delete config", CallbackAction::FeedbackDeleteConfig(feedback_id)),
            read,
        ],
    ]
}

fn level_keyboard(feedback_id: i64) -> Vec<Vec<Button>> {
    let pick = |label: &str, level| {
        Button::new(
            label,
            CallbackAction::FeedbackPickLevel {
                level,
                feedback_id,
            },
        )
    };
    vec![
        vec![pick("🚫 Ban", UserLevel::Ban), pick("👤 Basic", UserLevel::Basic)],
        vec![
            pick("⭐ Premium", UserLevel::Premium),
            pick("🛡 Moderator", UserLevel::Moderator),
        ],
        vec![pick("👑 Admin", UserLevel::Admin)],
        vec![Button::new("❌ Cancel", CallbackAction::FeedbackDismiss(feedback_id))],
    ]
}

fn expiry_keyboard(level: UserLevel, feedback_id: i64) -> Vec<Vec<Button>> {
    let span = |label: &str, span| {
        Button::new(
            label,
            CallbackAction::FeedbackExpiry {
                span,
                level,
                feedback_id,
            },
        )
    };
    vec![
        vec![
            span("📅 Month", ExpirySpan::Month),
            span("♾ Forever", ExpirySpan::Forever),
        ],
        vec![Button::new("❌ Cancel", CallbackAction::FeedbackDismiss(feedback_id))],
    ]
}

fn expiry_for(span: ExpirySpan, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match span {
        ExpirySpan::Month => Some(now + TimeDelta::days(MONTH_DAYS)),
        ExpirySpan::Forever => None,
    }
}

impl Handler {
    pub(super) async fn submit_feedback(&self, caller: &Caller, text: &str) {
        let feedback_id = match self.svc.feedback.save(caller.user.id, text).await {
            Ok(id) => id,
            Err(e) => {
                warn!(user_id = caller.user.id, error = %e, "saving feedback failed");
                self.conversations.cancel(caller.user.id).await;
                self.reply(caller.chat_id, texts::FEEDBACK_ERROR).await;
                self.emit(caller.event("feedback_sent").error(&e));
                return;
            }
        };
        self.conversations.complete(caller.user.id).await;
        self.reply(caller.chat_id, texts::FEEDBACK_RECEIVED).await;
        self.emit(feedback_event(caller, "feedback_sent", feedback_id));

        let staff = match self.svc.accounts.list_staff().await {
            Ok(staff) => staff,
            Err(e) => {
                warn!(error = %e, "listing staff for feedback notification failed");
                return;
            }
        };
        let from_staff = caller.account.as_ref().is_some_and(|a| a.is_staff());
        let notification = texts::feedback_notification(
            &caller.user.display_name(),
            caller.user.id,
            feedback_id,
            text,
        );

        let sends = staff.iter().filter_map(|member| member.user_id).map(|chat_id| {
            self.send(
                OutboundMessage::html(chat_id, notification.clone())
                    .with_keyboard(moderation_keyboard(feedback_id, from_staff)),
            )
        });
        let notified = join_all(sends)
            .await
            .into_iter()
            .filter(Option::is_some)
            .count();
        info!(feedback_id, notified, "feedback submitted");
        self.emit(
            caller
                .event("feedback_notification_sent")
                .output(format!("feedback #{feedback_id} sent to {notified} staff")),
        );
    }

    pub(super) async fn on_feedback_action(&self, caller: &Caller, cb: &CallbackEvent) {
        if let CallbackAction::FeedbackDismiss(feedback_id) = cb.action {
            self.conversations.cancel(caller.user.id).await;
            self.reply(caller.chat_id, texts::FEEDBACK_ACTION_CANCELLED)
                .await;
            self.emit(feedback_event(caller, "feedback_action_cancelled", feedback_id));
            return;
        }
        if !self.require(caller, UserLevel::Moderator).await {
            return;
        }

        match cb.action {
            CallbackAction::FeedbackRead(_) => {
                if let Some(id) = cb.message_id {
                    self.delete(cb.chat_id, id).await;
                }
            }
            CallbackAction::FeedbackReply(feedback_id) => {
                let Some(fb) = self.load_open_feedback(caller, feedback_id).await else {
                    return;
                };
                self.conversations
                    .begin(
                        caller.user.id,
                        Flow::FeedbackModeratorReply {
                            feedback_id,
                            target_user_id: fb.user_id,
                        },
                    )
                    .await;
                let keyboard = vec![vec![Button::new(
                    "❌ Cancel",
                    CallbackAction::FeedbackDismiss(feedback_id),
                )]];
                self.reply_with_keyboard(caller.chat_id, texts::FEEDBACK_REQUEST_RESPONSE, keyboard)
                    .await;
            }
            CallbackAction::FeedbackLevel(feedback_id) => {
                if self.load_open_feedback(caller, feedback_id).await.is_none() {
                    return;
                }
                self.reply_with_keyboard(
                    caller.chat_id,
                    texts::FEEDBACK_SELECT_LEVEL,
                    level_keyboard(feedback_id),
                )
                .await;
            }
            CallbackAction::FeedbackPickLevel { level, feedback_id } => {
                let Some(fb) = self.load_open_feedback(caller, feedback_id).await else {
                    return;
                };
                self.conversations
                    .begin(
                        caller.user.id,
                        Flow::FeedbackLevelDate {
                            feedback_id,
                            target_user_id: fb.user_id,
                            level,
                        },
                    )
                    .await;
                self.reply_with_keyboard(
                    caller.chat_id,
                    texts::request_date(level),
                    expiry_keyboard(level, feedback_id),
                )
                .await;
            }
            CallbackAction::FeedbackExpiry {
                span,
                level,
                feedback_id,
            } => {
                let Some(fb) = self.load_open_feedback(caller, feedback_id).await else {
                    return;
                };
                let expires_at = expiry_for(span, Utc::now());
                self.apply_level(caller, feedback_id, fb.user_id, level, expires_at)
                    .await;
            }
            CallbackAction::FeedbackDeleteConfig(feedback_id) => {
                let Some(fb) = self.load_open_feedback(caller, feedback_id).await else {
                    return;
                };
                self.delete_author_config(caller, &fb).await;
            }
            _ => {}
        }
    }

    /// The feedback entry when it exists and is still open. Otherwise the
    /// moderator is told why and their flow is cleared.
    async fn load_open_feedback(&self, caller: &Caller, feedback_id: i64) -> Option<Feedback> {
        let fb = match self.svc.feedback.get(feedback_id).await {
            Ok(Some(fb)) => fb,
            Ok(None) => {
                self.conversations.cancel(caller.user.id).await;
                self.reply(caller.chat_id, texts::FEEDBACK_NOT_FOUND).await;
                return None;
            }
            Err(e) => {
                warn!(feedback_id, error = %e, "loading feedback failed");
                self.conversations.cancel(caller.user.id).await;
                self.reply(caller.chat_id, texts::FEEDBACK_NOT_FOUND).await;
                return None;
            }
        };
        if !fb.is_processed() {
            return Some(fb);
        }

        let moderator = match fb.responded_by {
            Some(id) => match self.svc.accounts.get_by_user_id(id).await {
                Ok(Some(acc)) => acc.display_name(),
                _ => id.to_string(),
            },
            None => "unknown".to_string(),
        };
        debug!(feedback_id, moderator = %moderator, "feedback already processed");
        self.conversations.cancel(caller.user.id).await;
        self.reply(
            caller.chat_id,
            texts::feedback_already_processed(&fb, &moderator),
        )
        .await;
        None
    }

    async fn delete_author_config(&self, caller: &Caller, fb: &Feedback) {
        let author = match self.svc.accounts.get_by_user_id(fb.user_id).await {
            Ok(Some(acc)) => acc,
            Ok(None) | Err(_) => {
                self.reply(caller.chat_id, texts::FEEDBACK_USER_NOT_FOUND).await;
                return;
            }
        };
        let client = author
            .client_name()
            .unwrap_or_else(|| fb.user_id.to_string());

        let result = self.svc.actions.remove(&client, REMOVE_TIMEOUT).await;
        let (response, exit_code) = match &result {
            Ok(out) => (
                format!("User configuration deleted (exit code: {})", out.exit_code),
                out.exit_code,
            ),
            Err(e) => (
                format!("User configuration deletion attempted but failed: {e}"),
                -1,
            ),
        };

        if let Err(e) = self
            .svc
            .feedback
            .respond(fb.id, &response, caller.user.id)
            .await
        {
            warn!(feedback_id = fb.id, error = %e, "recording feedback response failed");
            self.reply(caller.chat_id, texts::FEEDBACK_SAVE_FAILED).await;
            return;
        }

        info!(feedback_id = fb.id, client = %client, exit_code, "author configuration removed");
        self.reply(
            caller.chat_id,
            texts::config_deleted(&author.display_name(), fb.user_id, exit_code),
        )
        .await;
        let event = caller.event("feedback_config_deleted").client(client);
        let event = match &result {
            Ok(out) => event.action(out),
            Err(e) => event.error(e),
        };
        self.emit(event);
    }

    pub(super) async fn send_moderator_reply(
        &self,
        caller: &Caller,
        feedback_id: i64,
        target_user_id: i64,
        text: &str,
    ) {
        if self.load_open_feedback(caller, feedback_id).await.is_none() {
            return;
        }

        let delivery = self
            .svc
            .gateway
            .send(OutboundMessage::html(
                target_user_id,
                texts::support_response(text),
            ))
            .await;
        if let Err(e) = delivery {
            warn!(feedback_id, target_user_id, error = %e, "delivering reply failed");
            self.conversations.cancel(caller.user.id).await;
            self.reply(caller.chat_id, texts::FEEDBACK_RESPONSE_FAILED).await;
            return;
        }

        if let Err(e) = self
            .svc
            .feedback
            .respond(feedback_id, text, caller.user.id)
            .await
        {
            warn!(feedback_id, error = %e, "recording feedback response failed");
            self.reply(caller.chat_id, texts::FEEDBACK_SAVE_FAILED).await;
        }
        self.conversations.complete(caller.user.id).await;
        self.reply(caller.chat_id, texts::FEEDBACK_RESPONSE_SENT).await;
        self.emit(feedback_event(caller, "feedback_responded", feedback_id));
    }

    pub(super) async fn apply_entered_date(
        &self,
        caller: &Caller,
        msg: &InboundMessage,
        feedback_id: i64,
        target_user_id: i64,
        level: UserLevel,
    ) {
        if self.load_open_feedback(caller, feedback_id).await.is_none() {
            return;
        }
        match parse_local_datetime(msg.text.trim()) {
            Ok(expires_at) => {
                self.apply_level(caller, feedback_id, target_user_id, level, Some(expires_at))
                    .await;
            }
            Err(e) => {
                debug!(user_id = caller.user.id, error = %e, "rejected expiry date");
                self.delete(msg.chat_id, msg.message_id).await;
                self.reply(caller.chat_id, texts::FEEDBACK_INVALID_DATE).await;
            }
        }
    }

    /// Set the author's level and close the feedback entry with a summary.
    async fn apply_level(
        &self,
        caller: &Caller,
        feedback_id: i64,
        target_user_id: i64,
        level: UserLevel,
        expires_at: Option<DateTime<Utc>>,
    ) {
        if let Err(e) = self.svc.accounts.set_level(target_user_id, level).await {
            self.conversations.cancel(caller.user.id).await;
            if e.is_not_found() {
                self.reply(caller.chat_id, texts::USER_NOT_FOUND).await;
            } else {
                warn!(target_user_id, error = %e, "changing level failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
            }
            return;
        }
        if level.carries_expiry() {
            let reason = format!("Set by moderator {}", caller.user.display_name());
            if let Err(e) = self
                .svc
                .accounts
                .set_premium(target_user_id, expires_at, &reason)
                .await
            {
                warn!(target_user_id, error = %e, "setting level expiry failed");
            }
        }

        let until = expires_at
            .map(texts::format_local)
            .unwrap_or_else(|| "forever".to_string());
        let response = texts::level_changed(level, &until);
        if let Err(e) = self
            .svc
            .feedback
            .respond(feedback_id, &response, caller.user.id)
            .await
        {
            warn!(feedback_id, error = %e, "recording feedback response failed");
        }

        info!(feedback_id, target_user_id, level = %level, "level changed from feedback");
        self.conversations.complete(caller.user.id).await;
        self.reply(caller.chat_id, format!("✅ {response}")).await;
        self.emit(caller.event("feedback_level_changed").output(response));
    }
}
