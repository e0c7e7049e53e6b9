// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User commands.

use chrono::{TimeDelta, Utc};
use peerwarden_core::{
    ActionOutput, Button, CallbackAction, CommandInvocation, InboundMessage, OutboundMessage,
};
use tracing::{debug, info, warn};

use super::{Caller, Handler};
use crate::links::extract_download_link;
use crate::resolve::{Fallback, Resolution, resolve_account};
use crate::state::Flow;
use crate::texts;

/// Output markers of the add script for an already provisioned client.
const ALREADY_EXISTS_MARKERS: &[&str] = &["already exists", "уже существует"];

fn already_exists(out: &ActionOutput) -> bool {
    !out.success() && ALREADY_EXISTS_MARKERS.iter().any(|m| out.output.contains(m))
}

impl Handler {
    pub(super) async fn on_command(&self, msg: &InboundMessage, cmd: CommandInvocation) {
        self.delete(msg.chat_id, msg.message_id).await;
        if let Some(previous) = self.conversations.take_bot_message(msg.user.id).await {
            self.delete(msg.chat_id, previous).await;
        }

        let caller = self.caller(&msg.user, msg.chat_id).await;
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        debug!(user_id = msg.user.id, command = %cmd.name, "command");

        let logged = match cmd.name.as_str() {
            "start" => {
                self.cmd_start(&caller).await;
                "start"
            }
            "create" => {
                self.cmd_create(&caller).await;
                "create"
            }
            "delete" => {
                self.cmd_delete(&caller).await;
                "delete"
            }
            "stat" => {
                self.cmd_stat(&caller).await;
                "stat"
            }
            "feedback" => {
                self.cmd_feedback(&caller).await;
                "feedback"
            }
            "premium" => {
                self.cmd_premium(&caller).await;
                "premium"
            }
            "help" => {
                self.cmd_static(&caller, texts::HELP).await;
                "help"
            }
            "info" => {
                self.cmd_static(&caller, texts::INFO).await;
                "info"
            }
            "selfhost" => {
                self.cmd_static(&caller, texts::SELFHOST).await;
                "selfhost"
            }
            "admin" => {
                self.cmd_admin(&caller).await;
                "admin"
            }
            "users" => {
                self.cmd_users(&caller, &args).await;
                "users"
            }
            "feedbacklist" => {
                self.cmd_feedback_list(&caller, &args).await;
                "feedbacklist"
            }
            "logs" => {
                self.cmd_logs(&caller, &args).await;
                "logs"
            }
            "setlevel" => {
                self.cmd_set_level(&caller, &args).await;
                "setlevel"
            }
            "setpremium" => {
                self.cmd_set_premium(&caller, &args).await;
                "setpremium"
            }
            "block" => {
                self.cmd_block(&caller, &args).await;
                "block"
            }
            "unblock" => {
                self.cmd_unblock(&caller, &args).await;
                "unblock"
            }
            "config" => {
                self.cmd_config(&caller, &args).await;
                "config"
            }
            "stats" => {
                self.cmd_stats(&caller).await;
                "stats"
            }
            "cleanuplogs" => {
                self.cmd_cleanup_logs(&caller, &args).await;
                "cleanuplogs"
            }
            _ => {
                self.reply(caller.chat_id, texts::UNKNOWN_COMMAND).await;
                "unknown_command"
            }
        };
        self.emit(caller.event(logged));
    }

    pub(super) async fn cmd_static(&self, caller: &Caller, text: &str) {
        self.reply_tracked(caller, OutboundMessage::html(caller.chat_id, text))
            .await;
    }

    pub(super) async fn cmd_start(&self, caller: &Caller) {
        let settings = self.settings.load();
        let used = if caller.is_premium() {
            0
        } else {
            self.count_unprotected_clients().await
        };
        let available = settings.max_clients.saturating_sub(used);
        let text = texts::welcome(
            settings.max_clients,
            available,
            settings.inactive_threshold.as_secs() / 3600,
            settings.max_test_duration.as_secs() / 3600,
        );
        let keyboard = vec![
            vec![Button::new("🚀 Create", CallbackAction::MenuCreate)],
            vec![
                Button::new("ℹ️ Info", CallbackAction::MenuInfo),
                Button::new("❓ Help", CallbackAction::MenuHelp),
            ],
        ];
        self.reply_tracked(
            caller,
            OutboundMessage::html(caller.chat_id, text).with_keyboard(keyboard),
        )
        .await;
    }

    /// Clients that count toward `max_clients`: everything on disk except
    /// clients of premium or staff accounts. Unresolvable clients count.
    pub(super) async fn count_unprotected_clients(&self) -> u32 {
        let clients = match self.svc.inventory.list_clients().await {
            Ok(clients) => clients,
            Err(e) => {
                warn!(error = %e, "listing clients failed, counting zero");
                return 0;
            }
        };

        let now = Utc::now();
        let mut count = 0;
        for client in clients {
            let protected = match resolve_account(
                self.svc.accounts.as_ref(),
                &client,
                Fallback::NumericId,
            )
            .await
            {
                Ok(Resolution::Found(acc)) | Ok(Resolution::AutoRegistered(acc)) => {
                    acc.is_premium_at(now)
                }
                Ok(Resolution::Unresolvable) => false,
                Err(e) => {
                    debug!(client = %client, error = %e, "client lookup failed, counting it");
                    false
                }
            };
            if !protected {
                count += 1;
            }
        }
        count
    }

    pub(super) async fn cmd_create(&self, caller: &Caller) {
        let settings = self.settings.load();
        let client = caller.user.client_name();
        let privileged = caller.is_premium();

        if !privileged && !self.limiter.can_execute(caller.user.id, "create").await {
            self.reply(caller.chat_id, texts::CREATE_RATE_LIMITED).await;
            return;
        }

        let is_new = match self.svc.inventory.exists(&client).await {
            Ok(exists) => !exists,
            Err(e) => {
                debug!(client = %client, error = %e, "inventory check failed");
                false
            }
        };

        if !privileged && !settings.max_test_duration.is_zero() {
            let max_test =
                TimeDelta::from_std(settings.max_test_duration).unwrap_or(TimeDelta::MAX);
            let expired = caller
                .account
                .as_ref()
                .is_some_and(|acc| Utc::now().signed_duration_since(acc.created_at) >= max_test);
            if expired {
                self.reply(caller.chat_id, texts::TEST_LIMIT_EXCEEDED).await;
                self.emit(
                    caller
                        .event("create_test_limit_exceeded")
                        .error("Test duration limit exceeded"),
                );
                return;
            }
        }

        if !privileged && settings.restrict_new_users && is_new {
            self.reply(caller.chat_id, texts::RESTRICTED_NEW_USERS).await;
            self.emit(
                caller
                    .event("create_restricted")
                    .error("New user creation restricted"),
            );
            return;
        }

        if !privileged && settings.max_clients > 0 && is_new {
            let current = self.count_unprotected_clients().await;
            if current >= settings.max_clients {
                self.reply(caller.chat_id, texts::RESTRICTED_NEW_USERS).await;
                self.emit(caller.event("create_max_clients_reached").error(format!(
                    "Max clients reached: {current}/{}",
                    settings.max_clients
                )));
                return;
            }
        }

        match self.svc.actions.add(&client, settings.script_timeout).await {
            Ok(out) if already_exists(&out) => {
                self.conversations
                    .begin(
                        caller.user.id,
                        Flow::CreateConfirmation {
                            client: client.clone(),
                        },
                    )
                    .await;
                let stats = self.svc.stats.peer_stats(&client).await.ok();
                let keyboard = vec![
                    vec![
                        Button::new("🔄 Recreate", CallbackAction::CreateRecreate),
                        Button::new("🔗 Generate link", CallbackAction::CreateGenerateLink),
                    ],
                    vec![Button::new("❌ Cancel", CallbackAction::CreateCancel)],
                ];
                self.reply_with_keyboard(caller.chat_id, texts::create_exists(stats.as_ref()), keyboard)
                    .await;
                self.emit(
                    caller
                        .event("create_existing")
                        .action(&out)
                        .error("Client already exists, waiting for confirmation"),
                );
            }
            Ok(out) if !out.success() => {
                warn!(client = %client, exit_code = out.exit_code, "add script failed");
                self.reply(caller.chat_id, texts::CREATE_ERROR).await;
                self.emit(
                    caller
                        .event("create_completed")
                        .action(&out)
                        .error(format!("Script exited with code {}", out.exit_code)),
                );
            }
            Ok(out) => {
                info!(client = %client, "client created");
                self.reply(caller.chat_id, provisioned_text(&out)).await;
                self.emit(caller.event("create_completed").action(&out));
            }
            Err(e) => {
                warn!(client = %client, error = %e, "add script failed");
                self.reply(caller.chat_id, texts::CREATE_ERROR).await;
                self.emit(caller.event("create_completed").error(&e));
            }
        }
    }

    async fn cmd_delete(&self, caller: &Caller) {
        let client = caller.user.client_name();
        match self.svc.inventory.exists(&client).await {
            Ok(true) => {}
            Ok(false) => {
                self.reply(caller.chat_id, texts::DELETE_NO_CONFIG).await;
                self.emit(caller.event("delete_no_config"));
                return;
            }
            Err(e) => {
                warn!(client = %client, error = %e, "inventory check failed");
                self.reply(caller.chat_id, texts::GENERIC_ERROR).await;
                return;
            }
        }

        let stats = self.svc.stats.peer_stats(&client).await.ok();
        self.conversations
            .begin(caller.user.id, Flow::DeletionConfirmation { client })
            .await;
        let keyboard = vec![vec![
            Button::new("✅ Yes", CallbackAction::DeleteConfirm),
            Button::new("❌ No", CallbackAction::DeleteCancel),
        ]];
        self.reply_with_keyboard(
            caller.chat_id,
            texts::delete_confirmation(stats.as_ref()),
            keyboard,
        )
        .await;
    }

    async fn cmd_stat(&self, caller: &Caller) {
        let premium = caller.is_premium();
        if !premium && !self.limiter.can_execute(caller.user.id, "stat").await {
            self.reply(caller.chat_id, texts::STAT_RATE_LIMITED).await;
            return;
        }

        let client = caller.user.client_name();
        let stats = match self.svc.stats.peer_stats(&client).await {
            Ok(stats) => stats,
            Err(e) => {
                let missing = e.is_not_found()
                    || !self.svc.inventory.exists(&client).await.unwrap_or(true);
                let text = if missing {
                    texts::STAT_NO_CONFIG
                } else {
                    texts::STAT_ERROR
                };
                self.reply(caller.chat_id, text).await;
                self.emit(caller.event("stat_error").error(&e));
                return;
            }
        };

        let settings = self.settings.load();
        let remaining = if premium || settings.max_test_duration.is_zero() {
            None
        } else {
            caller.account.as_ref().map(|acc| {
                let max_test =
                    TimeDelta::from_std(settings.max_test_duration).unwrap_or(TimeDelta::MAX);
                (acc.created_at + max_test)
                    .signed_duration_since(Utc::now())
                    .num_hours()
            })
        };
        self.reply_tracked(
            caller,
            OutboundMessage::html(caller.chat_id, texts::stat(&client, &stats, remaining)),
        )
        .await;
    }

    async fn cmd_feedback(&self, caller: &Caller) {
        self.conversations
            .begin(caller.user.id, Flow::FeedbackText)
            .await;
        let keyboard = vec![vec![Button::new("❌ Cancel", CallbackAction::FeedbackCancel)]];
        self.reply_with_keyboard(caller.chat_id, texts::FEEDBACK_REQUEST, keyboard)
            .await;
    }

    async fn cmd_premium(&self, caller: &Caller) {
        let Some(acc) = &caller.account else {
            self.reply(caller.chat_id, texts::USER_LOOKUP_FAILED).await;
            return;
        };

        let text = if acc.is_staff() {
            texts::premium_active(&format!("unlimited (level {})", acc.level))
        } else if !acc.is_premium_at(Utc::now()) {
            match acc.premium_expires_at {
                Some(at) => texts::premium_expired(at),
                None => texts::PREMIUM_NONE.to_string(),
            }
        } else {
            match acc.premium_expires_at {
                Some(at) => texts::premium_active(&texts::format_local(at)),
                None => texts::premium_active("unlimited"),
            }
        };
        self.reply(caller.chat_id, text).await;
    }
}

/// Reply for a successful add: the install command when one was printed.
pub(super) fn provisioned_text(out: &ActionOutput) -> String {
    match extract_download_link(&out.output) {
        Some(link) => texts::create_success(&link.command, link.expiry.as_deref()),
        None => texts::CREATE_NO_LINK.to_string(),
    }
}
