// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Button presses.

use peerwarden_core::{CallbackAction, CallbackEvent, LogEvent};
use tracing::{debug, info, warn};

use super::commands::provisioned_text;
use super::{Caller, Handler};
use crate::links::extract_install_command;
use crate::state::{Flow, FlowKind};
use crate::texts;

/// Lifetime of links issued from the "generate link" button.
const LINK_TTL_SECS: u64 = 600;

impl Handler {
    pub(super) async fn on_callback(&self, cb: CallbackEvent) {
        self.answer(&cb.callback_id).await;
        let caller = self.caller(&cb.user, cb.chat_id).await;
        debug!(user_id = cb.user.id, action = %cb.action.data(), "callback");

        match &cb.action {
            CallbackAction::MenuCreate => {
                self.cmd_create(&caller).await;
                self.emit(caller.event(&cb.action.event_name()));
            }
            CallbackAction::MenuInfo => {
                self.cmd_static(&caller, texts::INFO).await;
                self.emit(caller.event(&cb.action.event_name()));
            }
            CallbackAction::MenuHelp => {
                self.cmd_static(&caller, texts::HELP).await;
                self.emit(caller.event(&cb.action.event_name()));
            }
            CallbackAction::CreateRecreate
            | CallbackAction::CreateGenerateLink
            | CallbackAction::CreateCancel => self.on_create_choice(&caller, &cb).await,
            CallbackAction::DeleteConfirm | CallbackAction::DeleteCancel => {
                self.on_delete_choice(&caller, &cb).await
            }
            CallbackAction::FeedbackCancel => {
                self.conversations.cancel(caller.user.id).await;
                if let Some(id) = cb.message_id {
                    self.delete(cb.chat_id, id).await;
                }
                self.reply(caller.chat_id, texts::FEEDBACK_CANCELLED).await;
                self.emit(caller.event("feedback_cancelled"));
            }
            CallbackAction::FeedbackReply(_)
            | CallbackAction::FeedbackLevel(_)
            | CallbackAction::FeedbackPickLevel { .. }
            | CallbackAction::FeedbackExpiry { .. }
            | CallbackAction::FeedbackDeleteConfig(_)
            | CallbackAction::FeedbackRead(_)
            | CallbackAction::FeedbackDismiss(_) => self.on_feedback_action(&caller, &cb).await,
            CallbackAction::Unknown(data) => {
                debug!(user_id = cb.user.id, data = %data, "unknown callback data");
                self.emit(caller.event(&cb.action.event_name()));
            }
        }
    }

    /// Recreate, new link, or cancel for a client that already exists.
    ///
    /// Presses without a live confirmation, and repeated presses while one
    /// is being handled, are ignored.
    async fn on_create_choice(&self, caller: &Caller, cb: &CallbackEvent) {
        let Some(Flow::CreateConfirmation { client }) = self
            .conversations
            .try_claim(caller.user.id, FlowKind::CreateConfirmation)
            .await
        else {
            debug!(user_id = caller.user.id, "create choice without a pending confirmation");
            return;
        };
        if let Some(id) = cb.message_id {
            self.delete(cb.chat_id, id).await;
        }

        let timeout = self.settings.load().script_timeout;
        match cb.action {
            CallbackAction::CreateRecreate => {
                match self.svc.actions.remove(&client, timeout).await {
                    Ok(out) if !out.success() => {
                        warn!(client = %client, exit_code = out.exit_code, "remove before recreate failed")
                    }
                    Ok(_) => {}
                    Err(e) => warn!(client = %client, error = %e, "remove before recreate failed"),
                }
                let event = match self.svc.actions.add(&client, timeout).await {
                    Ok(out) if out.success() => {
                        info!(client = %client, "client recreated");
                        self.reply(caller.chat_id, provisioned_text(&out)).await;
                        caller.event("create_recreate_confirmed").action(&out)
                    }
                    Ok(out) => {
                        self.reply(caller.chat_id, texts::CREATE_ERROR).await;
                        caller
                            .event("create_recreate_confirmed")
                            .action(&out)
                            .error(format!("Script exited with code {}", out.exit_code))
                    }
                    Err(e) => {
                        warn!(client = %client, error = %e, "recreate failed");
                        self.reply(caller.chat_id, texts::CREATE_ERROR).await;
                        caller.event("create_recreate_confirmed").error(&e)
                    }
                };
                self.emit(event);
            }
            CallbackAction::CreateGenerateLink => {
                let result = self
                    .svc
                    .actions
                    .install_link(&client, LINK_TTL_SECS, timeout)
                    .await;
                let event = match &result {
                    Ok(out) => match extract_install_command(&out.output) {
                        Some(command) if out.success() => {
                            self.reply(caller.chat_id, texts::link_generated(&command))
                                .await;
                            caller.event("create_link_generated").action(out)
                        }
                        _ => {
                            self.reply(caller.chat_id, texts::LINK_ERROR).await;
                            caller
                                .event("create_link_generated")
                                .action(out)
                                .error("No install command in link output")
                        }
                    },
                    Err(e) => {
                        warn!(client = %client, error = %e, "link generation failed");
                        self.reply(caller.chat_id, texts::LINK_ERROR).await;
                        caller.event("create_link_generated").error(e)
                    }
                };
                self.emit(event);
            }
            _ => {
                self.reply(caller.chat_id, texts::CREATE_CANCELLED).await;
                self.emit(caller.event("create_cancelled"));
            }
        }
        self.conversations.release(caller.user.id).await;
    }

    async fn on_delete_choice(&self, caller: &Caller, cb: &CallbackEvent) {
        let Some(Flow::DeletionConfirmation { client }) = self
            .conversations
            .try_claim(caller.user.id, FlowKind::DeletionConfirmation)
            .await
        else {
            debug!(user_id = caller.user.id, "delete choice without a pending confirmation");
            return;
        };
        if let Some(id) = cb.message_id {
            self.delete(cb.chat_id, id).await;
        }

        if cb.action == CallbackAction::DeleteConfirm {
            let timeout = self.settings.load().script_timeout;
            let event = match self.svc.actions.remove(&client, timeout).await {
                Ok(out) if out.success() => {
                    info!(client = %client, "client deleted by owner");
                    self.reply(caller.chat_id, texts::DELETE_SUCCESS).await;
                    caller.event("delete_confirmed").action(&out)
                }
                Ok(out) => {
                    self.reply(caller.chat_id, texts::DELETE_ERROR).await;
                    caller
                        .event("delete_confirmed")
                        .action(&out)
                        .error(format!("Script exited with code {}", out.exit_code))
                }
                Err(e) => {
                    warn!(client = %client, error = %e, "delete failed");
                    self.reply(caller.chat_id, texts::DELETE_ERROR).await;
                    caller.event("delete_confirmed").error(&e)
                }
            };
            self.emit(event);
        } else {
            self.reply(caller.chat_id, texts::DELETE_CANCELLED).await;
            self.emit(caller.event("delete_cancelled"));
        }
        self.conversations.release(caller.user.id).await;
    }
}

/// Log entry for a feedback button, carrying the feedback id.
pub(super) fn feedback_event(caller: &Caller, command: &str, feedback_id: i64) -> LogEvent {
    caller.event(command).output(format!("feedback #{feedback_id}"))
}
