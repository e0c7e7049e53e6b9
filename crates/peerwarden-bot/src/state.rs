// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation state.
//!
//! A user has at most one live [`Flow`]. Starting a flow replaces whatever
//! was there. Button-driven flows that trigger external actions are guarded
//! by an in-progress flag: [`ConversationStore::try_claim`] checks and sets
//! it in one critical section, so a double tap runs the action once.

use std::collections::HashMap;

use peerwarden_core::UserLevel;
use tokio::sync::Mutex;
use tracing::debug;

/// A multi-step interaction waiting for the user's next event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// `/create` found an existing client; waiting for recreate/link/cancel.
    CreateConfirmation { client: String },
    /// `/delete` is waiting for yes/no.
    DeletionConfirmation { client: String },
    /// `/feedback` is waiting for the feedback text.
    FeedbackText,
    /// A moderator is typing a reply to a feedback author.
    FeedbackModeratorReply { feedback_id: i64, target_user_id: i64 },
    /// A moderator is typing the expiry date for a level change.
    FeedbackLevelDate {
        feedback_id: i64,
        target_user_id: i64,
        level: UserLevel,
    },
}

/// The variant of a [`Flow`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    CreateConfirmation,
    DeletionConfirmation,
    FeedbackText,
    FeedbackModeratorReply,
    FeedbackLevelDate,
}

impl Flow {
    /// Which kind of flow this is.
    pub fn kind(&self) -> FlowKind {
        match self {
            Self::CreateConfirmation { .. } => FlowKind::CreateConfirmation,
            Self::DeletionConfirmation { .. } => FlowKind::DeletionConfirmation,
            Self::FeedbackText => FlowKind::FeedbackText,
            Self::FeedbackModeratorReply { .. } => FlowKind::FeedbackModeratorReply,
            Self::FeedbackLevelDate { .. } => FlowKind::FeedbackLevelDate,
        }
    }
}

#[derive(Debug, Clone)]
struct Conversation {
    flow: Flow,
    in_progress: bool,
}

/// Conversation state for every user, plus the last bot message sent to
/// each user so the next command can clean it up.
#[derive(Default)]
pub struct ConversationStore {
    flows: Mutex<HashMap<i64, Conversation>>,
    bot_messages: Mutex<HashMap<i64, i32>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `flow` for `user_id`, discarding any previous one.
    pub async fn begin(&self, user_id: i64, flow: Flow) {
        let mut flows = self.flows.lock().await;
        if let Some(prev) = flows.insert(
            user_id,
            Conversation {
                flow,
                in_progress: false,
            },
        ) {
            debug!(user_id, replaced = ?prev.flow.kind(), "conversation replaced");
        }
    }

    /// The user's active flow, if any.
    pub async fn current(&self, user_id: i64) -> Option<Flow> {
        self.flows
            .lock()
            .await
            .get(&user_id)
            .map(|c| c.flow.clone())
    }

    /// Finish the flow, returning it.
    pub async fn complete(&self, user_id: i64) -> Option<Flow> {
        self.flows.lock().await.remove(&user_id).map(|c| c.flow)
    }

    /// Abandon the flow, returning it.
    pub async fn cancel(&self, user_id: i64) -> Option<Flow> {
        let flow = self.complete(user_id).await;
        if let Some(flow) = &flow {
            debug!(user_id, kind = ?flow.kind(), "conversation cancelled");
        }
        flow
    }

    /// Claim the user's flow of `kind` for a side-effecting action.
    ///
    /// Returns `None` when there is no such flow or another handler already
    /// claimed it. Callers must [`release`](Self::release) when done.
    pub async fn try_claim(&self, user_id: i64, kind: FlowKind) -> Option<Flow> {
        let mut flows = self.flows.lock().await;
        let conv = flows.get_mut(&user_id)?;
        if conv.flow.kind() != kind || conv.in_progress {
            return None;
        }
        conv.in_progress = true;
        Some(conv.flow.clone())
    }

    /// Drop a claimed flow. A flow begun after the claim is left alone.
    pub async fn release(&self, user_id: i64) {
        let mut flows = self.flows.lock().await;
        if flows.get(&user_id).is_some_and(|c| c.in_progress) {
            flows.remove(&user_id);
        }
    }

    /// Remember the last message the bot sent to `user_id`.
    pub async fn track_bot_message(&self, user_id: i64, message_id: i32) {
        self.bot_messages.lock().await.insert(user_id, message_id);
    }

    /// Forget and return the tracked bot message.
    pub async fn take_bot_message(&self, user_id: i64) -> Option<i32> {
        self.bot_messages.lock().await.remove(&user_id)
    }

    /// Number of users with a live flow.
    pub async fn active_count(&self) -> usize {
        self.flows.lock().await.len()
    }
}
