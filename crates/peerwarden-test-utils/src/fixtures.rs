// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for inbound events.
//!
//! Private chats are assumed throughout: the chat id equals the user id.

use std::sync::atomic::{AtomicI32, Ordering};

use chrono::Utc;
use peerwarden_core::{CallbackAction, CallbackEvent, ChatUser, InboundEvent, InboundMessage};

static NEXT_MESSAGE_ID: AtomicI32 = AtomicI32::new(1);

fn next_message_id() -> i32 {
    NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)
}

pub fn chat_user(id: i64, username: Option<&str>) -> ChatUser {
    ChatUser {
        id,
        username: username.map(str::to_string),
    }
}

pub fn message(user: &ChatUser, text: &str) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        user: user.clone(),
        chat_id: user.id,
        message_id: next_message_id(),
        text: text.to_string(),
        timestamp: Utc::now(),
    })
}

pub fn callback(user: &ChatUser, action: CallbackAction) -> InboundEvent {
    InboundEvent::Callback(CallbackEvent {
        user: user.clone(),
        chat_id: user.id,
        message_id: Some(next_message_id()),
        callback_id: format!("cb-{}", next_message_id()),
        action,
        timestamp: Utc::now(),
    })
}
