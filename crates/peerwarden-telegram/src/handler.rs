// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between Telegram updates and peerwarden events.
//!
//! Only private chats are served. Messages without text and updates
//! without a sender are dropped here, before they reach the bot.

use chrono::Utc;
use peerwarden_core::{
    Button, CallbackAction, CallbackEvent, ChatUser, InboundEvent, InboundMessage,
};
use teloxide::types::{
    CallbackQuery, ChatKind, InlineKeyboardButton, InlineKeyboardMarkup, Message, User,
};
use tracing::debug;

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

fn chat_user(user: &User) -> ChatUser {
    ChatUser {
        id: user.id.0 as i64,
        username: user.username.clone(),
    }
}

/// A private text message as an [`InboundEvent`].
pub fn to_inbound_message(msg: &Message) -> Option<InboundEvent> {
    if !is_dm(msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return None;
    }
    let Some(from) = msg.from.as_ref() else {
        debug!(chat_id = msg.chat.id.0, "ignoring message without sender");
        return None;
    };
    let Some(text) = msg.text() else {
        debug!(msg_id = msg.id.0, "ignoring non-text message");
        return None;
    };

    Some(InboundEvent::Message(InboundMessage {
        user: chat_user(from),
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        text: text.to_string(),
        timestamp: msg.date,
    }))
}

/// A button press as an [`InboundEvent`].
///
/// Presses on messages the bot can no longer see are attributed to the
/// sender's private chat.
pub fn to_callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.as_deref()?;
    let (chat_id, message_id) = match query.message.as_ref() {
        Some(m) => (m.chat().id.0, Some(m.id().0)),
        None => (query.from.id.0 as i64, None),
    };

    Some(InboundEvent::Callback(CallbackEvent {
        user: chat_user(&query.from),
        chat_id,
        message_id,
        callback_id: query.id.to_string(),
        action: CallbackAction::parse(data),
        timestamp: Utc::now(),
    }))
}

/// Inline keyboard carrying each button's callback data.
pub fn keyboard_markup(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.data()))
            .collect::<Vec<_>>()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn private_message(user_id: u64, username: Option<&str>, text: Option<&str>) -> Message {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Test",
        });
        if let Some(name) = username {
            from["username"] = name.into();
        }
        let mut json = serde_json::json!({
            "message_id": 7,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": from,
        });
        if let Some(text) = text {
            json["text"] = text.into();
        }
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn group_message(text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": 5,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    fn callback_query(data: Option<&str>, with_message: bool) -> CallbackQuery {
        let mut json = serde_json::json!({
            "id": "4382bfdwdsb323b2d9",
            "from": {
                "id": 42,
                "is_bot": false,
                "first_name": "Test",
                "username": "Alice",
            },
            "chat_instance": "-8871236",
        });
        if let Some(data) = data {
            json["data"] = data.into();
        }
        if with_message {
            json["message"] = serde_json::json!({
                "message_id": 99,
                "date": 1700000000i64,
                "chat": {
                    "id": 42,
                    "type": "private",
                    "first_name": "Test",
                },
                "text": "prompt",
            });
        }
        serde_json::from_value(json).expect("failed to deserialize mock callback query")
    }

    #[test]
    fn private_text_becomes_message_event() {
        let msg = private_message(12345, Some("Alice"), Some("/create"));
        let Some(InboundEvent::Message(inbound)) = to_inbound_message(&msg) else {
            panic!("expected a message event");
        };
        assert_eq!(inbound.user.id, 12345);
        assert_eq!(inbound.user.username.as_deref(), Some("Alice"));
        assert_eq!(inbound.chat_id, 12345);
        assert_eq!(inbound.message_id, 7);
        assert_eq!(inbound.text, "/create");
        assert_eq!(inbound.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn group_and_non_text_messages_are_dropped() {
        assert!(!is_dm(&group_message("/create")));
        assert!(to_inbound_message(&group_message("/create")).is_none());
        assert!(to_inbound_message(&private_message(1, None, None)).is_none());
    }

    #[test]
    fn callback_carries_parsed_action_and_message() {
        let query = callback_query(Some("create_recreate"), true);
        let Some(InboundEvent::Callback(cb)) = to_callback_event(&query) else {
            panic!("expected a callback event");
        };
        assert_eq!(cb.action, CallbackAction::CreateRecreate);
        assert_eq!(cb.chat_id, 42);
        assert_eq!(cb.message_id, Some(99));
        assert_eq!(cb.callback_id, "4382bfdwdsb323b2d9");
        assert_eq!(cb.user.username.as_deref(), Some("Alice"));
    }

    #[test]
    fn callback_without_message_uses_private_chat() {
        let query = callback_query(Some("fb_read_3"), false);
        let Some(InboundEvent::Callback(cb)) = to_callback_event(&query) else {
            panic!("expected a callback event");
        };
        assert_eq!(cb.chat_id, 42);
        assert!(cb.message_id.is_none());
    }

    #[test]
    fn callback_without_data_is_dropped() {
        assert!(to_callback_event(&callback_query(None, true)).is_none());
    }

    #[test]
    fn keyboard_uses_callback_data() {
        let rows = vec![vec![
            Button::new("Yes", CallbackAction::DeleteConfirm),
            Button::new("No", CallbackAction::DeleteCancel),
        ]];
        let markup = keyboard_markup(&rows);
        assert_eq!(markup.inline_keyboard.len(), 1);
        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "Yes");
        match &first.kind {
            InlineKeyboardButtonKind::CallbackData(data) => {
                assert_eq!(CallbackAction::parse(data), CallbackAction::DeleteConfirm)
            }
            other => panic!("expected callback data, got {other:?}"),
        }
    }
}
