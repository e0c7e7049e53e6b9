// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Button payloads.
//!
//! Callback data travels through the chat platform as an opaque string.
//! [`CallbackAction::parse`] turns it into a typed action once, at ingress,
//! and [`CallbackAction::data`] renders the string back for outgoing
//! keyboards. Both directions live here so they cannot drift apart.

use std::str::FromStr;

use crate::types::UserLevel;

/// How long a level granted from the feedback flow lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySpan {
    /// 32 days from now.
    Month,
    Forever,
}

impl ExpirySpan {
    fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Forever => "forever",
        }
    }
}

/// Every action a button can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Menu shortcuts that behave like the matching command.
    MenuCreate,
    MenuInfo,
    MenuHelp,

    CreateRecreate,
    CreateGenerateLink,
    CreateCancel,

    DeleteConfirm,
    DeleteCancel,

    /// Abort feedback text entry.
    FeedbackCancel,

    FeedbackReply(i64),
    FeedbackLevel(i64),
    FeedbackPickLevel {
        level: UserLevel,
        feedback_id: i64,
    },
    FeedbackExpiry {
        span: ExpirySpan,
        level: UserLevel,
        feedback_id: i64,
    },
    FeedbackDeleteConfig(i64),
    FeedbackRead(i64),
    /// Abort a moderator sub-flow for one feedback entry.
    FeedbackDismiss(i64),

    Unknown(String),
}

impl CallbackAction {
    /// Parses raw callback data. Never fails: unrecognised payloads become
    /// [`CallbackAction::Unknown`].
    pub fn parse(data: &str) -> Self {
        match data {
            "/create" => return Self::MenuCreate,
            "/info" => return Self::MenuInfo,
            "/help" => return Self::MenuHelp,
            "create_recreate" | "create_confirm_yes" => return Self::CreateRecreate,
            "create_generate_link" => return Self::CreateGenerateLink,
            "create_cancel" | "create_confirm_no" => return Self::CreateCancel,
            "delete_confirm_yes" => return Self::DeleteConfirm,
            "delete_confirm_no" => return Self::DeleteCancel,
            "feedback_cancel" => return Self::FeedbackCancel,
            _ => {}
        }

        Self::parse_feedback(data).unwrap_or_else(|| Self::Unknown(data.to_string()))
    }

    fn parse_feedback(data: &str) -> Option<Self> {
        let rest = data.strip_prefix("fb_")?;
        let id = |s: &str| s.parse::<i64>().ok();

        if let Some(tail) = rest.strip_prefix("reply_") {
            return id(tail).map(Self::FeedbackReply);
        }
        if let Some(tail) = rest.strip_prefix("level_") {
            return id(tail).map(Self::FeedbackLevel);
        }
        if let Some(tail) = rest.strip_prefix("delete_") {
            return id(tail).map(Self::FeedbackDeleteConfig);
        }
        if let Some(tail) = rest.strip_prefix("read_") {
            return id(tail).map(Self::FeedbackRead);
        }
        if let Some(tail) = rest.strip_prefix("cancel_") {
            return id(tail).map(Self::FeedbackDismiss);
        }
        if let Some(tail) = rest.strip_prefix("lvl_") {
            let (level, feedback_id) = level_and_id(tail)?;
            return Some(Self::FeedbackPickLevel { level, feedback_id });
        }
        if let Some(tail) = rest.strip_prefix("date_") {
            let (span, tail) = tail.split_once('_')?;
            let span = match span {
                "month" => ExpirySpan::Month,
                "forever" => ExpirySpan::Forever,
                _ => return None,
            };
            let (level, feedback_id) = level_and_id(tail)?;
            return Some(Self::FeedbackExpiry {
                span,
                level,
                feedback_id,
            });
        }
        None
    }

    /// Renders the wire payload for this action.
    pub fn data(&self) -> String {
        match self {
            Self::MenuCreate => "/create".into(),
            Self::MenuInfo => "/info".into(),
            Self::MenuHelp => "/help".into(),
            Self::CreateRecreate => "create_recreate".into(),
            Self::CreateGenerateLink => "create_generate_link".into(),
            Self::CreateCancel => "create_cancel".into(),
            Self::DeleteConfirm => "delete_confirm_yes".into(),
            Self::DeleteCancel => "delete_confirm_no".into(),
            Self::FeedbackCancel => "feedback_cancel".into(),
            Self::FeedbackReply(id) => format!("fb_reply_{id}"),
            Self::FeedbackLevel(id) => format!("fb_level_{id}"),
            Self::FeedbackPickLevel { level, feedback_id } => {
                format!("fb_lvl_{level}_{feedback_id}")
            }
            Self::FeedbackExpiry {
                span,
                level,
                feedback_id,
            } => format!("fb_date_{}_{level}_{feedback_id}", span.as_str()),
            Self::FeedbackDeleteConfig(id) => format!("fb_delete_{id}"),
            Self::FeedbackRead(id) => format!("fb_read_{id}"),
            Self::FeedbackDismiss(id) => format!("fb_cancel_{id}"),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// Short name used as the event-log command for this callback.
    pub fn event_name(&self) -> String {
        format!("callback_{}", self.data())
    }
}

fn level_and_id(tail: &str) -> Option<(UserLevel, i64)> {
    let (level, id) = tail.rsplit_once('_')?;
    Some((UserLevel::from_str(level).ok()?, id.parse().ok()?))
}
