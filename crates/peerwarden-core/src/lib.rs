// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for peerwarden.
//!
//! This crate provides the error type, the domain types, and the
//! collaborator traits that the bot consumes and the adapter crates
//! implement.

pub mod callback;
pub mod error;
pub mod traits;
pub mod types;

pub use callback::{CallbackAction, ExpirySpan};
pub use error::PeerwardenError;
pub use types::{
    ACTIVE_HANDSHAKE_SECS, Account, ActionOutput, AdapterType, Button, CallbackEvent, ChatUser,
    CommandInvocation, Feedback, HealthStatus, InboundEvent, InboundMessage, LogEvent,
    OutboundMessage, PeerStats, PeerStatus, TOMBSTONE, UserLevel,
};

pub use traits::{
    AccountRepository, BlocklistRepository, ClientInventory, ConfigSource, EventLogRepository,
    FeedbackCounts, FeedbackRepository, LogSink, MessagingGateway, PluginAdapter,
    ProvisioningAction, StatsProvider, StorageAdapter,
};
