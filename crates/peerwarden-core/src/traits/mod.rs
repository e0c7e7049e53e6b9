// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the bot.
//!
//! Lifecycle adapters extend [`PluginAdapter`] and use `#[async_trait]` for
//! dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod log_sink;
pub mod provisioning;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::MessagingGateway;
pub use log_sink::LogSink;
pub use provisioning::{ClientInventory, ProvisioningAction, StatsProvider};
pub use storage::{
    AccountRepository, BlocklistRepository, ConfigSource, EventLogRepository, FeedbackCounts,
    FeedbackRepository, StorageAdapter,
};
