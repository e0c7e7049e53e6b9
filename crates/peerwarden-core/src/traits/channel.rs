// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway trait for chat platform integrations.

use async_trait::async_trait;

use crate::error::PeerwardenError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundEvent, OutboundMessage};

/// Bidirectional connection to the chat platform.
///
/// Callback payloads are parsed into [`crate::CallbackAction`] before
/// [`MessagingGateway::receive`] returns them.
#[async_trait]
pub trait MessagingGateway: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), PeerwardenError>;

    /// Sends a message and returns its platform message id.
    async fn send(&self, msg: OutboundMessage) -> Result<i32, PeerwardenError>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), PeerwardenError>;

    /// Acknowledges a button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), PeerwardenError>;

    /// Receives the next inbound event. Fails once the gateway is closed.
    async fn receive(&self) -> Result<InboundEvent, PeerwardenError>;
}
