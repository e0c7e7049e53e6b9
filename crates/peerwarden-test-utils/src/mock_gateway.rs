// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! `MockGateway` implements `MessagingGateway` with injectable inbound
//! events and captured outbound traffic for assertion in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use peerwarden_core::{
    AdapterType, HealthStatus, InboundEvent, MessagingGateway, OutboundMessage, PeerwardenError,
    PluginAdapter,
};

/// A mock messaging gateway.
///
/// - **inbound**: events injected via `inject()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured with their ids
/// - **deleted** / **answered**: every delete and callback answer is recorded
///
/// After `close()`, `receive()` drains what is queued and then fails the way
/// a disconnected platform would.
pub struct MockGateway {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<(i32, OutboundMessage)>>>,
    deleted: Arc<Mutex<Vec<(i64, i32)>>>,
    answered: Arc<Mutex<Vec<String>>>,
    failing_chats: Arc<Mutex<HashSet<i64>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    next_id: AtomicI32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            answered: Arc::new(Mutex::new(Vec::new())),
            failing_chats: Arc::new(Mutex::new(HashSet::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicI32::new(1000),
        }
    }

    /// Queue an inbound event. The next call to `receive()` returns it.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Make `receive()` fail once the queue is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Make every `send()` to `chat_id` fail.
    pub async fn fail_sends_to(&self, chat_id: i64) {
        self.failing_chats.lock().await.insert(chat_id);
    }

    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.iter().map(|(_, m)| m.clone()).collect()
    }

    /// Sent messages paired with the ids `send()` returned.
    pub async fn sent_with_ids(&self) -> Vec<(i32, OutboundMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, chat_id: i64) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(_, m)| m.chat_id == chat_id)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Text of the most recent message sent to `chat_id`.
    pub async fn last_text_to(&self, chat_id: i64) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(_, m)| m.chat_id == chat_id)
            .map(|(_, m)| m.text.clone())
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    pub async fn deleted_messages(&self) -> Vec<(i64, i32)> {
        self.deleted.lock().await.clone()
    }

    pub async fn answered_callbacks(&self) -> Vec<String> {
        self.answered.lock().await.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, PeerwardenError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PeerwardenError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn connect(&mut self) -> Result<(), PeerwardenError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<i32, PeerwardenError> {
        if self.failing_chats.lock().await.contains(&msg.chat_id) {
            return Err(PeerwardenError::channel(format!(
                "chat {} unreachable",
                msg.chat_id
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push((id, msg));
        Ok(id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), PeerwardenError> {
        self.deleted.lock().await.push((chat_id, message_id));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), PeerwardenError> {
        self.answered.lock().await.push(callback_id.to_string());
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, PeerwardenError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(PeerwardenError::channel("mock gateway closed"));
            }
            self.notify.notified().await;
        }
    }
}
