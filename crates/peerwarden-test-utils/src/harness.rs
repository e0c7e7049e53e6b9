// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end handler testing.
//!
//! `TestHarness` wires every mock into a [`Handler`] and exposes the mocks
//! so tests can arrange state and inspect what happened. `send_text` and
//! `press` drive the handler exactly as the dispatch loop would.

use std::sync::Arc;

use peerwarden_bot::{Handler, RateLimiter, Services};
use peerwarden_config::{PeerwardenConfig, RuntimeSettings, SettingsHandle};
use peerwarden_core::{CallbackAction, ChatUser, UserLevel};

use crate::fixtures;
use crate::mock_gateway::MockGateway;
use crate::mock_provisioning::{MockInventory, MockScripts, MockStats};
use crate::mock_repos::{MockAccounts, MockBlocklist, MockConfigSource, MockEvents, MockFeedback};
use crate::mock_sink::CollectingLogSink;

type SettingsTweak = Box<dyn FnOnce(&mut RuntimeSettings) + Send>;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    tweaks: Vec<SettingsTweak>,
    clients: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            tweaks: Vec::new(),
            clients: Vec::new(),
        }
    }

    /// Adjust the runtime settings the handler starts with.
    pub fn with_settings(mut self, tweak: impl FnOnce(&mut RuntimeSettings) + Send + 'static) -> Self {
        self.tweaks.push(Box::new(tweak));
        self
    }

    /// Pre-existing client directories.
    pub fn with_clients(mut self, names: &[&str]) -> Self {
        self.clients.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub async fn build(self) -> TestHarness {
        let mut settings = RuntimeSettings::from_config(&PeerwardenConfig::default());
        for tweak in self.tweaks {
            tweak(&mut settings);
        }
        let settings = settings.into_handle();

        let inventory = Arc::new(MockInventory::new());
        for name in &self.clients {
            inventory.add_client(name).await;
        }
        let scripts = Arc::new(MockScripts::new().with_inventory(Arc::clone(&inventory)));
        let gateway = Arc::new(MockGateway::new());
        let accounts = Arc::new(MockAccounts::new());
        let feedback = Arc::new(MockFeedback::new());
        let blocklist = Arc::new(MockBlocklist::new());
        let events = Arc::new(MockEvents::new());
        let config = Arc::new(MockConfigSource::new());
        let stats = Arc::new(MockStats::new());
        let log = Arc::new(CollectingLogSink::new());

        let services = Services {
            gateway: gateway.clone(),
            accounts: accounts.clone(),
            feedback: feedback.clone(),
            blocklist: blocklist.clone(),
            events: events.clone(),
            config: config.clone(),
            actions: scripts.clone(),
            stats: stats.clone(),
            inventory: inventory.clone(),
            log: log.clone(),
        };
        let limiter = Arc::new(RateLimiter::new(settings.clone()));
        let handler = Arc::new(Handler::new(services, settings.clone(), Arc::clone(&limiter)));

        TestHarness {
            handler,
            limiter,
            settings,
            gateway,
            accounts,
            feedback,
            blocklist,
            events,
            config,
            scripts,
            stats,
            inventory,
            log,
        }
    }
}

/// A handler wired to in-memory collaborators.
pub struct TestHarness {
    pub handler: Arc<Handler>,
    pub limiter: Arc<RateLimiter>,
    pub settings: SettingsHandle,
    pub gateway: Arc<MockGateway>,
    pub accounts: Arc<MockAccounts>,
    pub feedback: Arc<MockFeedback>,
    pub blocklist: Arc<MockBlocklist>,
    pub events: Arc<MockEvents>,
    pub config: Arc<MockConfigSource>,
    pub scripts: Arc<MockScripts>,
    pub stats: Arc<MockStats>,
    pub inventory: Arc<MockInventory>,
    pub log: Arc<CollectingLogSink>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings and no clients.
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    /// A chat user with a registered account at `level`.
    pub async fn user(&self, id: i64, username: Option<&str>, level: UserLevel) -> ChatUser {
        self.accounts.insert(Some(id), username, level).await;
        fixtures::chat_user(id, username)
    }

    /// Deliver a text message (or command) from `user`.
    pub async fn send_text(&self, user: &ChatUser, text: &str) {
        self.handler.handle(fixtures::message(user, text)).await;
    }

    /// Deliver a button press from `user`.
    pub async fn press(&self, user: &ChatUser, action: CallbackAction) {
        self.handler.handle(fixtures::callback(user, action)).await;
    }

    /// Text of the last message sent to `user`'s chat.
    pub async fn last_reply(&self, user: &ChatUser) -> Option<String> {
        self.gateway.last_text_to(user.id).await
    }
}
