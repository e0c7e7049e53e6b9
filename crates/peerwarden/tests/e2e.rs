// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: the dispatch loop, the handler and the event log
//! writer running against a real SQLite database.
//!
//! The chat gateway and the provisioning scripts are mocks. Every test uses
//! its own temporary database and a single worker, so events are handled
//! in the order they were injected.

use std::sync::Arc;
use std::time::Duration;

use peerwarden_bot::{Dispatcher, Handler, LogQueue, RateLimiter, Services, shutdown, texts};
use peerwarden_config::model::StorageConfig;
use peerwarden_config::{PeerwardenConfig, RuntimeSettings};
use peerwarden_core::{
    AccountRepository, BlocklistRepository, CallbackAction, ChatUser, ClientInventory,
    EventLogRepository, FeedbackRepository, InboundEvent, StorageAdapter, UserLevel,
};
use peerwarden_storage::SqliteStore;
use peerwarden_test_utils::{MockGateway, MockInventory, MockScripts, MockStats, fixtures};
use tokio_util::sync::CancellationToken;

struct Pipeline {
    store: Arc<SqliteStore>,
    gateway: Arc<MockGateway>,
    scripts: Arc<MockScripts>,
    inventory: Arc<MockInventory>,
    _dir: tempfile::TempDir,
}

impl Pipeline {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(StorageConfig {
            database_path: dir.path().join("e2e.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();
        let inventory = Arc::new(MockInventory::new());
        Self {
            store: Arc::new(store),
            gateway: Arc::new(MockGateway::new()),
            scripts: Arc::new(MockScripts::new().with_inventory(Arc::clone(&inventory))),
            inventory,
            _dir: dir,
        }
    }

    async fn staff(&self, id: i64, username: &str, level: UserLevel) -> ChatUser {
        self.store.register(Some(id), Some(username)).await.unwrap();
        self.store.set_level(id, level).await.unwrap();
        fixtures::chat_user(id, Some(username))
    }

    /// Deliver `events` through one worker, then stop and flush the log.
    async fn run(&self, events: Vec<InboundEvent>) {
        for event in events {
            self.gateway.inject(event).await;
        }
        self.gateway.close();

        let settings = RuntimeSettings::from_config(&PeerwardenConfig::default()).into_handle();
        let (queue, writer) = LogQueue::new(64);
        let events_repo: Arc<dyn EventLogRepository> = self.store.clone();
        let writer_task = tokio::spawn(writer.run(events_repo));

        let services = Services {
            gateway: self.gateway.clone(),
            accounts: self.store.clone(),
            feedback: self.store.clone(),
            blocklist: self.store.clone(),
            events: self.store.clone(),
            config: self.store.clone(),
            actions: self.scripts.clone(),
            stats: Arc::new(MockStats::new()),
            inventory: self.inventory.clone(),
            log: Arc::new(queue),
        };
        let limiter = Arc::new(RateLimiter::new(settings.clone()));
        let handler = Arc::new(Handler::new(services, settings, limiter));
        let dispatcher = Dispatcher::new(self.gateway.clone(), handler, 1);

        dispatcher.run(CancellationToken::new()).await;
        dispatcher.drain().await;
        drop(dispatcher);

        assert!(
            shutdown::join_with_timeout("writer", writer_task, Duration::from_secs(10)).await,
            "event log writer must drain"
        );
    }

    async fn logged(&self) -> Vec<String> {
        self.store
            .recent(100, None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.command)
            .collect()
    }
}

#[tokio::test]
async fn create_registers_and_provisions() {
    let p = Pipeline::new().await;
    let alice = fixtures::chat_user(1, Some("Alice"));
    p.scripts
        .set_add("done\n  wget -qO- https://vpn.example.com/init/x1.sh | sh\n", 0)
        .await;

    p.run(vec![fixtures::message(&alice, "/create")]).await;

    let account = p.store.get_by_user_id(1).await.unwrap().unwrap();
    assert_eq!(account.username.as_deref(), Some("Alice"));
    assert_eq!(account.level, UserLevel::Basic);
    assert_eq!(p.scripts.calls().await[0].client, "alice");

    let reply = p.gateway.last_text_to(1).await.unwrap();
    assert!(reply.contains("https://vpn.example.com/init/x1.sh"));

    let logged = p.logged().await;
    assert!(logged.contains(&"create".to_string()));
    assert!(logged.contains(&"create_completed".to_string()));
}

#[tokio::test]
async fn create_then_delete_leaves_no_client() {
    let p = Pipeline::new().await;
    let alice = fixtures::chat_user(1, Some("alice"));

    p.run(vec![
        fixtures::message(&alice, "/create"),
        fixtures::message(&alice, "/delete"),
        fixtures::callback(&alice, CallbackAction::DeleteConfirm),
    ])
    .await;

    assert_eq!(p.scripts.add_calls(), 1);
    assert_eq!(p.scripts.remove_calls(), 1);
    assert!(!p.inventory.exists("alice").await.unwrap());
}

#[tokio::test]
async fn feedback_round_trip_through_storage() {
    let p = Pipeline::new().await;
    let moderator = p.staff(900, "mod", UserLevel::Moderator).await;
    let alice = fixtures::chat_user(1, Some("alice"));

    p.run(vec![
        fixtures::message(&alice, "/feedback"),
        fixtures::message(&alice, "The tunnel drops every hour"),
        fixtures::callback(&moderator, CallbackAction::FeedbackReply(1)),
        fixtures::message(&moderator, "Fixed on our side"),
    ])
    .await;

    let stored = p.store.get(1).await.unwrap().unwrap();
    assert_eq!(stored.user_id, 1);
    assert_eq!(stored.message, "The tunnel drops every hour");
    assert_eq!(stored.response.as_deref(), Some("Fixed on our side"));
    assert_eq!(stored.responded_by, Some(900));
    assert!(stored.is_processed());

    assert_eq!(
        p.gateway.last_text_to(1).await.as_deref(),
        Some(texts::support_response("Fixed on our side").as_str())
    );
    let logged = p.logged().await;
    assert!(logged.contains(&"feedback_sent".to_string()));
    assert!(logged.contains(&"feedback_responded".to_string()));
}

#[tokio::test]
async fn blocked_user_is_refused_and_logged() {
    let p = Pipeline::new().await;
    p.store.block(5, "spam").await.unwrap();
    let spammer = fixtures::chat_user(5, Some("spammer"));

    p.run(vec![fixtures::message(&spammer, "/create")]).await;

    assert_eq!(p.scripts.add_calls(), 0);
    assert_eq!(p.gateway.last_text_to(5).await.as_deref(), Some(texts::BLOCKED));
    assert_eq!(p.logged().await, vec!["blocked_attempt".to_string()]);
}

#[tokio::test]
async fn admin_config_override_is_persisted() {
    use peerwarden_config::keys;
    use peerwarden_core::ConfigSource;

    let p = Pipeline::new().await;
    let admin = p.staff(10, "boss", UserLevel::Admin).await;

    p.run(vec![fixtures::message(&admin, "/config max_clients 3")]).await;

    let stored = ConfigSource::get(p.store.as_ref(), keys::MAX_CLIENTS).await.unwrap();
    assert_eq!(stored.as_deref(), Some("3"));
}
