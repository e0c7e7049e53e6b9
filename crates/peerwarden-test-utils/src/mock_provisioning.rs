// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock client tooling: scripts, stats and the client directory inventory.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use peerwarden_core::{
    ActionOutput, ClientInventory, PeerStats, PeerwardenError, ProvisioningAction, StatsProvider,
};

// --- inventory ---

/// Client directories held in a set.
#[derive(Default)]
pub struct MockInventory {
    clients: Mutex<BTreeSet<String>>,
    failing: AtomicBool,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_clients(names: &[&str]) -> Self {
        let inventory = Self::new();
        for name in names {
            inventory.add_client(name).await;
        }
        inventory
    }

    pub async fn add_client(&self, name: &str) {
        self.clients.lock().await.insert(name.to_string());
    }

    pub async fn remove_client(&self, name: &str) {
        self.clients.lock().await.remove(name);
    }

    /// Fail `list_clients`, as an unreadable clients directory would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientInventory for MockInventory {
    async fn list_clients(&self) -> Result<Vec<String>, PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PeerwardenError::storage(std::io::Error::other(
                "clients directory unreadable",
            )));
        }
        Ok(self.clients.lock().await.iter().cloned().collect())
    }

    async fn exists(&self, client: &str) -> Result<bool, PeerwardenError> {
        Ok(self.clients.lock().await.contains(client))
    }
}

// --- stats ---

#[derive(Default)]
pub struct MockStats {
    stats: Mutex<HashMap<String, PeerStats>>,
    failing: AtomicBool,
}

impl MockStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, client: &str, stats: PeerStats) {
        self.stats.lock().await.insert(client.to_string(), stats);
    }

    pub async fn remove(&self, client: &str) {
        self.stats.lock().await.remove(client);
    }

    /// Fail the batch query. Single-client lookups keep working.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatsProvider for MockStats {
    async fn peer_stats(&self, client: &str) -> Result<PeerStats, PeerwardenError> {
        self.stats
            .lock()
            .await
            .get(client)
            .cloned()
            .ok_or_else(|| PeerwardenError::NotFound(format!("client {client}")))
    }

    async fn all_peer_stats(&self) -> Result<HashMap<String, PeerStats>, PeerwardenError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PeerwardenError::Action {
                message: "wg show failed".into(),
            });
        }
        Ok(self.stats.lock().await.clone())
    }
}

// --- scripts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    Add,
    Remove,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCall {
    pub op: ScriptOp,
    pub client: String,
}

type Reply = Result<ActionOutput, String>;

/// Scripted replies for the three provisioning scripts.
///
/// Every call is counted before the optional delay, so concurrent callers
/// are visible immediately. A delay at or beyond the caller's timeout
/// yields `PeerwardenError::Timeout`. When linked to an inventory,
/// successful adds and removes create and delete the client directory.
pub struct MockScripts {
    add: Mutex<Reply>,
    remove: Mutex<Reply>,
    link: Mutex<Reply>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<ScriptCall>>,
    add_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    link_calls: AtomicUsize,
    inventory: Option<Arc<MockInventory>>,
}

fn ok(output: &str, exit_code: i32) -> Reply {
    Ok(ActionOutput {
        output: output.to_string(),
        exit_code,
    })
}

impl MockScripts {
    pub fn new() -> Self {
        Self {
            add: Mutex::new(ok("client added", 0)),
            remove: Mutex::new(ok("client removed", 0)),
            link: Mutex::new(ok("", 0)),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            add_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            link_calls: AtomicUsize::new(0),
            inventory: None,
        }
    }

    pub fn with_inventory(mut self, inventory: Arc<MockInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub async fn set_add(&self, output: &str, exit_code: i32) {
        *self.add.lock().await = ok(output, exit_code);
    }

    pub async fn set_remove(&self, output: &str, exit_code: i32) {
        *self.remove.lock().await = ok(output, exit_code);
    }

    pub async fn set_link(&self, output: &str, exit_code: i32) {
        *self.link.lock().await = ok(output, exit_code);
    }

    /// Make `remove` fail to launch.
    pub async fn fail_remove(&self, message: &str) {
        *self.remove.lock().await = Err(message.to_string());
    }

    pub async fn fail_add(&self, message: &str) {
        *self.add.lock().await = Err(message.to_string());
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn link_calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    pub async fn calls(&self) -> Vec<ScriptCall> {
        self.calls.lock().await.clone()
    }

    async fn invoke(
        &self,
        op: ScriptOp,
        client: &str,
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError> {
        let (counter, reply) = match op {
            ScriptOp::Add => (&self.add_calls, &self.add),
            ScriptOp::Remove => (&self.remove_calls, &self.remove),
            ScriptOp::Link => (&self.link_calls, &self.link),
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(ScriptCall {
            op,
            client: client.to_string(),
        });

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            if delay >= timeout {
                tokio::time::sleep(timeout).await;
                return Err(PeerwardenError::Timeout { duration: timeout });
            }
            tokio::time::sleep(delay).await;
        }

        let out = reply
            .lock()
            .await
            .clone()
            .map_err(|message| PeerwardenError::Action { message })?;

        if out.success() {
            if let Some(inventory) = &self.inventory {
                match op {
                    ScriptOp::Add => inventory.add_client(client).await,
                    ScriptOp::Remove => inventory.remove_client(client).await,
                    ScriptOp::Link => {}
                }
            }
        }
        Ok(out)
    }
}

impl Default for MockScripts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningAction for MockScripts {
    async fn add(&self, client: &str, timeout: Duration) -> Result<ActionOutput, PeerwardenError> {
        self.invoke(ScriptOp::Add, client, timeout).await
    }

    async fn remove(
        &self,
        client: &str,
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError> {
        self.invoke(ScriptOp::Remove, client, timeout).await
    }

    async fn install_link(
        &self,
        client: &str,
        _ttl_secs: u64,
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError> {
        self.invoke(ScriptOp::Link, client, timeout).await
    }
}
