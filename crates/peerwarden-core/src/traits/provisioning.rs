// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for the external client tooling: scripts, stats, and the
//! on-disk client inventory.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PeerwardenError;
use crate::types::{ActionOutput, PeerStats};

/// Provisioning scripts.
///
/// `Ok` means the process ran, whatever its exit code. `Err` means it could
/// not be started or exceeded `timeout`.
#[async_trait]
pub trait ProvisioningAction: Send + Sync {
    async fn add(&self, client: &str, timeout: Duration) -> Result<ActionOutput, PeerwardenError>;

    async fn remove(&self, client: &str, timeout: Duration)
    -> Result<ActionOutput, PeerwardenError>;

    /// Issues a short-lived install link valid for `ttl_secs`.
    async fn install_link(
        &self,
        client: &str,
        ttl_secs: u64,
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError>;
}

#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn peer_stats(&self, client: &str) -> Result<PeerStats, PeerwardenError>;

    /// Stats for every client that has a readable config, keyed by
    /// directory name.
    async fn all_peer_stats(&self) -> Result<HashMap<String, PeerStats>, PeerwardenError>;
}

/// The directory of provisioned clients.
#[async_trait]
pub trait ClientInventory: Send + Sync {
    /// Client directory names as found on disk.
    async fn list_clients(&self) -> Result<Vec<String>, PeerwardenError>;

    async fn exists(&self, client: &str) -> Result<bool, PeerwardenError>;
}
