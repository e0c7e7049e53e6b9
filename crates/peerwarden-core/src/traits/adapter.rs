// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait for long-lived adapters with a lifecycle.

use async_trait::async_trait;

use crate::error::PeerwardenError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and shutdown for the storage and channel adapters.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short name used in logs, e.g. `"telegram"` or `"sqlite"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Probes the backend with a cheap request.
    async fn health_check(&self) -> Result<HealthStatus, PeerwardenError>;

    /// Stops background work. Calling it twice is harmless.
    async fn shutdown(&self) -> Result<(), PeerwardenError>;
}
