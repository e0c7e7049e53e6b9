// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WireGuard host integration.
//!
//! Reads peer statistics from `wg show`, lists the client configuration
//! directories, and runs the add/remove/link provisioning scripts.

pub mod inventory;
pub mod parse;
pub mod scripts;
pub mod stats;

pub use inventory::FsClientInventory;
pub use scripts::ScriptRunner;
pub use stats::WgStatsProvider;
