// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for peerwarden integration tests.
//!
//! Provides in-memory stand-ins for every collaborator the bot talks to,
//! plus a harness that wires them into a ready [`peerwarden_bot::Handler`].
//!
//! # Components
//!
//! - [`MockGateway`] - messaging gateway with event injection and capture
//! - [`MockAccounts`], [`MockFeedback`], [`MockBlocklist`], [`MockEvents`],
//!   [`MockConfigSource`] - repositories backed by plain collections
//! - [`MockStats`], [`MockScripts`], [`MockInventory`] - client tooling
//! - [`CollectingLogSink`] - records every business event
//! - [`TestHarness`] - all of the above behind one handler

pub mod fixtures;
pub mod harness;
pub mod mock_gateway;
pub mod mock_provisioning;
pub mod mock_repos;
pub mod mock_sink;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::MockGateway;
pub use mock_provisioning::{MockInventory, MockScripts, MockStats, ScriptCall, ScriptOp};
pub use mock_repos::{MockAccounts, MockBlocklist, MockConfigSource, MockEvents, MockFeedback};
pub use mock_sink::CollectingLogSink;
