// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for peerwarden.
//!
//! WAL-mode SQLite with embedded refinery migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for accounts,
//! feedback, bans, the event log and runtime settings.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
