// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes a [`crate::Database`] and runs
//! on its background thread.

pub mod accounts;
pub mod blocklist;
pub mod events;
pub mod feedback;
pub mod settings;
