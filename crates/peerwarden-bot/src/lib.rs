// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The peerwarden bot.
//!
//! The [`Dispatcher`] receives chat events and hands each one to the
//! [`Handler`] on a bounded worker pool. Alongside it run three loops with
//! their own cadence: the [`Watchdog`] evicting idle clients, the
//! [`ConfigReloader`] refreshing runtime settings, and the rate limiter's
//! daily sweep. Business events flow through the bounded [`LogQueue`].

pub mod dates;
pub mod dispatch;
pub mod handler;
pub mod links;
pub mod log_queue;
pub mod rate_limit;
pub mod reloader;
pub mod resolve;
pub mod shutdown;
pub mod state;
pub mod texts;
pub mod watchdog;

pub use dispatch::Dispatcher;
pub use handler::{Handler, Services};
pub use log_queue::{LogQueue, LogWriter};
pub use rate_limit::RateLimiter;
pub use reloader::ConfigReloader;
pub use resolve::{Fallback, Resolution, resolve_account};
pub use state::{ConversationStore, Flow, FlowKind};
pub use watchdog::{CycleReport, Watchdog};
