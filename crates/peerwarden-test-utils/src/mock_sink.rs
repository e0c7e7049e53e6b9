// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{Mutex, PoisonError};

use peerwarden_core::{LogEvent, LogSink};

/// A `LogSink` that keeps every event in memory.
#[derive(Default)]
pub struct CollectingLogSink {
    events: Mutex<Vec<LogEvent>>,
}

impl CollectingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command names in emission order.
    pub fn commands(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.command).collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.events().iter().filter(|e| e.command == command).count()
    }

    /// The most recent event with this command name.
    pub fn last(&self, command: &str) -> Option<LogEvent> {
        self.events().into_iter().rev().find(|e| e.command == command)
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for CollectingLogSink {
    fn emit(&self, event: LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
