// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::types::LogEvent;

/// Fire-and-forget event emission. Implementations must not block.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}
