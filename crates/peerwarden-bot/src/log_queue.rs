// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded queue between business-event producers and the event log.
//!
//! Producers never wait: when the queue is full the newest event is dropped
//! and counted. A single [`LogWriter`] drains the queue into the
//! repository and returns once every [`LogQueue`] handle is gone and the
//! queue is empty.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use peerwarden_core::{EventLogRepository, LogEvent, LogSink};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct LogQueue {
    tx: mpsc::Sender<LogEvent>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side. Writes queued events to the event log.
pub struct LogWriter {
    rx: mpsc::Receiver<LogEvent>,
}

impl LogQueue {
    /// A queue holding up to `capacity` events, and its writer.
    pub fn new(capacity: usize) -> (Self, LogWriter) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            LogWriter { rx },
        )
    }

    /// Events dropped so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for LogQueue {
    fn emit(&self, event: LogEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if n % 100 == 1 {
                    warn!(dropped = n, command = %event.command, "event log queue full, dropping events");
                }
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(command = %event.command, "event log writer gone, event discarded");
            }
        }
    }
}

impl LogWriter {
    /// Write events until every producer is dropped. Returns the number
    /// written successfully.
    pub async fn run(mut self, repo: Arc<dyn EventLogRepository>) -> u64 {
        let mut written = 0u64;
        while let Some(event) = self.rx.recv().await {
            match repo.append(&event).await {
                Ok(()) => written += 1,
                Err(e) => warn!(command = %event.command, error = %e, "failed to write event log entry"),
            }
        }
        debug!(written, "event log writer drained");
        written
    }
}
